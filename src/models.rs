//! Data models for the backend payloads.
//!
//! These mirror the JSON contract of the AQI backend. Optional fields carry
//! serde defaults so schema drift degrades to "unknown" values instead of a
//! failed decode.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Pollutant symbol to concentration. `None` means the backend sent `null`.
pub type Pollutants = BTreeMap<String, Option<f64>>;

/// Latest AQI snapshot for one city, as returned by `GET /aqi/current`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CurrentReading {
    /// AQI tier on the backend's 1-5 scale. Out-of-range values are kept as-is.
    #[serde(deserialize_with = "integral_aqi")]
    pub aqi: i64,
    #[serde(default)]
    pub pollutants: Pollutants,
    #[serde(default)]
    pub recorded_at: Option<String>,
}

impl CurrentReading {
    /// Concentration for `key`, `None` when missing or null.
    pub fn concentration(&self, key: &str) -> Option<f64> {
        self.pollutants.get(key).copied().flatten()
    }
}

/// One sample of the trailing 24h series from `GET /aqi/last-24-hours`.
///
/// Concentrations may be nested under `pollutants` or sent flat next to
/// `aqi`; both shapes are accepted.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HistoryPoint {
    pub recorded_at: String,
    #[serde(default, deserialize_with = "optional_integral_aqi")]
    pub aqi: Option<i64>,
    #[serde(default)]
    pub pollutants: Pollutants,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl HistoryPoint {
    pub fn concentration(&self, key: &str) -> Option<f64> {
        self.pollutants
            .get(key)
            .copied()
            .flatten()
            .or_else(|| self.extra.get(key).and_then(Value::as_f64))
    }
}

/// AQI as an integer; whole-number floats such as `4.0` are accepted.
fn aqi_from_value(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.is_finite() && f.fract() == 0.0)
            .map(|f| f as i64)
    })
}

fn integral_aqi<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    aqi_from_value(&value)
        .ok_or_else(|| D::Error::custom(format!("aqi must be a whole number, got {value}")))
}

fn optional_integral_aqi<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(value) => aqi_from_value(&value)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("aqi must be a whole number, got {value}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_current_reading_defaults() {
        let reading: CurrentReading = serde_json::from_value(json!({ "aqi": 2 })).unwrap();
        assert_eq!(reading.aqi, 2);
        assert!(reading.pollutants.is_empty());
        assert!(reading.recorded_at.is_none());
    }

    #[test]
    fn test_current_reading_null_pollutant() {
        let reading: CurrentReading = serde_json::from_value(json!({
            "aqi": 3,
            "pollutants": { "pm2_5": 41.5, "co": null },
            "recorded_at": "2025-01-01T10:00:00Z"
        }))
        .unwrap();
        assert_eq!(reading.concentration("pm2_5"), Some(41.5));
        assert_eq!(reading.concentration("co"), None);
        assert_eq!(reading.concentration("o3"), None);
    }

    #[test]
    fn test_current_reading_requires_aqi() {
        let result: Result<CurrentReading, _> =
            serde_json::from_value(json!({ "pollutants": {} }));
        assert!(result.is_err());
    }

    #[test]
    fn test_aqi_accepts_whole_float() {
        let reading: CurrentReading = serde_json::from_value(json!({ "aqi": 4.0 })).unwrap();
        assert_eq!(reading.aqi, 4);

        let fractional: Result<CurrentReading, _> = serde_json::from_value(json!({ "aqi": 3.5 }));
        assert!(fractional.is_err());
        let text: Result<CurrentReading, _> = serde_json::from_value(json!({ "aqi": "4" }));
        assert!(text.is_err());

        let point: HistoryPoint = serde_json::from_value(json!({
            "recorded_at": "2025-01-01T09:00:00Z",
            "aqi": 2.0
        }))
        .unwrap();
        assert_eq!(point.aqi, Some(2));
        let gap: HistoryPoint = serde_json::from_value(json!({
            "recorded_at": "2025-01-01T09:00:00Z",
            "aqi": null
        }))
        .unwrap();
        assert_eq!(gap.aqi, None);
    }

    #[test]
    fn test_history_point_nested_and_flat() {
        let nested: HistoryPoint = serde_json::from_value(json!({
            "recorded_at": "2025-01-01T09:00:00Z",
            "aqi": 2,
            "pollutants": { "pm10": 55.0 }
        }))
        .unwrap();
        assert_eq!(nested.concentration("pm10"), Some(55.0));

        let flat: HistoryPoint = serde_json::from_value(json!({
            "recorded_at": "2025-01-01T09:00:00Z",
            "aqi": 2,
            "pm2_5": 12,
            "no2": 7.5
        }))
        .unwrap();
        assert_eq!(flat.concentration("pm2_5"), Some(12.0));
        assert_eq!(flat.concentration("no2"), Some(7.5));
        assert_eq!(flat.concentration("pm10"), None);
    }
}
