//! Derived presentation values for a station that has data.
//!
//! Everything the dashboard template and the JSON API show is computed here
//! from a `CurrentReading` and its 24h history. The history is loaded into a
//! polars `DataFrame` for ordering and the trend summary.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use itertools::Itertools;
use polars::prelude::{col, Column, DataFrame, IntoLazy, PolarsResult, SortMultipleOptions};
use serde::Serialize;
use tracing::error;

use crate::classification::{classify, is_known_tier, pollutant_display, POLLUTANTS};
use crate::error::SkyGuardError;
use crate::models::{CurrentReading, HistoryPoint};

const TIMESTAMP_FORMAT: &str = "%b %d, %Y • %I:%M %p";

/// Pollutants shown as headline metric cards.
pub const HEADLINE_POLLUTANTS: [&str; 4] = ["pm2_5", "pm10", "no2", "co"];

/// Pollutants plotted alongside AQI in the 24h trend.
pub const TREND_POLLUTANTS: [&str; 3] = ["pm2_5", "pm10", "no2"];

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct PollutantMetric {
    pub key: &'static str,
    pub name: &'static str,
    pub unit: &'static str,
    pub value: Option<f64>,
    pub display: String,
}

/// One bar / pie slice of the current pollutant mix.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct CompositionSlice {
    pub key: String,
    pub name: &'static str,
    pub value: f64,
    /// Percentage of the summed concentrations, one decimal.
    pub share: f64,
}

/// Column-oriented 24h series, ordered by `recorded_at`. Gaps stay `None`.
#[derive(Debug, Serialize, Clone, Default, PartialEq)]
pub struct TrendSeries {
    pub timestamps: Vec<String>,
    pub aqi: Vec<Option<i64>>,
    pub pm2_5: Vec<Option<f64>>,
    pub pm10: Vec<Option<f64>>,
    pub no2: Vec<Option<f64>>,
}

impl TrendSeries {
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct TrendSummary {
    pub min: i64,
    pub max: i64,
    pub mean: f64,
    /// Last AQI minus first AQI over the window.
    pub delta: i64,
}

/// Everything the dashboard renders for a `Ready` station.
#[derive(Debug, Serialize, Clone)]
pub struct DashboardView {
    pub city: String,
    pub aqi: i64,
    pub tier_known: bool,
    pub label: &'static str,
    pub color: &'static str,
    pub background: &'static str,
    pub risk_level: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub precautions: [&'static str; 3],
    pub safe_window: &'static str,
    pub recorded_at: String,
    pub metrics: Vec<PollutantMetric>,
    pub composition: Vec<CompositionSlice>,
    pub trend: TrendSeries,
    pub summary: Option<TrendSummary>,
}

impl DashboardView {
    pub fn derive(city: &str, reading: &CurrentReading, history: &[HistoryPoint]) -> Self {
        let entry = classify(reading.aqi);
        let (trend, summary) = derive_trend(history).unwrap_or_else(|e| {
            error!(city, error = %e, "failed to build 24h trend");
            (TrendSeries::default(), None)
        });

        Self {
            city: city.to_string(),
            aqi: reading.aqi,
            tier_known: is_known_tier(reading.aqi),
            label: entry.label,
            color: entry.color,
            background: entry.background,
            risk_level: entry.risk_level,
            title: entry.title,
            description: entry.description,
            precautions: entry.precautions,
            safe_window: entry.safe_window,
            recorded_at: format_timestamp(reading.recorded_at.as_deref()),
            metrics: headline_metrics(reading),
            composition: composition(reading),
            trend,
            summary,
        }
    }
}

/// Rejects readings whose concentrations cannot be displayed.
/// Missing or null pollutants are fine and render as unknown.
pub fn validate_reading(city: &str, reading: &CurrentReading) -> Result<(), SkyGuardError> {
    for (key, value) in &reading.pollutants {
        if let Some(v) = value {
            if !v.is_finite() || *v < 0.0 {
                return Err(SkyGuardError::Derivation(format!(
                    "{city} reported an invalid {key} concentration ({v})"
                )));
            }
        }
    }
    Ok(())
}

/// Renders `raw` as `Jan 01, 2025 • 10:00 AM`. Unparseable input comes back
/// unchanged, a missing timestamp as `N/A`.
pub fn format_timestamp(raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        return "N/A".to_string();
    };
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.format(TIMESTAMP_FORMAT).to_string();
    }
    match parse_naive(raw) {
        Some(dt) => dt.format(TIMESTAMP_FORMAT).to_string(),
        None => raw.to_string(),
    }
}

/// Offset-less datetime or plain date (midnight).
fn parse_naive(raw: &str) -> Option<NaiveDateTime> {
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|pattern| NaiveDateTime::parse_from_str(raw, pattern).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Milliseconds since the epoch for ordering history. Offset-less values are
/// read as UTC; `None` when the string is not a recognisable timestamp.
fn timestamp_millis(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.timestamp_millis())
        .ok()
        .or_else(|| parse_naive(raw).map(|dt| dt.and_utc().timestamp_millis()))
}

fn headline_metrics(reading: &CurrentReading) -> Vec<PollutantMetric> {
    HEADLINE_POLLUTANTS
        .iter()
        .map(|&key| {
            let (name, unit) = pollutant_display(key);
            let value = reading.concentration(key);
            let display = match value {
                Some(v) => format!("{v} {unit}"),
                None => "N/A".to_string(),
            };
            PollutantMetric {
                key,
                name,
                unit,
                value,
                display,
            }
        })
        .collect()
}

fn composition(reading: &CurrentReading) -> Vec<CompositionSlice> {
    let present: Vec<(&String, f64)> = reading
        .pollutants
        .iter()
        .filter_map(|(key, value)| value.map(|v| (key, v)))
        .sorted_by_key(|(key, _)| {
            POLLUTANTS
                .iter()
                .position(|p| *p == key.as_str())
                .unwrap_or(POLLUTANTS.len())
        })
        .collect();
    let total: f64 = present.iter().map(|(_, v)| v).sum();

    present
        .into_iter()
        .map(|(key, value)| {
            let share = if total > 0.0 {
                (value / total * 1000.0).round() / 10.0
            } else {
                0.0
            };
            CompositionSlice {
                key: key.clone(),
                name: pollutant_display(key).0,
                value,
                share,
            }
        })
        .collect()
}

fn history_frame(history: &[HistoryPoint]) -> PolarsResult<DataFrame> {
    let recorded_at: Vec<&str> = history.iter().map(|p| p.recorded_at.as_str()).collect();
    let instant: Vec<Option<i64>> = recorded_at.iter().map(|s| timestamp_millis(s)).collect();
    let aqi: Vec<Option<i64>> = history.iter().map(|p| p.aqi).collect();

    let mut columns = vec![
        Column::new("recorded_at".into(), recorded_at),
        Column::new("instant".into(), instant),
        Column::new("aqi".into(), aqi),
    ];
    for key in TREND_POLLUTANTS {
        let values: Vec<Option<f64>> = history.iter().map(|p| p.concentration(key)).collect();
        columns.push(Column::new(key.into(), values));
    }

    DataFrame::new(columns)?
        .lazy()
        .sort(
            ["instant"],
            SortMultipleOptions::default()
                .with_nulls_last(true)
                .with_maintain_order(true),
        )
        .collect()
}

fn f64_column(df: &DataFrame, name: &str) -> Vec<Option<f64>> {
    df.column(name)
        .ok()
        .and_then(|c| c.f64().ok())
        .map(|ca| ca.into_iter().collect())
        .unwrap_or_default()
}

/// Builds the ordered trend series and the AQI summary. Empty history gives
/// an empty series and no summary.
pub fn derive_trend(
    history: &[HistoryPoint],
) -> PolarsResult<(TrendSeries, Option<TrendSummary>)> {
    if history.is_empty() {
        return Ok((TrendSeries::default(), None));
    }

    let df = history_frame(history)?;

    let timestamps: Vec<String> = df
        .column("recorded_at")
        .ok()
        .and_then(|c| c.str().ok())
        .map(|ca| {
            ca.into_iter()
                .map(|s| s.unwrap_or_default().to_string())
                .collect()
        })
        .unwrap_or_default();
    let aqi: Vec<Option<i64>> = df
        .column("aqi")
        .ok()
        .and_then(|c| c.i64().ok())
        .map(|ca| ca.into_iter().collect())
        .unwrap_or_default();

    let stats = df
        .clone()
        .lazy()
        .select([
            col("aqi").min().alias("min"),
            col("aqi").max().alias("max"),
            col("aqi").mean().alias("mean"),
        ])
        .collect()?;
    let min = stats
        .column("min")
        .ok()
        .and_then(|c| c.i64().ok())
        .and_then(|ca| ca.get(0));
    let max = stats
        .column("max")
        .ok()
        .and_then(|c| c.i64().ok())
        .and_then(|ca| ca.get(0));
    let mean = f64_column(&stats, "mean").first().copied().flatten();
    let first = aqi.iter().flatten().next().copied();
    let last = aqi.iter().flatten().last().copied();

    let summary = match (min, max, mean, first, last) {
        (Some(min), Some(max), Some(mean), Some(first), Some(last)) => Some(TrendSummary {
            min,
            max,
            mean,
            delta: last - first,
        }),
        _ => None,
    };

    let series = TrendSeries {
        timestamps,
        aqi,
        pm2_5: f64_column(&df, "pm2_5"),
        pm10: f64_column(&df, "pm10"),
        no2: f64_column(&df, "no2"),
    };
    Ok((series, summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reading(value: serde_json::Value) -> CurrentReading {
        serde_json::from_value(value).unwrap()
    }

    fn point(recorded_at: &str, aqi: Option<i64>, pm2_5: Option<f64>) -> HistoryPoint {
        serde_json::from_value(json!({
            "recorded_at": recorded_at,
            "aqi": aqi,
            "pollutants": { "pm2_5": pm2_5 }
        }))
        .unwrap()
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(
            format_timestamp(Some("2025-01-01T10:00:00Z")),
            "Jan 01, 2025 • 10:00 AM"
        );
        assert_eq!(
            format_timestamp(Some("2025-03-15T18:45:30.123+05:30")),
            "Mar 15, 2025 • 06:45 PM"
        );
        assert_eq!(
            format_timestamp(Some("2025-03-15 07:05:00")),
            "Mar 15, 2025 • 07:05 AM"
        );
        assert_eq!(format_timestamp(Some("2025-03-15")), "Mar 15, 2025 • 12:00 AM");
        assert_eq!(format_timestamp(Some("yesterday-ish")), "yesterday-ish");
        assert_eq!(format_timestamp(None), "N/A");
    }

    #[test]
    fn test_poor_reading_view() {
        let current = reading(json!({
            "aqi": 4,
            "pollutants": { "pm2_5": 120, "pm10": 200, "no2": 40, "co": 1.2 },
            "recorded_at": "2025-01-01T10:00:00Z"
        }));
        let view = DashboardView::derive("Delhi", &current, &[]);

        assert_eq!(view.label, "Poor");
        assert_eq!(view.risk_level, "High");
        assert_eq!(view.safe_window, "30 Minutes");
        assert!(view.tier_known);
        assert_eq!(view.recorded_at, "Jan 01, 2025 • 10:00 AM");
        let displays: Vec<_> = view.metrics.iter().map(|m| m.display.as_str()).collect();
        assert_eq!(displays, ["120 µg/m³", "200 µg/m³", "40 µg/m³", "1.2 mg/m³"]);
        assert!(view.trend.is_empty());
        assert!(view.summary.is_none());
    }

    #[test]
    fn test_unknown_tier_uses_default_entry() {
        let current = reading(json!({ "aqi": 9, "pollutants": { "pm2_5": 5 } }));
        let view = DashboardView::derive("X", &current, &[]);
        assert!(!view.tier_known);
        assert_eq!(view.aqi, 9);
        assert_eq!(view.label, "Moderate");
        assert_eq!(view.recorded_at, "N/A");
    }

    #[test]
    fn test_missing_pollutant_is_unknown() {
        let current = reading(json!({ "aqi": 2, "pollutants": { "pm2_5": 10, "pm10": null } }));
        let view = DashboardView::derive("Mumbai", &current, &[]);
        let pm10 = &view.metrics[1];
        assert_eq!((pm10.key, pm10.value), ("pm10", None));
        assert_eq!(pm10.display, "N/A");
        assert_eq!(view.metrics[3].display, "N/A");
    }

    #[test]
    fn test_composition_order_and_share() {
        let current = reading(json!({
            "aqi": 2,
            "pollutants": { "zz": 10, "no2": 30, "pm2_5": 60, "o3": null }
        }));
        let slices = composition(&current);
        let keys: Vec<_> = slices.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, ["pm2_5", "no2", "zz"]);
        let shares: Vec<_> = slices.iter().map(|s| s.share).collect();
        assert_eq!(shares, [60.0, 30.0, 10.0]);
        assert_eq!(slices[2].name, "Other");
    }

    #[test]
    fn test_validate_rejects_negative_concentration() {
        let bad = reading(json!({ "aqi": 2, "pollutants": { "pm10": -3 } }));
        let err = validate_reading("Kolkata", &bad).unwrap_err();
        assert!(err.to_string().contains("pm10"));

        let sparse = reading(json!({ "aqi": 2, "pollutants": { "pm10": null } }));
        assert!(validate_reading("Kolkata", &sparse).is_ok());
    }

    #[test]
    fn test_trend_is_time_ordered_with_gaps() {
        let history = vec![
            point("2025-01-01T10:00:00Z", Some(4), Some(120.0)),
            point("2025-01-01T08:00:00Z", Some(2), None),
            point("2025-01-01T09:00:00Z", None, Some(80.0)),
        ];
        let (series, summary) = derive_trend(&history).unwrap();

        assert_eq!(
            series.timestamps,
            [
                "2025-01-01T08:00:00Z",
                "2025-01-01T09:00:00Z",
                "2025-01-01T10:00:00Z"
            ]
        );
        assert_eq!(series.aqi, [Some(2), None, Some(4)]);
        assert_eq!(series.pm2_5, [None, Some(80.0), Some(120.0)]);
        assert_eq!(series.pm10, [None, None, None]);

        let summary = summary.unwrap();
        assert_eq!((summary.min, summary.max, summary.delta), (2, 4, 2));
        assert!((summary.mean - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_trend_orders_by_instant_across_formats() {
        let history = vec![
            point("2025-01-01 10:00:00", Some(5), None),
            point("not a time", Some(3), None),
            point("2025-01-01T05:00:00Z", Some(2), None),
            point("2025-01-01T08:00:00", Some(4), None),
            point("2025-01-01T09:30:00+05:30", Some(1), None),
        ];
        let (series, summary) = derive_trend(&history).unwrap();

        assert_eq!(
            series.timestamps,
            [
                "2025-01-01T09:30:00+05:30",
                "2025-01-01T05:00:00Z",
                "2025-01-01T08:00:00",
                "2025-01-01 10:00:00",
                "not a time"
            ]
        );
        assert_eq!(series.aqi, [Some(1), Some(2), Some(4), Some(5), Some(3)]);
        assert_eq!(summary.unwrap().delta, 2);
    }

    #[test]
    fn test_timestamp_millis() {
        assert_eq!(
            timestamp_millis("2025-01-01T09:30:00+05:30"),
            timestamp_millis("2025-01-01T04:00:00Z")
        );
        assert_eq!(
            timestamp_millis("2025-01-01 04:00:00"),
            timestamp_millis("2025-01-01T04:00:00Z")
        );
        assert_eq!(timestamp_millis("2025-01-01"), Some(1_735_689_600_000));
        assert_eq!(timestamp_millis("soon"), None);
    }

    #[test]
    fn test_trend_without_aqi_has_no_summary() {
        let history = vec![point("2025-01-01T08:00:00Z", None, Some(10.0))];
        let (series, summary) = derive_trend(&history).unwrap();
        assert_eq!(series.timestamps.len(), 1);
        assert!(summary.is_none());
    }

    #[test]
    fn test_empty_history_gives_empty_series() {
        let (series, summary) = derive_trend(&[]).unwrap();
        assert_eq!(series, TrendSeries::default());
        assert!(summary.is_none());
    }
}
