//! AQI classification tables.
//!
//! One table keyed by tier 1-5 drives every derived colour, label and
//! advisory, so the dashboard badge and the map marker always agree.
//! Tiers outside 1-5 resolve to the Moderate entry.

use serde::Serialize;

/// Tier used for any AQI value outside 1-5.
pub const DEFAULT_TIER: i64 = 3;

/// Marker colour for a city with no current reading.
pub const NO_DATA_COLOR: &str = "#94a3b8";

/// Pollutant vocabulary in display order.
pub const POLLUTANTS: [&str; 7] = ["pm2_5", "pm10", "co", "no2", "so2", "o3", "nh3"];

/// Cities shown when the backend city list is unavailable.
pub const FALLBACK_CITIES: [&str; 6] = [
    "Delhi",
    "Mumbai",
    "Ahmedabad",
    "Bengaluru",
    "Kolkata",
    "Chennai",
];

/// Static presentation data for one AQI tier.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct ClassificationEntry {
    pub tier: i64,
    pub label: &'static str,
    pub color: &'static str,
    /// Translucent variant of `color` for badge backgrounds.
    pub background: &'static str,
    pub safe_window: &'static str,
    pub risk_level: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub precautions: [&'static str; 3],
}

const LEVELS: [ClassificationEntry; 5] = [
    ClassificationEntry {
        tier: 1,
        label: "Good",
        color: "#22c55e",
        background: "rgba(34, 197, 94, 0.1)",
        safe_window: "Unlimited",
        risk_level: "Low",
        title: "Clean Air - Safe",
        description: "Air quality is ideal for all outdoor activities.",
        precautions: [
            "Perfect for outdoor exercise",
            "Safe for children and elderly",
            "Open windows for fresh air",
        ],
    },
    ClassificationEntry {
        tier: 2,
        label: "Fair",
        color: "#84cc16",
        background: "rgba(132, 204, 22, 0.1)",
        safe_window: "4–6 Hours",
        risk_level: "Minor",
        title: "Fair - Low Risk",
        description: "Air quality is acceptable; no special precautions needed.",
        precautions: [
            "Regular activity is fine",
            "Ventilation is safe",
            "No risk for sensitive groups",
        ],
    },
    ClassificationEntry {
        tier: 3,
        label: "Moderate",
        color: "#eab308",
        background: "rgba(234, 179, 8, 0.1)",
        safe_window: "1–2 Hours",
        risk_level: "Moderate",
        title: "Moderate - Warning",
        description: "Sensitive individuals may experience slight health effects.",
        precautions: [
            "Sensitive groups should wear masks",
            "Reduce heavy outdoor exertion",
            "Close windows if you feel irritation",
        ],
    },
    ClassificationEntry {
        tier: 4,
        label: "Poor",
        color: "#f97316",
        background: "rgba(249, 115, 22, 0.1)",
        safe_window: "30 Minutes",
        risk_level: "High",
        title: "Poor - Unhealthy",
        description: "Everyone may begin to experience health effects.",
        precautions: [
            "Avoid outdoor cardio exercise",
            "Wear N95 masks outdoors",
            "Use indoor air purifiers",
        ],
    },
    ClassificationEntry {
        tier: 5,
        label: "Very Poor",
        color: "#ef4444",
        background: "rgba(239, 68, 68, 0.1)",
        safe_window: "Avoid Exposure",
        risk_level: "Severe",
        title: "Very Poor - Hazardous",
        description: "Health warnings for emergency conditions.",
        precautions: [
            "Stay indoors strictly",
            "Keep all windows shut",
            "High-grade masks mandatory",
        ],
    },
];

/// Whether `tier` is on the backend's 1-5 scale.
pub fn is_known_tier(tier: i64) -> bool {
    (1..=5).contains(&tier)
}

/// Classification for `tier`; out-of-range tiers get the Moderate entry.
pub fn classify(tier: i64) -> &'static ClassificationEntry {
    let tier = if is_known_tier(tier) { tier } else { DEFAULT_TIER };
    &LEVELS[(tier - 1) as usize]
}

/// Map marker colour. Same palette as `classify`.
pub fn marker_color(tier: i64) -> &'static str {
    classify(tier).color
}

/// Coarse outdoor exposure advisory for the headline number.
pub fn safe_exposure_window(tier: i64) -> &'static str {
    match tier {
        i64::MIN..=1 => "Unlimited",
        2 => "4–6 Hours",
        3 => "1–2 Hours",
        4 => "30 Minutes",
        _ => "Stay Indoors",
    }
}

/// Human-readable name and unit for the headline pollutants.
pub fn pollutant_display(key: &str) -> (&'static str, &'static str) {
    match key {
        "pm2_5" => ("PM2.5", "µg/m³"),
        "pm10" => ("PM10", "µg/m³"),
        "no2" => ("Nitrogen Dioxide", "µg/m³"),
        "co" => ("Carbon Monoxide", "mg/m³"),
        "so2" => ("Sulphur Dioxide", "µg/m³"),
        "o3" => ("Ozone", "µg/m³"),
        "nh3" => ("Ammonia", "µg/m³"),
        _ => ("Other", "µg/m³"),
    }
}

/// Map coordinates (lat, lon) for the built-in monitoring network.
pub fn city_coordinates(city: &str) -> Option<(f64, f64)> {
    match city {
        "Delhi" => Some((28.6139, 77.2090)),
        "Mumbai" => Some((19.0760, 72.8777)),
        "Ahmedabad" => Some((23.0258, 72.5873)),
        "Bengaluru" => Some((12.9716, 77.5946)),
        "Kolkata" => Some((22.5726, 88.3639)),
        "Chennai" => Some((13.0827, 80.2707)),
        _ => None,
    }
}
