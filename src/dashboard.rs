//! Selection & presentation orchestration.
//!
//! `Dashboard` owns the data source and the response caches. It drives a
//! caller-owned `Session` through select -> load -> ready/empty/error and
//! turns the result into presentation values.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::TtlCache;
use crate::classification::{
    city_coordinates, classify, marker_color, safe_exposure_window, FALLBACK_CITIES, NO_DATA_COLOR,
};
use crate::client::AqiSource;
use crate::models::{CurrentReading, HistoryPoint};
use crate::presentation::{validate_reading, DashboardView};
use crate::session::{Session, ViewState};

/// Time-to-live per cached backend call.
#[derive(Debug, Clone, Copy)]
pub struct CacheTtls {
    pub cities: Duration,
    pub current: Duration,
    pub history: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            cities: Duration::from_secs(3600),
            current: Duration::from_secs(300),
            history: Duration::from_secs(600),
        }
    }
}

/// One marker on the home page map.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct CityMarker {
    pub city: String,
    pub lat: f64,
    pub lon: f64,
    pub aqi: Option<i64>,
    pub color: &'static str,
    pub label: &'static str,
    pub safe_time: &'static str,
}

pub struct Dashboard<S> {
    source: S,
    ttls: CacheTtls,
    cities: TtlCache<(), Vec<String>>,
    current: TtlCache<String, Option<CurrentReading>>,
    history: TtlCache<String, Vec<HistoryPoint>>,
}

impl<S: AqiSource> Dashboard<S> {
    pub fn new(source: S, ttls: CacheTtls) -> Self {
        Self {
            source,
            ttls,
            cities: TtlCache::new(),
            current: TtlCache::new(),
            history: TtlCache::new(),
        }
    }

    /// Backend city list, or the last good list, or the built-in fallback.
    pub async fn cities(&self) -> Vec<String> {
        let listed = self
            .cities
            .get_or_refresh((), self.ttls.cities, || async move {
                let cities = self.source.list_cities().await;
                (!cities.is_empty()).then_some(cities)
            })
            .await;

        listed.unwrap_or_else(|| {
            warn!("city list unavailable, using built-in stations");
            FALLBACK_CITIES.iter().map(|c| c.to_string()).collect()
        })
    }

    pub async fn default_city(&self) -> String {
        self.cities()
            .await
            .into_iter()
            .next()
            .unwrap_or_else(|| FALLBACK_CITIES[0].to_string())
    }

    /// A new session parked on the default city.
    pub async fn start_session(&self) -> Session {
        Session::new(self.default_city().await)
    }

    pub async fn current_conditions(&self, city: &str) -> Option<CurrentReading> {
        self.current
            .get_or_fetch(city.to_string(), self.ttls.current, || {
                self.source.current_conditions(city)
            })
            .await
    }

    pub async fn history_24h(&self, city: &str) -> Vec<HistoryPoint> {
        self.history
            .get_or_fetch(city.to_string(), self.ttls.history, || {
                self.source.history_24h(city)
            })
            .await
    }

    pub async fn health(&self) -> Option<Value> {
        self.source.health().await
    }

    /// Fetches data for the city the session is loading and settles it into
    /// `Ready`, `Empty` or `Error`. Does nothing unless the session is loading.
    pub async fn load(&self, session: &mut Session) {
        let ViewState::Loading { city } = session.state() else {
            return;
        };
        let city = city.clone();

        let (reading, history) =
            tokio::join!(self.current_conditions(&city), self.history_24h(&city));
        debug!(
            %city,
            has_reading = reading.is_some(),
            history_points = history.len(),
            "station data arrived"
        );
        session.data_arrived(&city, reading, history);

        if let ViewState::Ready { reading, .. } = session.state() {
            if let Err(e) = validate_reading(&city, reading) {
                warn!(%city, error = %e, "cannot derive dashboard values");
                session.derivation_failed(e.to_string());
            }
        }
    }

    /// `select` followed by `load`.
    pub async fn select(&self, session: &mut Session, city: &str) {
        session.select(city);
        self.load(session).await;
    }

    /// Map markers for every listed city with known coordinates.
    pub async fn markers(&self) -> Vec<CityMarker> {
        let mut markers = Vec::new();
        for city in self.cities().await {
            let Some((lat, lon)) = city_coordinates(&city) else {
                continue;
            };
            let aqi = self.current_conditions(&city).await.map(|r| r.aqi);
            let (color, label, safe_time) = match aqi {
                Some(tier) => (
                    marker_color(tier),
                    classify(tier).label,
                    safe_exposure_window(tier),
                ),
                None => (NO_DATA_COLOR, "No Data", "Unknown"),
            };
            markers.push(CityMarker {
                city,
                lat,
                lon,
                aqi,
                color,
                label,
                safe_time,
            });
        }
        markers
    }

    /// Drops expired cache entries. Returns how many were removed.
    pub async fn sweep_caches(&self) -> usize {
        let removed = self.cities.sweep_expired().await
            + self.current.sweep_expired().await
            + self.history.sweep_expired().await;
        if removed == 0 {
            debug!("cache sweep found nothing expired");
        } else {
            info!(removed, "swept expired cache entries");
        }
        removed
    }
}

/// Presentation values for a `Ready` session; `None` in any other state.
pub fn view(session: &Session) -> Option<DashboardView> {
    match session.state() {
        ViewState::Ready {
            city,
            reading,
            history,
        } => Some(DashboardView::derive(city, reading, history)),
        _ => None,
    }
}
