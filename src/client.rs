//! Remote data client - the only code that talks to the AQI backend.
//!
//! `AqiClient::try_*` return `Result` so failures can be inspected and
//! logged. The `AqiSource` impl is what the rest of the app uses: it logs
//! every failure and turns it into an empty list or `None`.

use std::future::Future;
use std::time::Duration;

use reqwest::Url;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use crate::error::SkyGuardError;
use crate::models::{CurrentReading, HistoryPoint};

const USER_AGENT: &str = concat!("SkyGuard/", env!("CARGO_PKG_VERSION"));

/// Read-only view of the backend as the dashboard sees it. Never fails.
pub trait AqiSource: Send + Sync + 'static {
    fn health(&self) -> impl Future<Output = Option<Value>> + Send;
    fn list_cities(&self) -> impl Future<Output = Vec<String>> + Send;
    fn current_conditions(&self, city: &str)
        -> impl Future<Output = Option<CurrentReading>> + Send;
    fn history_24h(&self, city: &str) -> impl Future<Output = Vec<HistoryPoint>> + Send;
}

/// Per-request time limits.
#[derive(Debug, Clone, Copy)]
pub struct RequestTimeouts {
    /// Health, city list and current conditions.
    pub standard: Duration,
    /// 24h history, which has larger payloads.
    pub history: Duration,
}

impl Default for RequestTimeouts {
    fn default() -> Self {
        Self {
            standard: Duration::from_secs(5),
            history: Duration::from_secs(10),
        }
    }
}

/// HTTP client for the AQI backend.
#[derive(Debug, Clone)]
pub struct AqiClient {
    client: reqwest::Client,
    base_url: String,
    timeouts: RequestTimeouts,
}

impl AqiClient {
    pub fn new(base_url: &str, timeouts: RequestTimeouts) -> Result<Self, SkyGuardError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url).map_err(|e| SkyGuardError::InvalidBaseUrl(format!("{base_url}: {e}")))?;

        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;

        Ok(Self {
            client,
            base_url,
            timeouts,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str, city: Option<&str>) -> Result<Url, SkyGuardError> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, path))
            .map_err(|e| SkyGuardError::InvalidBaseUrl(e.to_string()))?;
        if let Some(city) = city {
            url.query_pairs_mut().append_pair("city", city);
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        city: Option<&str>,
        timeout: Duration,
    ) -> Result<T, SkyGuardError> {
        let url = self.endpoint(path, city)?;
        debug!(%url, "GET");
        let response = self.client.get(url).timeout(timeout).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SkyGuardError::UnexpectedStatus {
                status: status.as_u16(),
                endpoint: path.to_string(),
            });
        }

        Ok(response.json::<T>().await?)
    }

    pub async fn try_health(&self) -> Result<Value, SkyGuardError> {
        self.get_json("/health/", None, self.timeouts.standard).await
    }

    pub async fn try_cities(&self) -> Result<Vec<String>, SkyGuardError> {
        self.get_json("/cities", None, self.timeouts.standard).await
    }

    pub async fn try_current(&self, city: &str) -> Result<CurrentReading, SkyGuardError> {
        self.get_json("/aqi/current", Some(city), self.timeouts.standard)
            .await
    }

    pub async fn try_history(&self, city: &str) -> Result<Vec<HistoryPoint>, SkyGuardError> {
        self.get_json("/aqi/last-24-hours", Some(city), self.timeouts.history)
            .await
    }
}

impl AqiSource for AqiClient {
    async fn health(&self) -> Option<Value> {
        self.try_health()
            .await
            .inspect_err(|e| error!(error = %e, "health check failed"))
            .ok()
    }

    async fn list_cities(&self) -> Vec<String> {
        self.try_cities().await.unwrap_or_else(|e| {
            error!(error = %e, "failed to fetch cities");
            Vec::new()
        })
    }

    async fn current_conditions(&self, city: &str) -> Option<CurrentReading> {
        self.try_current(city)
            .await
            .inspect_err(|e| error!(city, error = %e, "current AQI fetch failed"))
            .ok()
    }

    async fn history_24h(&self, city: &str) -> Vec<HistoryPoint> {
        self.try_history(city).await.unwrap_or_else(|e| {
            error!(city, error = %e, "24h history fetch failed");
            Vec::new()
        })
    }
}

#[cfg(test)]
pub(crate) mod test_backend {
    //! In-process stand-in for the AQI backend.

    use axum::{extract::Query, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
    use serde::Deserialize;
    use serde_json::json;
    use std::net::SocketAddr;
    use std::time::Duration;

    #[derive(Deserialize)]
    struct CityQuery {
        city: String,
    }

    async fn current(Query(q): Query<CityQuery>) -> impl IntoResponse {
        match q.city.as_str() {
            "Delhi" => Json(json!({
                "aqi": 4,
                "pollutants": { "pm2_5": 120, "pm10": 200, "no2": 40, "co": 1.2 },
                "recorded_at": "2025-01-01T10:00:00Z"
            }))
            .into_response(),
            "Slow" => {
                tokio::time::sleep(Duration::from_secs(2)).await;
                Json(json!({ "aqi": 1 })).into_response()
            }
            "Garbled" => "not json".into_response(),
            _ => StatusCode::NOT_FOUND.into_response(),
        }
    }

    async fn history(Query(q): Query<CityQuery>) -> impl IntoResponse {
        match q.city.as_str() {
            "Delhi" => Json(json!([
                { "recorded_at": "2025-01-01T09:00:00Z", "aqi": 3, "pollutants": { "pm2_5": 80 } },
                { "recorded_at": "2025-01-01T10:00:00Z", "aqi": 4, "pollutants": { "pm2_5": 120 } }
            ]))
            .into_response(),
            _ => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }

    /// Serves a stub backend on an ephemeral port and returns its base URL.
    pub async fn spawn() -> String {
        let app = Router::new()
            .route("/health/", get(|| async { Json(json!({ "status": "ok" })) }))
            .route("/cities", get(|| async { Json(json!(["Delhi", "Mumbai"])) }))
            .route("/aqi/current", get(current))
            .route("/aqi/last-24-hours", get(history));

        let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    /// A base URL nothing listens on.
    pub async fn unreachable() -> String {
        let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{addr}")
    }
}
