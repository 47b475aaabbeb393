use std::env;
use std::str::FromStr;
use std::time::Duration;

use tera::Tera;
use tracing::warn;

use crate::client::{AqiClient, RequestTimeouts};
use crate::dashboard::{CacheTtls, Dashboard};
use crate::error::SkyGuardError;

/// Public backend used when `BACKEND_BASE_URL` is not set.
pub const DEFAULT_BACKEND_URL: &str = "https://skyguard-app.onrender.com";

/// Application configuration from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to bind the HTTP server to.
    pub bind_address: String,
    /// Base URL of the AQI backend.
    pub backend_base_url: String,
    /// Glob the tera templates are loaded from.
    pub templates_glob: String,
    /// Directory served under `/static`.
    pub static_dir: String,
    pub ttls: CacheTtls,
    pub timeouts: RequestTimeouts,
    /// Cron expression for dropping expired cache entries.
    pub cache_sweep_cron: String,
}

impl Config {
    /// Creates Config from environment variables with defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let string = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.into());
        let secs = |key: &str, default: u64| Duration::from_secs(parse_or(&lookup, key, default));
        let ttl_defaults = CacheTtls::default();
        let timeout_defaults = RequestTimeouts::default();

        Self {
            bind_address: string("BIND_ADDRESS", "0.0.0.0:8501"),
            backend_base_url: string("BACKEND_BASE_URL", DEFAULT_BACKEND_URL),
            templates_glob: string("TEMPLATES_GLOB", "templates/**/*.html"),
            static_dir: string("STATIC_DIR", "static"),
            ttls: CacheTtls {
                cities: secs("CITIES_TTL_SECS", ttl_defaults.cities.as_secs()),
                current: secs("CURRENT_TTL_SECS", ttl_defaults.current.as_secs()),
                history: secs("HISTORY_TTL_SECS", ttl_defaults.history.as_secs()),
            },
            timeouts: RequestTimeouts {
                standard: secs("REQUEST_TIMEOUT_SECS", timeout_defaults.standard.as_secs()),
                history: secs("HISTORY_TIMEOUT_SECS", timeout_defaults.history.as_secs()),
            },
            cache_sweep_cron: string("CACHE_SWEEP_CRON", "0 */15 * * * *"),
        }
    }
}

fn parse_or<T>(lookup: impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, %default, "unparseable setting, using default");
            default
        }),
    }
}

/// Shared application state passed to all request handlers.
pub struct AppState {
    /// Template engine for rendering HTML pages.
    pub tera: Tera,
    pub dashboard: Dashboard<AqiClient>,
}

impl AppState {
    pub fn new(tera: Tera, dashboard: Dashboard<AqiClient>) -> Self {
        Self { tera, dashboard }
    }

    /// Loads templates and builds the backend client described by `config`.
    pub fn from_config(config: &Config) -> Result<Self, SkyGuardError> {
        let tera = Tera::new(&config.templates_glob)?;
        let client = AqiClient::new(&config.backend_base_url, config.timeouts)?;
        Ok(Self::new(tera, Dashboard::new(client, config.ttls)))
    }
}
