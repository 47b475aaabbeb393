//! Per-session selection state.
//!
//! A `Session` is owned by whoever drives it (one per HTTP request in the
//! server) and passed explicitly to the `Dashboard`; nothing here is global.

use serde::Serialize;
use tracing::debug;

use crate::models::{CurrentReading, HistoryPoint};

/// Where a session is in the select / fetch / render cycle.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ViewState {
    Idle {
        city: String,
    },
    Loading {
        city: String,
    },
    Ready {
        city: String,
        reading: CurrentReading,
        history: Vec<HistoryPoint>,
    },
    /// Backend had nothing for this city. Not an error.
    Empty {
        city: String,
    },
    Error {
        city: String,
        message: String,
    },
}

impl ViewState {
    pub fn city(&self) -> &str {
        match self {
            ViewState::Idle { city }
            | ViewState::Loading { city }
            | ViewState::Ready { city, .. }
            | ViewState::Empty { city }
            | ViewState::Error { city, .. } => city,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ViewState::Idle { .. } => "idle",
            ViewState::Loading { .. } => "loading",
            ViewState::Ready { .. } => "ready",
            ViewState::Empty { .. } => "empty",
            ViewState::Error { .. } => "error",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    state: ViewState,
}

impl Session {
    pub fn new(default_city: impl Into<String>) -> Self {
        Self {
            state: ViewState::Idle {
                city: default_city.into(),
            },
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn selected_city(&self) -> &str {
        self.state.city()
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, ViewState::Loading { .. })
    }

    /// Valid from any state.
    pub fn select(&mut self, city: impl Into<String>) {
        let city = city.into();
        debug!(from = self.state.name(), %city, "select");
        self.state = ViewState::Loading { city };
    }

    /// Applies fetched data for `city`. Ignored unless the session is still
    /// loading that same city, so a late answer for an earlier selection
    /// cannot overwrite a newer one.
    pub fn data_arrived(
        &mut self,
        city: &str,
        reading: Option<CurrentReading>,
        history: Vec<HistoryPoint>,
    ) -> bool {
        let ViewState::Loading { city: loading } = &self.state else {
            debug!(state = self.state.name(), city, "data arrived outside loading, dropped");
            return false;
        };
        if loading != city {
            debug!(loading = %loading, city, "stale data arrival dropped");
            return false;
        }

        let city = city.to_string();
        self.state = match reading {
            Some(reading) => ViewState::Ready {
                city,
                reading,
                history,
            },
            None => ViewState::Empty { city },
        };
        true
    }

    /// Valid from `Loading` and `Ready`; ignored elsewhere.
    pub fn derivation_failed(&mut self, message: impl Into<String>) -> bool {
        match &self.state {
            ViewState::Loading { city } | ViewState::Ready { city, .. } => {
                self.state = ViewState::Error {
                    city: city.clone(),
                    message: message.into(),
                };
                true
            }
            _ => false,
        }
    }
}
