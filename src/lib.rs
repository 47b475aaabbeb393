//! SkyGuard: air-quality dashboard server.
//!
//! Fetches AQI readings for a fixed set of cities from a remote backend,
//! caches them for a bounded time and renders them as HTML and JSON.

pub mod cache;
pub mod classification;
pub mod client;
pub mod dashboard;
pub mod error;
pub mod handlers;
pub mod models;
pub mod presentation;
pub mod router;
pub mod session;
pub mod state;
