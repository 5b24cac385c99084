//! Typed configuration from environment variables.
//!
//! Loads once at startup and fails fast on malformed values. Nothing here is
//! required; every variable has a default.

use crate::error::{Error, Result};
use std::time::Duration;

const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

#[derive(Debug, Clone)]
pub struct Config {
    pub otel_endpoint: Option<String>,
    pub log_level: String,
    /// How often the interactive monitor refreshes its status line.
    pub poll_interval: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Call `dotenvy::dotenv().ok()` first to pick up a local `.env`.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            otel_endpoint: std::env::var("OTEL_ENDPOINT")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            poll_interval: poll_interval_var("MIGRATE_POLL_INTERVAL_MS")?,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            otel_endpoint: None,
            log_level: "info".to_string(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

fn poll_interval_var(name: &str) -> Result<Duration> {
    let Ok(raw) = std::env::var(name) else {
        return Ok(Duration::from_millis(DEFAULT_POLL_INTERVAL_MS));
    };
    match raw.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => Ok(Duration::from_millis(ms)),
        _ => Err(Error::Config(format!(
            "{name} must be a positive number of milliseconds, got {raw:?}"
        ))),
    }
}
