//! Runtime configuration for RidePulse
//!
//! Settings are layered: built-in defaults, then an optional `ridepulse.toml`
//! file, then `RIDEPULSE__`-prefixed environment variables (double underscore
//! separates nesting levels, e.g. `RIDEPULSE__ALERTING__THRESHOLD=2.0`).

use crate::error::Result;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::net::SocketAddr;

/// Top-level settings tree
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub ephemeral: EphemeralSettings,
    pub durable: DurableSettings,
    pub alerting: AlertingSettings,
    pub analytics: AnalyticsSettings,
}

/// HTTP server binding
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl ServerSettings {
    pub fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port).parse().map_err(|e| {
            crate::error::RidepulseError::Config(config::ConfigError::Message(format!(
                "invalid server address {}:{}: {}",
                self.host, self.port, e
            )))
        })
    }
}

/// Ephemeral keyed store (Redis-compatible REST endpoint)
#[derive(Debug, Clone, Deserialize)]
pub struct EphemeralSettings {
    /// Base URL of the REST endpoint
    pub url: String,
    /// Bearer token; never logged
    pub token: String,
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
}

/// Durable record store (libSQL database file)
#[derive(Debug, Clone, Deserialize)]
pub struct DurableSettings {
    pub path: String,
    /// Per-operation timeout in milliseconds
    pub timeout_ms: u64,
}

/// Alert derivation tuning
#[derive(Debug, Clone, Deserialize)]
pub struct AlertingSettings {
    /// Scores strictly below this value alert
    pub threshold: f64,
}

/// Analytics query bounds
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyticsSettings {
    /// Window size when the caller does not pass one
    pub default_limit: usize,
    /// Hard cap on any requested window
    pub max_limit: usize,
}

impl Settings {
    /// Load settings from defaults, optional file, and environment
    pub fn load() -> Result<Self> {
        let settings = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000_i64)?
            .set_default("ephemeral.url", "")?
            .set_default("ephemeral.token", "")?
            .set_default("ephemeral.timeout_ms", 5_000_i64)?
            .set_default("durable.path", "ridepulse.db")?
            .set_default("durable.timeout_ms", 10_000_i64)?
            .set_default("alerting.threshold", 2.5)?
            .set_default("analytics.default_limit", 1_000_i64)?
            .set_default("analytics.max_limit", 5_000_i64)?
            .add_source(File::with_name("ridepulse").required(false))
            .add_source(
                Environment::with_prefix("RIDEPULSE")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
