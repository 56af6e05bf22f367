//! Configuration for the Lingua core.
//!
//! `AppConfig` represents the top-level `config.toml`. All fields have
//! sensible defaults; domain constants (point costs, the default room
//! rating, the ban threshold) are code, not configuration.

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// SQLite database URL. When absent, the infra layer derives one from
    /// `LINGUA_DATA_DIR` (falling back to `~/.lingua/lingua.db`).
    #[serde(default)]
    pub database_url: Option<String>,

    /// Bridge tracing spans to OpenTelemetry (stdout exporter).
    #[serde(default)]
    pub enable_otel: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            enable_otel: false,
        }
    }
}
