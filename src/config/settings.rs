use serde::Deserialize;

use crate::utils::constants::{DEFAULT_HTTP_TIMEOUT_MS, DEFAULT_LOG_LEVEL};

/// ================================
/// Global service-wide settings
/// ================================
#[derive(Debug, Deserialize, Clone, Default)]
pub struct SettingsConfig {
    pub logging: Option<LoggingConfig>,
    pub http: Option<HttpConfig>,
}

/// ================================
/// HTTP client
/// ================================
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    /// Applies to every round-trip: token endpoints and API calls alike.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_ms: DEFAULT_HTTP_TIMEOUT_MS }
    }
}

/// ================================
/// Logging
/// ================================
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String, // allowed: trace, debug, info, warn, error
    #[serde(default)]
    pub format: LogFormat,
}

impl LoggingConfig {
    pub fn new(level: String, format: LogFormat) -> Self {
        Self { level, format }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_LEVEL.to_owned(), LogFormat::Compact)
    }
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    #[default]
    Compact,
}

fn default_timeout_ms() -> u64 {
    DEFAULT_HTTP_TIMEOUT_MS
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_owned()
}
