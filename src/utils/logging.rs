use clap::ValueEnum;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::settings::{LogFormat, LoggingConfig};
use crate::config::types::ServiceConfig;
use crate::utils::constants::DEFAULT_LOG_LEVEL;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    TRACE,
    DEBUG,
    INFO,
    WARN,
    ERROR,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match *self {
            LogLevel::TRACE => "TRACE",
            LogLevel::DEBUG => "DEBUG",
            LogLevel::INFO => "INFO",
            LogLevel::WARN => "WARN",
            LogLevel::ERROR => "ERROR",
        }
    }
}

/// Resolves the effective logging config: CLI level first, then the config
/// file, then `info`.
pub fn resolve(configured: Option<&LoggingConfig>, arg_log_level: Option<LogLevel>) -> LoggingConfig {
    let configured = configured.cloned().unwrap_or_default();
    let level = match arg_log_level {
        Some(level) => level.as_str().to_owned(),
        None if configured.level.is_empty() => DEFAULT_LOG_LEVEL.to_owned(),
        None => configured.level,
    };
    LoggingConfig::new(level, configured.format)
}

pub fn run(service_config: &ServiceConfig, arg_log_level: Option<LogLevel>) {
    init_logging(&resolve(service_config.settings.logging.as_ref(), arg_log_level));
}

/// Logging for when no config could be loaded: CLI level or `info`, compact.
pub fn run_fallback(arg_log_level: Option<LogLevel>) {
    init_logging(&resolve(None, arg_log_level));
}

/// Initialize tracing with the desired config.
pub fn init_logging(cfg: &LoggingConfig) {
    let env_filter = EnvFilter::try_new(&cfg.level).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));

    let registry = tracing_subscriber::registry().with(env_filter);

    match cfg.format {
        LogFormat::Json => {
            let layer = fmt::layer()
                .json()
                .with_timer(UtcTime::rfc_3339())
                .flatten_event(true)
                .with_ansi(false);

            let _ = registry.with(layer).try_init();
        }
        LogFormat::Compact => {
            let layer = fmt::layer().compact().with_timer(UtcTime::rfc_3339()).with_ansi(true);

            let _ = registry.with(layer).try_init();
        }
    };
}
