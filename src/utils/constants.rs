//! Shared constants

pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_CONFIG_PATH: &str = "wxwork.yaml";

// Supported credential types
pub const CREDENTIALS_CORP: &str = "corp";
pub const CREDENTIALS_SUITE: &str = "suite";
