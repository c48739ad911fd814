use std::path::Path;

use anyhow::{bail, Context as _, Result};
use regex::Regex;
use reqwest::Url;
use secrecy::ExposeSecret;

use crate::config::settings::{HttpConfig, LoggingConfig};
use crate::config::types::{CredentialsConfig, ServiceConfig};

/// Load and validate config from YAML file
pub async fn file_to_config(path: &Path) -> Result<ServiceConfig> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("cannot read config file {}", path.display()))?;

    let expanded = expand_env_vars(&content)?;
    parse_config(&expanded)
}

/// Parses an already expanded YAML document, applies defaults and validates.
pub fn parse_config(content: &str) -> Result<ServiceConfig> {
    let mut service_config: ServiceConfig = serde_yaml::from_str(content)
        .context("invalid config")?;

    // Apply defaults
    if service_config.settings.logging.is_none() {
        service_config.settings.logging = Some(LoggingConfig::default());
    }
    if service_config.settings.http.is_none() {
        service_config.settings.http = Some(HttpConfig::default());
    }

    validate_service_config(&service_config)?;

    Ok(service_config)
}

/// Replaces `${VAR}` and `${VAR:default}` with the environment value, the
/// default, or an empty string.
pub fn expand_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{(\w+)(?::([^\}]+))?\}")?;
    let expanded = re.replace_all(input, |caps: &regex::Captures| {
        let var = &caps[1];
        let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        std::env::var(var).unwrap_or_else(|_| default.to_string())
    });
    Ok(expanded.into_owned())
}

pub fn validate_service_config(config: &ServiceConfig) -> Result<()> {
    if config.api.agent_id == 0 {
        bail!("api.agent_id must be set to a non-zero application id");
    }

    let base_url = Url::parse(&config.api.base_url)
        .with_context(|| format!("api.base_url {:?} is not a valid URL", config.api.base_url))?;
    if !base_url.path().ends_with('/') {
        bail!("api.base_url {:?} must end with a slash", config.api.base_url);
    }

    if config.http().timeout_ms == 0 {
        bail!("settings.http.timeout_ms must be positive");
    }

    match &config.credentials {
        CredentialsConfig::Corp(creds) => {
            if creds.corp_id.is_empty() {
                bail!("credentials.corp_id is empty");
            }
            if creds.corp_secret.expose_secret().is_empty() {
                bail!("credentials.corp_secret is empty");
            }
        }
        CredentialsConfig::Suite(creds) => {
            if creds.suite_access_token.expose_secret().is_empty() {
                bail!("credentials.suite_access_token is empty");
            }
            if creds.auth_corp_id.is_empty() {
                bail!("credentials.auth_corp_id is empty");
            }
            if creds.permanent_code.expose_secret().is_empty() {
                bail!("credentials.permanent_code is empty");
            }
        }
    }

    Ok(())
}
