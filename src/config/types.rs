use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};

use crate::api::client::{Client, DEFAULT_BASE_URL};
use crate::cache::token::Token;
use crate::config::settings::{HttpConfig, SettingsConfig};
use crate::context::Context;
use crate::sources::{corp, suite, StaticTokenSource};
use crate::transport::Transport;
use crate::utils::constants::{CREDENTIALS_CORP, CREDENTIALS_SUITE};

/// ================================
/// Full service configuration
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    #[serde(default)]
    pub settings: SettingsConfig,
    pub api: ApiConfig,
    pub credentials: CredentialsConfig,
}

/// ================================
/// API
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Application the messages are sent as.
    pub agent_id: i64,
}

/// ================================
/// Credentials
/// ================================
#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CredentialsConfig {
    Corp(CorpCredentials),
    Suite(SuiteCredentials),
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorpCredentials {
    pub corp_id: String,
    #[serde(deserialize_with = "secret")]
    pub corp_secret: SecretString,
    pub token_url: Option<String>,
}

/// Token of a corp that authorized a suite. The suite access token is
/// obtained out of band and served as is.
#[derive(Debug, Deserialize, Clone)]
pub struct SuiteCredentials {
    #[serde(deserialize_with = "secret")]
    pub suite_access_token: SecretString,
    pub auth_corp_id: String,
    #[serde(deserialize_with = "secret")]
    pub permanent_code: SecretString,
    pub token_url: Option<String>,
}

impl CredentialsConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            CredentialsConfig::Corp(_) => CREDENTIALS_CORP,
            CredentialsConfig::Suite(_) => CREDENTIALS_SUITE,
        }
    }

    /// Credentialed transport backed by a cached source for these credentials.
    pub fn transport(&self, ctx: &Context) -> Transport {
        match self {
            CredentialsConfig::Corp(creds) => corp::Config {
                corp_id: creds.corp_id.clone(),
                corp_secret: creds.corp_secret.clone(),
                token_url: token_url_or(&creds.token_url, corp::DEFAULT_TOKEN_URL),
            }
            .transport(ctx),
            CredentialsConfig::Suite(creds) => {
                let suite_token = Token::perpetual(creds.suite_access_token.expose_secret());
                suite::Config {
                    auth_corp_id: creds.auth_corp_id.clone(),
                    permanent_code: creds.permanent_code.clone(),
                    suite_token_source: Arc::new(StaticTokenSource::new(suite_token)),
                    token_url: token_url_or(&creds.token_url, suite::DEFAULT_TOKEN_URL),
                }
                .transport(ctx)
            }
        }
    }
}

impl ServiceConfig {
    pub fn http(&self) -> HttpConfig {
        self.settings.http.clone().unwrap_or_default()
    }

    /// Call context with an HTTP client honouring `settings.http`.
    pub fn context(&self) -> anyhow::Result<Context> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(self.http().timeout_ms))
            .build()?;
        Ok(Context::new().with_client(client))
    }

    /// API client over the configured credentials.
    pub fn client(&self, ctx: &Context) -> crate::error::Result<Client> {
        Client::new(self.credentials.transport(ctx)).with_base_url(&self.api.base_url)
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_owned()
}

fn token_url_or(configured: &Option<String>, default: &str) -> String {
    configured.clone().unwrap_or_else(|| default.to_owned())
}

fn secret<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SecretString, D::Error> {
    String::deserialize(deserializer).map(SecretString::from)
}
