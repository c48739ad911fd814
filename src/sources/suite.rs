use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::cache::token::Token;
use crate::cache::token_cache::ReuseTokenSource;
use crate::context::Context;
use crate::error::Result;
use crate::sources::retrieve::retrieve_token;
use crate::sources::TokenSource;
use crate::transport::Transport;

pub const DEFAULT_TOKEN_URL: &str = "https://qyapi.weixin.qq.com/cgi-bin/service/get_corp_token";

/// Access token of an authorized corp, obtained on behalf of a suite.
///
/// `suite_token_source` provides the `suite_access_token`; any source works,
/// a [`StaticTokenSource`](crate::sources::StaticTokenSource) is enough for
/// a pre-obtained suite token.
#[derive(Clone)]
pub struct Config {
    pub auth_corp_id: String,
    pub permanent_code: SecretString,
    pub suite_token_source: Arc<dyn TokenSource>,
    pub token_url: String,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("auth_corp_id", &self.auth_corp_id)
            .field("permanent_code", &self.permanent_code)
            .field("suite_token_source", &self.suite_token_source.name())
            .field("token_url", &self.token_url)
            .finish()
    }
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    auth_corpid: &'a str,
    permanent_code: &'a str,
}

impl Config {
    pub fn new(
        auth_corp_id: impl Into<String>,
        permanent_code: impl Into<String>,
        suite_token_source: Arc<dyn TokenSource>,
    ) -> Self {
        Self {
            auth_corp_id: auth_corp_id.into(),
            permanent_code: SecretString::from(permanent_code.into()),
            suite_token_source,
            token_url: DEFAULT_TOKEN_URL.to_owned(),
        }
    }

    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    pub async fn token(&self, ctx: &Context) -> Result<Token> {
        ctx.run(self.token_source(ctx).token()).await?
    }

    pub fn token_source(&self, ctx: &Context) -> Arc<dyn TokenSource> {
        let source = SuiteTokenSource { ctx: ctx.detached(), conf: self.clone() };
        ReuseTokenSource::wrap(None, Arc::new(source))
    }

    pub fn transport(&self, ctx: &Context) -> Transport {
        Transport::from_context(ctx, self.token_source(ctx))
    }
}

struct SuiteTokenSource {
    ctx: Context,
    conf: Config,
}

#[async_trait]
impl TokenSource for SuiteTokenSource {
    async fn token(&self) -> Result<Token> {
        let suite_token = self.conf.suite_token_source.token().await?;
        let query = [("suite_access_token", suite_token.access_token.as_str())];
        let body = TokenRequest {
            auth_corpid: &self.conf.auth_corp_id,
            permanent_code: self.conf.permanent_code.expose_secret(),
        };
        retrieve_token(&self.ctx, &self.conf.token_url, &query, Some(&body)).await
    }

    fn name(&self) -> &str {
        "suite"
    }
}
