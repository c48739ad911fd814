use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::cache::token::Token;
use crate::cache::token_cache::ReuseTokenSource;
use crate::context::Context;
use crate::error::Result;
use crate::sources::retrieve::retrieve_token;
use crate::sources::TokenSource;
use crate::transport::Transport;

pub const DEFAULT_TOKEN_URL: &str = "https://qyapi.weixin.qq.com/cgi-bin/gettoken";

/// Corp credentials exchanged for an access token (`corpid` + `corpsecret`).
#[derive(Debug, Clone)]
pub struct Config {
    pub corp_id: String,
    pub corp_secret: SecretString,
    pub token_url: String,
}

impl Config {
    pub fn new(corp_id: impl Into<String>, corp_secret: impl Into<String>) -> Self {
        Self {
            corp_id: corp_id.into(),
            corp_secret: SecretString::from(corp_secret.into()),
            token_url: DEFAULT_TOKEN_URL.to_owned(),
        }
    }

    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    /// One-off token fetch.
    pub async fn token(&self, ctx: &Context) -> Result<Token> {
        ctx.run(self.token_source(ctx).token()).await?
    }

    /// Cached source that refreshes with `ctx`'s client whenever the token
    /// expires. The deadline and cancellation of `ctx` are not kept.
    pub fn token_source(&self, ctx: &Context) -> Arc<dyn TokenSource> {
        let source = CorpTokenSource { ctx: ctx.detached(), conf: self.clone() };
        ReuseTokenSource::wrap(None, Arc::new(source))
    }

    /// Transport that authenticates every request with this corp's token.
    pub fn transport(&self, ctx: &Context) -> Transport {
        Transport::from_context(ctx, self.token_source(ctx))
    }
}

struct CorpTokenSource {
    ctx: Context,
    conf: Config,
}

#[async_trait]
impl TokenSource for CorpTokenSource {
    async fn token(&self) -> Result<Token> {
        let query = [
            ("corpid", self.conf.corp_id.as_str()),
            ("corpsecret", self.conf.corp_secret.expose_secret()),
        ];
        retrieve_token::<()>(&self.ctx, &self.conf.token_url, &query, None).await
    }

    fn name(&self) -> &str {
        "corp"
    }
}
