//! Credentialed transport: every request leaves with `access_token=<token>`
//! in its query string.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Request, Response};
use tracing::{debug, warn};

use crate::cache::token_cache::ReuseTokenSource;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::sources::TokenSource;
use crate::transport::redact::sanitize_url;

pub mod redact;

/// Sends a fully built request.
#[async_trait]
pub trait HttpSend: Send + Sync {
    async fn send(&self, request: Request) -> reqwest::Result<Response>;
}

#[async_trait]
impl HttpSend for Client {
    async fn send(&self, request: Request) -> reqwest::Result<Response> {
        self.execute(request).await
    }
}

/// Injects a token from `source` into each request, then hands it to `base`.
///
/// Holds no per-request state; clones share the base sender and the source.
#[derive(Clone)]
pub struct Transport {
    base: Arc<dyn HttpSend>,
    source: Option<Arc<dyn TokenSource>>,
}

impl Default for Transport {
    fn default() -> Self {
        Self { base: Arc::new(Client::new()), source: None }
    }
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport")
            .field("source", &self.source.as_ref().map(|s| s.name()))
            .finish_non_exhaustive()
    }
}

impl Transport {
    pub fn new(source: Arc<dyn TokenSource>) -> Self {
        Self { source: Some(source), ..Self::default() }
    }

    /// Transport over the context's client with a caching wrapper around `source`.
    pub fn from_context(ctx: &Context, source: Arc<dyn TokenSource>) -> Self {
        Self::new(ReuseTokenSource::wrap(None, source)).with_base(ctx.client().clone())
    }

    pub fn with_base(mut self, base: impl HttpSend + 'static) -> Self {
        self.base = Arc::new(base);
        self
    }

    pub fn with_source(mut self, source: Arc<dyn TokenSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn source(&self) -> Option<&Arc<dyn TokenSource>> {
        self.source.as_ref()
    }

    /// Authenticates and sends `request`.
    ///
    /// The request, body included, is owned by this call and dropped on every
    /// early return, so nothing leaks when no token can be obtained.
    pub async fn round_trip(&self, mut request: Request) -> Result<Response> {
        let Some(source) = self.source.as_ref() else {
            return Err(Error::Config("transport's token source is not set".to_owned()));
        };

        let token = match source.token().await {
            Ok(token) => token,
            Err(err) => {
                warn!(url = %sanitize_url(request.url()), error = %err, "no token, request not sent");
                return Err(err);
            }
        };
        token.set_auth_parameter(&mut request);

        debug!(method = %request.method(), url = %sanitize_url(request.url()), "sending request");
        Ok(self.base.send(request).await?)
    }
}
