use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cache::token::Token;
use crate::error::{Error, Result};
use crate::observability::metrics::get_metrics;
use crate::sources::TokenSource;

/// Single-slot token cache in front of another source.
///
/// The slot lock is held across the upstream call, so callers racing past
/// expiry share one refresh instead of each hitting the token endpoint.
/// Callers that queued behind a failed refresh get that refresh's error;
/// the next call after it tries upstream again.
/// The upstream must never call back into the same instance.
pub struct ReuseTokenSource {
    upstream: Arc<dyn TokenSource>,
    current: Mutex<Slot>,
    // Bumped under the slot lock after every completed refresh.
    refreshes: AtomicU64,
}

#[derive(Default)]
struct Slot {
    token: Option<Token>,
    last_failure: Option<Error>,
}

impl ReuseTokenSource {
    pub fn new(initial: Option<Token>, upstream: Arc<dyn TokenSource>) -> Self {
        Self {
            upstream,
            current: Mutex::new(Slot { token: initial, last_failure: None }),
            refreshes: AtomicU64::new(0),
        }
    }

    /// Caching source over `src`, starting with `initial`.
    ///
    /// Wrapping a `ReuseTokenSource` again does not stack caches: without an
    /// initial token the inner instance is returned as is, otherwise the new
    /// cache sits directly on the inner upstream.
    pub fn wrap(initial: Option<Token>, src: Arc<dyn TokenSource>) -> Arc<dyn TokenSource> {
        let inner_upstream = src.as_reuse().map(|inner| inner.upstream.clone());
        match inner_upstream {
            Some(_) if initial.is_none() => src,
            Some(upstream) => Arc::new(Self::new(initial, upstream)),
            None => Arc::new(Self::new(initial, src)),
        }
    }

    pub fn upstream(&self) -> &Arc<dyn TokenSource> {
        &self.upstream
    }

    /// Cached token, valid or not, without triggering a refresh
    pub async fn cached(&self) -> Option<Token> {
        self.current.lock().await.token.clone()
    }
}

#[async_trait]
impl TokenSource for ReuseTokenSource {
    async fn token(&self) -> Result<Token> {
        let seen = self.refreshes.load(Ordering::Acquire);
        let mut slot = self.current.lock().await;
        if let Some(token) = slot.token.as_ref().filter(|t| t.is_valid()) {
            debug!(source = self.upstream.name(), "reusing cached token");
            return Ok(token.clone());
        }
        if self.refreshes.load(Ordering::Acquire) != seen {
            if let Some(err) = &slot.last_failure {
                debug!(source = self.upstream.name(), "returning failure of the refresh this call waited on");
                return Err(err.clone());
            }
        }

        let metrics = get_metrics().await;
        let source = self.upstream.name();
        let start = Instant::now();
        metrics.token_refreshes.with_label_values(&[source]).inc();

        let refreshed = self.upstream.token().await;
        metrics
            .token_refresh_duration
            .with_label_values(&[source])
            .observe(start.elapsed().as_secs_f64());

        let result = match refreshed {
            Ok(token) => {
                info!(source, expiry = ?token.expiry, "token refreshed");
                slot.token = Some(token.clone());
                slot.last_failure = None;
                Ok(token)
            }
            Err(err) => {
                metrics.token_refresh_failures.with_label_values(&[source]).inc();
                warn!(source, error = %err, "token refresh failed, keeping previous cache entry");
                slot.last_failure = Some(err.clone());
                Err(err)
            }
        };
        self.refreshes.fetch_add(1, Ordering::Release);
        result
    }

    fn name(&self) -> &str {
        self.upstream.name()
    }

    fn as_reuse(&self) -> Option<&ReuseTokenSource> {
        Some(self)
    }
}
