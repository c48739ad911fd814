use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use futures::StreamExt;
use reqwest::{Body, Client};

use crate::cache::token::Token;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::sources::TokenSource;

pub fn build_reqwest_client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .expect("reqwest client")
}

pub fn test_context() -> Context {
    Context::new().with_client(build_reqwest_client())
}

/// Upstream that counts its calls and hands out `token-<n>` for the n-th call.
pub struct CountingSource {
    calls: AtomicUsize,
    failing: AtomicBool,
    delay: Duration,
    lifetime: Option<TimeDelta>,
}

impl CountingSource {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
            delay: Duration::ZERO,
            lifetime: Some(TimeDelta::hours(2)),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing(self) -> Self {
        self.set_failing(true);
        self
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenSource for CountingSource {
    async fn token(&self) -> Result<Token> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::MissingAccessToken);
        }
        Ok(Token::new(format!("token-{n}"), self.lifetime.map(|d| Utc::now() + d)))
    }

    fn name(&self) -> &str {
        "counting"
    }
}

/// Increments the shared counter when dropped.
pub struct DropGuard(Arc<AtomicUsize>);

impl DropGuard {
    fn touch(&self) {}
}

impl Drop for DropGuard {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Streaming body whose release is observable through `drops`.
pub fn tracked_body(drops: Arc<AtomicUsize>) -> Body {
    let guard = DropGuard(drops);
    let chunks = futures::stream::iter(vec![Ok::<_, std::io::Error>(b"{}".to_vec())]).map(move |chunk| {
        guard.touch();
        chunk
    });
    Body::wrap_stream(chunks)
}
