//! Call context threaded through every network operation.
//!
//! Carries the HTTP client used for token round-trips, a cancellation token
//! and an optional deadline. Nothing here is process-global: tests and
//! callers pass their own client explicitly.

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Default)]
pub struct Context {
    client: Client,
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Every call made under this context fails once `timeout` has elapsed.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Same client, without cancellation or deadline. Used by long-lived
    /// token sources so a short call context does not outlive its call.
    pub fn detached(&self) -> Context {
        Context::new().with_client(self.client.clone())
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_done(&self) -> bool {
        self.cancel.is_cancelled() || self.deadline.is_some_and(|d| d <= Instant::now())
    }

    /// Drives `fut` until it completes or the context is done, whichever
    /// comes first. An abandoned future is dropped in place.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output> {
        let deadline = async {
            match self.deadline {
                Some(deadline) => sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Error::Canceled),
            _ = deadline => Err(Error::DeadlineExceeded),
            out = fut => Ok(out),
        }
    }
}
