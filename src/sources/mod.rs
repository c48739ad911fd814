//! Sources module
//!
//! A token source yields a usable access token on demand. Concrete sources
//! hit a token endpoint every time they are asked; wrap them in
//! [`ReuseTokenSource`] to cache.
use std::sync::Arc;

use async_trait::async_trait;

use crate::cache::token::Token;
use crate::cache::token_cache::ReuseTokenSource;
use crate::error::Result;

pub mod corp;
pub mod retrieve;
pub mod suite;

#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn token(&self) -> Result<Token>;

    /// Label used in logs and metrics
    fn name(&self) -> &str {
        "custom"
    }

    #[doc(hidden)]
    fn as_reuse(&self) -> Option<&ReuseTokenSource> {
        None
    }
}

/// Always hands out the token it was built with, expired or not.
#[derive(Debug, Clone)]
pub struct StaticTokenSource {
    token: Token,
}

impl StaticTokenSource {
    pub fn new(token: Token) -> Self {
        Self { token }
    }

    pub fn shared(token: Token) -> Arc<dyn TokenSource> {
        Arc::new(Self::new(token))
    }
}

#[async_trait]
impl TokenSource for StaticTokenSource {
    async fn token(&self) -> Result<Token> {
        Ok(self.token.clone())
    }

    fn name(&self) -> &str {
        "static"
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::{TimeDelta, Utc};

    #[tokio::test]
    async fn static_source_returns_token_unchanged() {
        let expired = Token::new("abc", Some(Utc::now() - TimeDelta::hours(1)));
        let source = StaticTokenSource::new(expired.clone());

        assert_eq!(source.token().await.unwrap(), expired);
        assert_eq!(source.token().await.unwrap(), expired);
    }
}
