//! # WeChat Work API client
//!
//! Fetches access tokens from the WeChat Work token endpoints, caches them
//! until shortly before they expire, and injects them into every API call
//! made through the credentialed transport.
//!
//! Modules:
//! - `cache`: token value and the reusable single-slot token cache
//! - `sources`: token sources: static, corp credentials, suite authorization
//! - `transport`: request decorator adding `access_token`, URL redaction
//! - `api`: API client, error envelopes, message sending
//! - `config`: YAML service configuration used by the `wxwork-send` binary

pub mod api;
pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod helpers;
pub mod observability;
pub mod sources;
pub mod transport;
pub mod utils;

#[cfg(test)]
mod tests;

pub use crate::api::{Client, Message, MsgType, SendOptions, SendResult, TargetSet};
pub use crate::cache::token::Token;
pub use crate::cache::token_cache::ReuseTokenSource;
pub use crate::context::Context;
pub use crate::error::{Error, ErrorResponse, Result, RetrieveError};
pub use crate::sources::{StaticTokenSource, TokenSource};
pub use crate::transport::Transport;
