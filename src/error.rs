//! Error types shared by the token sources, the transport and the API client.

use std::fmt;
use std::sync::Arc;

use http::{HeaderMap, StatusCode};
use reqwest::Url;
use serde::Deserialize;
use thiserror::Error;

use crate::transport::redact::{sanitize_error, sanitize_url};

#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Missing token source, malformed base URL and similar setup mistakes.
    #[error("wxwork: configuration error: {0}")]
    Config(String),

    /// Connection level failure. The URL carried by the error is redacted.
    #[error("wxwork: http error: {0}")]
    Http(#[source] Arc<reqwest::Error>),

    #[error("wxwork: context canceled")]
    Canceled,

    #[error("wxwork: context deadline exceeded")]
    DeadlineExceeded,

    /// The token endpoint answered with a non-2xx status or a non-zero `errcode`.
    #[error(transparent)]
    Retrieve(#[from] RetrieveError),

    /// 2xx answer with `errcode` 0 but no token in it.
    #[error("oauth2: server response missing access_token")]
    MissingAccessToken,

    #[error("wxwork: decode error: {0}")]
    Decode(String),

    /// Rejected before any request is built.
    #[error("wxwork: {0}")]
    Validation(String),

    #[error("wxwork: unknown message type: {0}")]
    UnknownMessageType(String),

    /// The API answered with an error envelope.
    #[error(transparent)]
    Api(#[from] ErrorResponse),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(Arc::new(sanitize_error(err)))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl Error {
    /// True when the call was abandoned because its context signalled done.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Canceled | Self::DeadlineExceeded)
    }

    /// API error code, when the error carries one.
    pub fn api_code(&self) -> Option<i64> {
        match self {
            Self::Api(e) => Some(e.code),
            Self::Retrieve(e) if e.code != 0 => Some(e.code),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Failed token round-trip.
///
/// `body` holds what was read from the response, truncated to the
/// retriever's read cap.
#[derive(Debug, Clone)]
pub struct RetrieveError {
    pub url: Url,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub code: i64,
    pub message: String,
    pub body: Vec<u8>,
}

impl RetrieveError {
    pub fn new(url: &Url, status: StatusCode, headers: HeaderMap, body: Vec<u8>) -> Self {
        Self {
            url: sanitize_url(url),
            status,
            headers,
            code: 0,
            message: String::new(),
            body,
        }
    }

    pub fn with_api_error(mut self, code: i64, message: String) -> Self {
        self.code = code;
        self.message = message;
        self
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

impl fmt::Display for RetrieveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "oauth2: cannot fetch token from {}: {}: {}",
            self.url,
            self.status,
            self.body_text()
        )
    }
}

impl std::error::Error for RetrieveError {}

/// Error envelope returned by the API.
///
/// Only `errcode` and `errmsg` come from the body, the rest is filled in
/// from the HTTP exchange.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorResponse {
    #[serde(rename = "errcode", default)]
    pub code: i64,
    #[serde(rename = "errmsg", default)]
    pub message: String,

    #[serde(skip)]
    pub http_code: u16,
    #[serde(skip)]
    pub body: String,
    #[serde(skip)]
    pub headers: HeaderMap,
    #[serde(skip)]
    pub url: Option<Url>,
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("wxwork: ")?;
        if let Some(url) = &self.url {
            write!(f, "{url}: ")?;
        }
        if self.message.is_empty() {
            return write!(f, "HTTP response code {} with body: {}", self.http_code, self.body);
        }
        write!(f, "Error: {} {}: {}", self.http_code, self.code, self.message.trim())
    }
}

impl std::error::Error for ErrorResponse {}
