use chrono::{DateTime, TimeDelta, Utc};
use reqwest::Request;

/// Seconds subtracted from the nominal expiry so a token is refreshed
/// before the server starts rejecting it.
pub const EXPIRY_DELTA_SECONDS: i64 = 10;

pub fn expiry_delta() -> TimeDelta {
    TimeDelta::seconds(EXPIRY_DELTA_SECONDS)
}

/// Access token issued by a token endpoint.
///
/// A token without expiry is reused forever.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub access_token: String,
    pub expiry: Option<DateTime<Utc>>,
}

impl Token {
    pub fn new(access_token: impl Into<String>, expiry: Option<DateTime<Utc>>) -> Self {
        Self { access_token: access_token.into(), expiry }
    }

    /// Token that never expires
    pub fn perpetual(access_token: impl Into<String>) -> Self {
        Self::new(access_token, None)
    }

    pub fn expired(&self) -> bool {
        self.expired_at(Utc::now())
    }

    fn expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expiry {
            Some(expiry) => expiry - expiry_delta() <= now,
            None => false,
        }
    }

    /// Non-empty and not expired
    pub fn is_valid(&self) -> bool {
        !self.access_token.is_empty() && !self.expired()
    }

    /// Appends `access_token=<token>` to the request query. Headers stay untouched.
    pub fn set_auth_parameter(&self, request: &mut Request) {
        request
            .url_mut()
            .query_pairs_mut()
            .append_pair(ACCESS_TOKEN_PARAM, &self.access_token);
    }
}

pub const ACCESS_TOKEN_PARAM: &str = "access_token";

/// Reports whether `token` is present, has an access token and is not expired.
pub fn valid(token: Option<&Token>) -> bool {
    token.is_some_and(Token::is_valid)
}
