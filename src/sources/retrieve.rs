//! Token round-trip against a token endpoint.
//!
//! The endpoint signals application failures inside 200 responses, so the
//! HTTP status alone does not decide success.
use http::{HeaderMap, StatusCode};
use reqwest::{Response, Url};
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::token::Token;
use crate::context::Context;
use crate::error::{Error, Result, RetrieveError};
use crate::helpers::time::expiry_after_seconds;
use crate::transport::redact::sanitize_url;

/// Upper bound on how much of a token response is read.
pub const MAX_BODY_BYTES: usize = 1 << 20;

#[derive(Debug, Deserialize)]
struct TokenJson {
    #[serde(default)]
    errcode: i64,
    #[serde(default)]
    errmsg: String,
    #[serde(default)]
    access_token: String,
    #[serde(default, deserialize_with = "expires_in")]
    expires_in: Option<i64>,
}

/// Accepts `7200` as well as `"7200"`.
fn expires_in<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("expires_in {n} is not an integer"))),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|e| de::Error::custom(format!("expires_in {s:?}: {e}"))),
        Some(other) => Err(de::Error::custom(format!("expires_in: unexpected value {other}"))),
    }
}

/// POSTs to `token_url` with `query` appended and `body` JSON-encoded, then
/// classifies the answer.
pub async fn retrieve_token<B>(
    ctx: &Context,
    token_url: &str,
    query: &[(&str, &str)],
    body: Option<&B>,
) -> Result<Token>
where
    B: Serialize + ?Sized,
{
    let request = new_request(ctx, token_url, query, body)?;
    let url = request.url().clone();
    debug!(url = %sanitize_url(&url), "retrieving token");

    let response = ctx.run(ctx.client().execute(request)).await??;
    let (status, headers, body) = ctx.run(read_capped(response, MAX_BODY_BYTES)).await??;

    parse_token_response(&url, status, headers, body)
}

fn new_request<B>(ctx: &Context, token_url: &str, query: &[(&str, &str)], body: Option<&B>) -> Result<reqwest::Request>
where
    B: Serialize + ?Sized,
{
    let mut url = Url::parse(token_url)
        .map_err(|e| Error::Config(format!("invalid token url {token_url:?}: {e}")))?;
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }

    let mut builder = ctx.client().post(url);
    if let Some(body) = body {
        builder = builder.json(body);
    }
    Ok(builder.build()?)
}

async fn read_capped(mut response: Response, limit: usize) -> Result<(StatusCode, HeaderMap, Vec<u8>)> {
    let status = response.status();
    let headers = response.headers().clone();

    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        let remaining = limit - body.len();
        if chunk.len() >= remaining {
            body.extend_from_slice(&chunk[..remaining]);
            break;
        }
        body.extend_from_slice(&chunk);
    }
    Ok((status, headers, body))
}

fn parse_token_response(url: &Url, status: StatusCode, headers: HeaderMap, body: Vec<u8>) -> Result<Token> {
    if !status.is_success() {
        warn!(url = %sanitize_url(url), %status, "token endpoint returned non-2xx status");
        return Err(RetrieveError::new(url, status, headers, body).into());
    }

    let parsed: TokenJson = serde_json::from_slice(&body)?;
    if parsed.errcode != 0 {
        warn!(url = %sanitize_url(url), errcode = parsed.errcode, errmsg = %parsed.errmsg, "token endpoint returned api error");
        return Err(RetrieveError::new(url, status, headers, body)
            .with_api_error(parsed.errcode, parsed.errmsg)
            .into());
    }

    if parsed.access_token.is_empty() {
        return Err(Error::MissingAccessToken);
    }

    let expiry = expiry_after_seconds(parsed.expires_in)?;
    Ok(Token::new(parsed.access_token, expiry))
}
