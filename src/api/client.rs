use http::header::{HeaderValue, CONTENT_TYPE, USER_AGENT};
use http::Method;
use reqwest::{Request, Response, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::api::message::MessageService;
use crate::context::Context;
use crate::error::{Error, ErrorResponse, Result};
use crate::observability::metrics::get_metrics;
use crate::transport::redact::sanitize_url;
use crate::transport::Transport;

pub const DEFAULT_BASE_URL: &str = "https://qyapi.weixin.qq.com/";
pub const DEFAULT_USER_AGENT: &str = concat!("wxwork-rs/", env!("CARGO_PKG_VERSION"));

/// WeChat Work API client.
///
/// Requests are authenticated by the [`Transport`], the client only builds
/// them and decodes the answer.
#[derive(Debug, Clone)]
pub struct Client {
    transport: Transport,
    base_url: Url,
    user_agent: String,
}

impl Client {
    pub fn new(transport: Transport) -> Self {
        Self {
            transport,
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base url is valid"),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }

    /// The base URL must end with a slash; relative request paths resolve against it.
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self> {
        self.base_url = Url::parse(base_url)
            .map_err(|e| Error::Config(format!("invalid base url {base_url:?}: {e}")))?;
        Ok(self)
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn message(&self) -> MessageService<'_> {
        MessageService::new(self)
    }

    /// Builds a request for `path`, relative to the base URL. `body`, when
    /// given, is sent as JSON.
    pub fn new_request<B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<Request>
    where
        B: Serialize + ?Sized,
    {
        if !self.base_url.path().ends_with('/') {
            return Err(Error::Config(format!(
                "base URL must have a trailing slash, but {:?} does not",
                self.base_url.as_str()
            )));
        }
        let url = self
            .base_url
            .join(path)
            .map_err(|e| Error::Config(format!("invalid request path {path:?}: {e}")))?;

        let mut request = Request::new(method, url);
        if let Some(body) = body {
            let encoded = serde_json::to_vec(body)?;
            request.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            *request.body_mut() = Some(encoded.into());
        }
        if !self.user_agent.is_empty() {
            let value = HeaderValue::from_str(&self.user_agent)
                .map_err(|e| Error::Config(format!("invalid user agent: {e}")))?;
            request.headers_mut().insert(USER_AGENT, value);
        }
        Ok(request)
    }

    /// Sends `request` through the transport under `ctx` and decodes a
    /// successful envelope into `T`.
    pub async fn execute<T: DeserializeOwned>(&self, ctx: &Context, request: Request) -> Result<T> {
        let metrics = get_metrics().await;
        let endpoint = request.url().path().to_owned();
        metrics.api_requests.with_label_values(&[endpoint.as_str()]).inc();

        let result = async move {
            let response = ctx.run(self.transport.round_trip(request)).await??;
            let body = ctx.run(check_response(response)).await??;
            Ok::<T, Error>(serde_json::from_slice(&body)?)
        }
        .await;

        if let Err(err) = &result {
            metrics.api_failures.with_label_values(&[endpoint.as_str(), failure_kind(err)]).inc();
            warn!(endpoint = endpoint.as_str(), error = %err, "api call failed");
        }
        result
    }
}

fn failure_kind(err: &Error) -> &'static str {
    match err {
        Error::Api(_) => "api",
        Error::Http(_) => "http",
        Error::Canceled | Error::DeadlineExceeded => "canceled",
        Error::Decode(_) => "decode",
        Error::Retrieve(_) | Error::MissingAccessToken => "token",
        Error::Config(_) | Error::Validation(_) | Error::UnknownMessageType(_) => "config",
    }
}

/// Reads the body and returns it when the status is 2xx and `errcode` is 0.
/// Anything else becomes an [`ErrorResponse`].
pub async fn check_response(response: Response) -> Result<Vec<u8>> {
    let status = response.status();
    let headers = response.headers().clone();
    let url = sanitize_url(response.url());
    let body = response.bytes().await?;

    let envelope = serde_json::from_slice::<ErrorResponse>(&body);
    if let Ok(envelope) = &envelope {
        if status.is_success() && envelope.code == 0 {
            debug!(%url, %status, "api call succeeded");
            return Ok(body.to_vec());
        }
    }

    let mut err = envelope.unwrap_or_default();
    err.http_code = status.as_u16();
    err.body = String::from_utf8_lossy(&body).into_owned();
    err.headers = headers;
    err.url = Some(url);
    Err(err.into())
}
