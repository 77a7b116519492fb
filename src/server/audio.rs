//! Range-forwarding audio proxy.
//!
//! `/api/audio/<host>/<path>` is rebuilt into `<scheme>://<host>/<path>` and
//! fetched upstream. Browsers can then seek through episodes hosted on
//! servers without CORS headers. The body is streamed, never buffered.

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use std::time::Duration;
use thiserror::Error;
use url::Url;

use super::error::error_response;
use super::state::AppState;
use crate::util::{validate_upstream_url, UrlValidationError};

/// Path prefix stripped from the request to recover `<host>/<path>`.
pub const AUDIO_ROUTE_PREFIX: &str = "/api/audio/";

/// Upstream headers copied onto a GET response.
const GET_FORWARDED_HEADERS: &[&str] = &["content-type", "content-length", "accept-ranges", "content-range"];

/// Upstream headers copied onto a HEAD response.
const HEAD_FORWARDED_HEADERS: &[&str] = &["content-type", "content-length", "accept-ranges"];

const CORS_HEADERS: &[(&str, &str)] = &[
    ("access-control-allow-origin", "*"),
    ("access-control-allow-methods", "GET, HEAD, OPTIONS"),
    ("access-control-allow-headers", "Range"),
];

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Invalid audio URL: {0}")]
    InvalidTarget(String),

    #[error("Audio target rejected: {0}")]
    Rejected(#[from] UrlValidationError),

    #[error("Audio request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Audio host did not answer within {0:?}")]
    Timeout(Duration),

    #[error("Audio host returned HTTP {0}")]
    UpstreamStatus(StatusCode),

    #[error("Failed to build proxy response: {0}")]
    Response(#[from] axum::http::Error),
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        match self {
            ProxyError::InvalidTarget(_) | ProxyError::Rejected(_) => {
                tracing::warn!(error = %self, "Rejected audio proxy request");
                error_response(StatusCode::BAD_REQUEST, "Invalid audio URL")
            }
            ProxyError::UpstreamStatus(status) => {
                tracing::warn!(status = status.as_u16(), "Audio upstream returned an error status");
                error_response(status, "Failed to fetch audio")
            }
            ProxyError::Network(_) | ProxyError::Timeout(_) | ProxyError::Response(_) => {
                tracing::error!(error = %self, "Audio proxy error");
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to proxy audio")
            }
        }
    }
}

/// Forwards audio requests to the host named in the request path.
pub struct AudioProxy {
    client: reqwest::Client,
    scheme: String,
    allow_private: bool,
    timeout: Duration,
}

impl AudioProxy {
    pub fn new(client: reqwest::Client, scheme: impl Into<String>, allow_private: bool, timeout: Duration) -> Self {
        Self {
            client,
            scheme: scheme.into(),
            allow_private,
            timeout,
        }
    }

    /// Rebuilds the upstream URL from the raw request path.
    ///
    /// The raw path keeps the client's percent-encoding intact. The query
    /// string is not part of the target.
    pub fn target_url(&self, uri: &Uri) -> Result<Url, ProxyError> {
        let rest = uri
            .path()
            .strip_prefix(AUDIO_ROUTE_PREFIX)
            .filter(|rest| !rest.is_empty())
            .ok_or_else(|| ProxyError::InvalidTarget(uri.path().to_string()))?;

        let target = format!("{}://{}", self.scheme, rest);
        Ok(validate_upstream_url(&target, self.allow_private)?)
    }

    /// Sends `method` upstream and relays status, allow-listed headers and body.
    ///
    /// `range` is only forwarded on GET. The timeout covers the wait for
    /// response headers; the body stream runs until the client or upstream
    /// closes it.
    pub async fn forward(&self, method: Method, uri: &Uri, range: Option<&HeaderValue>) -> Result<Response, ProxyError> {
        let target = self.target_url(uri)?;
        let is_head = method == Method::HEAD;

        tracing::debug!(%method, target = %target, range = ?range, "Proxying audio request");

        let mut request = self.client.request(method, target);
        if !is_head {
            if let Some(range) = range {
                request = request.header(header::RANGE, range.clone());
            }
        }

        let upstream = tokio::time::timeout(self.timeout, request.send())
            .await
            .map_err(|_| ProxyError::Timeout(self.timeout))??;

        let status = upstream.status();
        if !status.is_success() {
            return Err(ProxyError::UpstreamStatus(status));
        }

        let forwarded = if is_head {
            HEAD_FORWARDED_HEADERS
        } else {
            GET_FORWARDED_HEADERS
        };

        let mut builder = Response::builder().status(status);
        for name in forwarded {
            if let Some(value) = upstream.headers().get(*name) {
                builder = builder.header(*name, value.clone());
            }
        }
        for (name, value) in CORS_HEADERS {
            builder = builder.header(*name, *value);
        }

        let body = if is_head {
            Body::empty()
        } else {
            // Dropping the response body (client gone) drops this stream and
            // with it the upstream connection.
            Body::from_stream(upstream.bytes_stream())
        };

        Ok(builder.body(body)?)
    }
}

/// `GET /api/audio/*path`
pub async fn proxy_get(State(state): State<AppState>, uri: Uri, headers: HeaderMap) -> Response {
    state
        .audio
        .forward(Method::GET, &uri, headers.get(header::RANGE))
        .await
        .unwrap_or_else(IntoResponse::into_response)
}

/// `HEAD /api/audio/*path`
pub async fn proxy_head(State(state): State<AppState>, uri: Uri) -> Response {
    state
        .audio
        .forward(Method::HEAD, &uri, None)
        .await
        .unwrap_or_else(IntoResponse::into_response)
}

/// `OPTIONS /api/audio/*path`: CORS preflight.
pub async fn preflight() -> Response {
    let mut headers = HeaderMap::new();
    for (name, value) in CORS_HEADERS {
        headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
    }
    (StatusCode::NO_CONTENT, headers).into_response()
}
