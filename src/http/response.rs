//! Response handling and transformation.
//!
//! # Responsibilities
//! - Build the responses the gateway synthesizes itself (preflight, failures)
//! - Relay upstream responses with the CORS bundle overlaid
//! - Map proxy errors to HTTP status codes with a JSON `{ "error": ... }` body
//!
//! # Design Decisions
//! - Streaming responses avoid buffering the entire upstream body
//! - Hop-by-hop headers stripped automatically
//! - Upstream timeouts result in 504 Gateway Timeout

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::security::headers::{self, ALLOW_ORIGIN, CORS_HEADERS, SECURITY_HEADERS};

/// Content type of every JSON error body.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Errors the proxy handler answers locally.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// No usable upstream base URL is configured.
    #[error("WORKER_URL not configured")]
    NotConfigured,
    /// Method outside GET, POST, PUT, PATCH, DELETE, OPTIONS.
    #[error("Unsupported method")]
    UnsupportedMethod,
    /// Inbound body could not be buffered: over `max_body_bytes`, or the
    /// read failed (e.g. the client went away mid-upload). Both answer 413.
    #[error("Request body too large")]
    Body(#[source] axum::Error),
    /// Upstream did not answer within the budget.
    #[error("Upstream timeout")]
    UpstreamTimeout,
    /// Network, DNS or connection failure talking to the upstream.
    #[error("Upstream error")]
    Upstream(#[source] reqwest::Error),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::NotConfigured => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::UnsupportedMethod => StatusCode::METHOD_NOT_ALLOWED,
            ProxyError::Body(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ProxyError::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Whether the failure happened talking to the upstream.
    pub fn is_upstream(&self) -> bool {
        matches!(self, ProxyError::UpstreamTimeout | ProxyError::Upstream(_))
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let mut response = json_error(self.status(), &self.to_string());
        if self.is_upstream() {
            headers::apply(response.headers_mut(), &[ALLOW_ORIGIN]);
        }
        response
    }
}

/// A JSON `{ "error": message }` response.
pub fn json_error(status: StatusCode, message: &str) -> Response {
    let mut response = (status, Json(json!({ "error": message }))).into_response();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(JSON_CONTENT_TYPE),
    );
    response
}

/// 204 answer to a CORS preflight issued by the edge middleware.
pub fn preflight() -> Response {
    let mut response = StatusCode::NO_CONTENT.into_response();
    headers::apply(response.headers_mut(), &SECURITY_HEADERS);
    headers::apply(response.headers_mut(), &CORS_HEADERS);
    response
}

/// 204 answer to OPTIONS reaching the proxy handler: CORS headers only.
pub fn proxy_preflight() -> Response {
    let mut response = StatusCode::NO_CONTENT.into_response();
    headers::apply(response.headers_mut(), &CORS_HEADERS);
    response
}

/// Empty 500 returned when the downstream chain fails.
pub fn middleware_failure() -> Response {
    let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
    headers::apply(response.headers_mut(), &SECURITY_HEADERS);
    headers::apply(response.headers_mut(), &[ALLOW_ORIGIN]);
    response
}

/// Relay an upstream answer: status and body verbatim, CORS bundle on top.
pub fn relay(upstream: reqwest::Response) -> Response {
    let status = upstream.status();
    let headers = relay_headers(upstream.headers());
    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

fn relay_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut out = headers::relayable_response_headers(upstream);
    headers::apply(&mut out, &CORS_HEADERS);
    out
}
