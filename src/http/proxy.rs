//! Proxy handler.
//!
//! Forwards every request under the API prefix to the single configured
//! upstream and relays its answer.
//!
//! # Request Flow
//! ```text
//! upstream configured?          no  → 500 WORKER_URL not configured
//! method supported?             no  → 405 Unsupported method
//! OPTIONS?                      yes → 204 + CORS (upstream never contacted)
//! rewrite URL, filter headers, buffer body (not for GET/HEAD)
//! send within the deadline      elapsed → 504, transport error → 502
//! relay status + headers + body with CORS overlaid
//! ```

use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{header, Method, Request},
    response::{IntoResponse, Response},
};
use url::Url;

use crate::http::request::request_id;
use crate::http::response::{self, ProxyError};
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::resilience::timeouts::with_deadline;
use crate::security::headers::forwardable_request_headers;

/// Methods the gateway forwards.
pub const SUPPORTED_METHODS: [Method; 6] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
    Method::OPTIONS,
];

pub fn is_supported_method(method: &Method) -> bool {
    SUPPORTED_METHODS.contains(method)
}

/// Whether the inbound body is forwarded for this method.
pub fn forwards_body(method: &Method) -> bool {
    *method != Method::GET && *method != Method::HEAD
}

/// Remove the API prefix from a path, if present.
pub fn strip_prefix<'a>(path: &'a str, prefix: &str) -> &'a str {
    path.strip_prefix(prefix).unwrap_or(path)
}

/// Parse the configured worker URL into a base usable for forwarding.
///
/// `None` when the URL is missing, does not start with `http`, or does not parse.
pub fn parse_upstream_base(worker_url: Option<&str>) -> Option<Url> {
    let raw = worker_url.filter(|url| url.starts_with("http"))?;
    Url::parse(raw).ok().filter(|url| !url.cannot_be_a_base())
}

/// Build the upstream URL for an inbound path and query.
///
/// The path suffix after `prefix` is joined to the base path with exactly
/// one slash; the inbound query replaces any query on the base.
pub fn target_url(base: &Url, path: &str, prefix: &str, query: Option<&str>) -> Url {
    let suffix = strip_prefix(path, prefix).trim_start_matches('/');
    let joined = format!("{}/{}", base.path().trim_end_matches('/'), suffix);

    let mut target = base.clone();
    target.set_path(&joined);
    target.set_query(query.filter(|q| !q.is_empty()));
    target.set_fragment(None);
    target
}

/// Main proxy handler.
pub async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let request_id = request_id(&request);
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %path,
        "Proxying request"
    );

    let response = match forward(&state, request).await {
        Ok(response) => response,
        Err(err) => {
            match &err {
                ProxyError::UpstreamTimeout => {
                    tracing::warn!(request_id = %request_id, path = %path, timeout = ?state.timeout, "Upstream timeout");
                    metrics::record_upstream_failure("timeout");
                }
                ProxyError::Upstream(e) => {
                    tracing::error!(request_id = %request_id, path = %path, error = %e, "Upstream error");
                    metrics::record_upstream_failure("transport");
                }
                ProxyError::NotConfigured => {
                    tracing::error!(request_id = %request_id, "WORKER_URL not configured");
                }
                other => {
                    tracing::warn!(request_id = %request_id, method = %method, error = %other, "Rejected request");
                }
            }
            err.into_response()
        }
    };

    metrics::record_request(method.as_str(), response.status().as_u16(), start_time);
    response
}

async fn forward(state: &AppState, request: Request<Body>) -> Result<Response, ProxyError> {
    let base = state.upstream_base.as_ref().ok_or(ProxyError::NotConfigured)?;

    let method = request.method().clone();
    if !is_supported_method(&method) {
        return Err(ProxyError::UnsupportedMethod);
    }
    if method == Method::OPTIONS {
        return Ok(response::proxy_preflight());
    }

    let (parts, body) = request.into_parts();
    let target = target_url(base, parts.uri.path(), &state.api_prefix, parts.uri.query());

    let mut headers = forwardable_request_headers(&parts.headers);
    // Framing follows the forwarded body, not the inbound one.
    headers.remove(header::CONTENT_LENGTH);

    let mut outbound = state
        .client
        .request(method.clone(), target.clone())
        .headers(headers);

    if forwards_body(&method) {
        let bytes = axum::body::to_bytes(body, state.max_body_bytes)
            .await
            .map_err(ProxyError::Body)?;
        outbound = outbound.body(bytes);
    }

    tracing::trace!(target_url = %target, "Forwarding to upstream");

    let upstream = with_deadline(state.timeout, outbound.send())
        .await
        .map_err(|_| ProxyError::UpstreamTimeout)?
        .map_err(|e| {
            if e.is_timeout() {
                ProxyError::UpstreamTimeout
            } else {
                ProxyError::Upstream(e)
            }
        })?;

    tracing::debug!(status = %upstream.status(), target_url = %target, "Upstream responded");
    Ok(response::relay(upstream))
}
