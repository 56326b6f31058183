//! Header manipulation and security headers.
//!
//! # Responsibilities
//! - Fixed CORS and security response header bundles
//! - Strip hop-by-hop headers in both directions
//! - Drop the browser `Origin` so upstreams never answer with a competing CORS policy
//!
//! # Design Decisions
//! - Header bundles are process-wide constants, not configuration
//! - Names are lowercase so they can be built with `from_static`

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};

/// `access-control-allow-origin` value used on every response.
pub const ALLOW_ORIGIN: (&str, &str) = ("access-control-allow-origin", "*");

/// CORS headers granting any origin access to the API.
pub const CORS_HEADERS: [(&str, &str); 3] = [
    ALLOW_ORIGIN,
    ("access-control-allow-methods", "GET,POST,PUT,PATCH,DELETE,OPTIONS"),
    ("access-control-allow-headers", "content-type,authorization,x-requested-with"),
];

/// Baseline hardening headers.
pub const SECURITY_HEADERS: [(&str, &str); 3] = [
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "DENY"),
    ("referrer-policy", "no-referrer"),
];

/// Connection-scoped headers that never cross the proxy boundary.
pub const HOP_BY_HOP_HEADERS: [&str; 9] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "host",
];

/// Insert (overwriting) every header of a fixed bundle.
pub fn apply(headers: &mut HeaderMap, bundle: &[(&'static str, &'static str)]) {
    for &(name, value) in bundle {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }
}

/// Returns true for hop-by-hop header names.
pub fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP_HEADERS.contains(&name.as_str())
}

/// Headers of an inbound request that may be sent to the upstream.
pub fn forwardable_request_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::with_capacity(inbound.len());
    for (name, value) in inbound {
        if is_hop_by_hop(name) || *name == header::ORIGIN {
            continue;
        }
        out.append(name.clone(), value.clone());
    }
    out
}

/// Headers of an upstream response that are relayed to the caller.
///
/// The server re-frames the body, so framing headers are dropped.
pub fn relayable_response_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::with_capacity(upstream.len() + CORS_HEADERS.len());
    for (name, value) in upstream {
        if is_hop_by_hop(name) {
            continue;
        }
        out.append(name.clone(), value.clone());
    }
    out
}
