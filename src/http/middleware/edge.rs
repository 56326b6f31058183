//! Edge middleware.
//!
//! Runs in front of every route. Answers CORS preflights itself and turns a
//! failing downstream chain into an empty 500. Anything else passes through
//! untouched: responses produced downstream do not get the security bundle.

use std::panic::AssertUnwindSafe;

use axum::{
    body::Body,
    http::{Method, Request},
    middleware::Next,
    response::Response,
};
use futures_util::FutureExt;

use crate::http::response;

/// Outcome of screening a request at the edge.
pub enum Flow {
    /// The middleware answers; nothing downstream runs.
    Terminal(Response),
    /// Hand the request to the next stage.
    Continue(Request<Body>),
}

/// Decide whether the edge answers a request itself.
pub fn screen(req: Request<Body>) -> Flow {
    if req.method() == Method::OPTIONS {
        Flow::Terminal(response::preflight())
    } else {
        Flow::Continue(req)
    }
}

/// Axum middleware wiring [`screen`] to the next stage.
pub async fn edge_middleware(req: Request<Body>, next: Next) -> Response {
    let path = req.uri().path().to_string();
    match screen(req) {
        Flow::Terminal(resp) => {
            tracing::debug!(path = %path, "Answered preflight at the edge");
            resp
        }
        Flow::Continue(req) => match AssertUnwindSafe(next.run(req)).catch_unwind().await {
            Ok(resp) => resp,
            Err(_) => {
                tracing::error!(path = %path, "Downstream handler failed");
                response::middleware_failure()
            }
        },
    }
}
