//! Resilience patterns.
//!
//! # Data Flow
//! ```text
//! Proxy handler
//!     → timeouts.rs (per-request deadline around the upstream call)
//!     → upstream
//! ```
//!
//! # Design Decisions
//! - Exactly one upstream attempt per request: no retries, no backoff
//! - Cancellation is request-scoped

pub mod timeouts;
