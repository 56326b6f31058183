//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Middleware and proxy handler produce:
//!     → logging.rs (structured log events, request ID in every proxy event)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape, opt-in)
//! ```

pub mod logging;
pub mod metrics;
