//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → headers.rs (strip hop-by-hop + Origin before forwarding)
//!     → Pass to upstream
//!
//! Outgoing response:
//!     → headers.rs (strip framing, overlay CORS / security bundles)
//! ```

pub mod headers;
