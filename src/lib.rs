//! Edge gateway library.
//!
//! Answers CORS preflights at the edge and forwards everything under the API
//! prefix to one configured upstream.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod security;

pub use config::schema::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
