//! Middleware stages run before routing.

pub mod edge;

pub use edge::{edge_middleware, screen, Flow};
