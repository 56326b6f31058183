//! Client for calling APIs through the edge gateway.
//!
//! ```no_run
//! use gateway_sdk::{ApiClient, ApiResponse, RequestOptions};
//!
//! # async fn demo() {
//! let client = ApiClient::new("http://localhost:8788");
//! let res: ApiResponse<serde_json::Value> = client.fetch("/users", RequestOptions::default()).await;
//! if res.ok {
//!     println!("{:?}", res.data);
//! }
//! # }
//! ```

pub mod client;

pub use client::{
    build_query, is_allowed_method, ApiClient, ApiResponse, RequestBody, RequestOptions,
    API_PREFIX, DEFAULT_TIMEOUT,
};
