//! HTTP client layer — `StockflowHttp` with per-endpoint retry policies.

pub mod client;
pub mod retry;

pub use client::StockflowHttp;
pub use retry::{RetryConfig, RetryPolicy};
