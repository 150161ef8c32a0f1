//! Network URL constants for the Stockflow SDK.

/// Default REST API base URL (local backend).
pub const DEFAULT_API_URL: &str = "http://localhost:8080";

/// Environment variable read by `StockflowClientBuilder::from_env`.
pub const API_URL_ENV: &str = "STOCKFLOW_API_URL";
