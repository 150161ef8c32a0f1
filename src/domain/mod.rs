//! Domain modules organized as vertical slices.
//!
//! Each sub-module contains:
//! - `mod.rs` — Rich domain types (validated, business-logic-ready)
//! - `wire.rs` — Raw serde structs matching backend responses
//! - `convert.rs` — `From` conversions with lenient parsing
//! - `state.rs` — State containers with update methods
//! - `client.rs` — Sub-client with HTTP methods and caching

pub mod collection;
pub mod series;
pub mod statistics;
pub mod stock;
