//! HTTP surface (feature `axum_api`).
//!
//! Wire types are camelCase. Errors are `{"error": ..., "code": ...}`.

mod types;

pub use types::*;

pub mod axum;
