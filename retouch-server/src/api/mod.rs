//! HTTP API handlers

pub mod error;
pub mod health;
pub mod images;

pub use error::{ApiError, ApiResult};
