//! Shared types for the retouch image editing service
//!
//! Holds the error taxonomy, the geometry and wire types exchanged
//! between the HTTP surface and the pipeline, and configuration
//! resolution. Kept free of HTTP and image-processing dependencies so
//! it stays cheap to depend on.

pub mod config;
pub mod error;
pub mod types;

pub use error::{Error, Result};
