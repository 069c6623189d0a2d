//! Common error types for retouch

use std::path::PathBuf;
use thiserror::Error;

/// Common result type for retouch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy shared by the pipeline and the HTTP surface
///
/// Each variant corresponds to one failure class a request can hit;
/// handlers map them onto HTTP statuses without losing the kind.
#[derive(Error, Debug)]
pub enum Error {
    /// Source image unreachable or served with a non-2xx status.
    /// `status` is the upstream HTTP status when one was received,
    /// `None` for transport-level failures.
    #[error("Fetch error: {message}")]
    Fetch {
        status: Option<u16>,
        message: String,
    },

    /// Mask rejected before rasterization (fewer than 3 points, or
    /// malformed point data)
    #[error("Invalid mask: {0}")]
    InvalidMask(String),

    /// Image channel layout cannot be normalized to RGBA
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// The generation service rejected or failed the request.
    /// The service's own error payload is carried verbatim; `status`
    /// is absent when no response was received at all.
    #[error("Generation service error: {payload}")]
    RemoteService {
        status: Option<u16>,
        payload: String,
    },

    /// Filesystem failure while writing or removing a pipeline artifact
    #[error("Artifact I/O error at {path}: {source}")]
    ArtifactIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal invariant violation (a bug, not an input error)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for errors caused by the client's request rather than by
    /// this service or its collaborators
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::InvalidMask(_))
    }
}
