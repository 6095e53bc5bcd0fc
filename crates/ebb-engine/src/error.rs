//! Error types for the coordinator.

use std::fmt;

use ebb_blob::BlobError;
use ebb_meta::MetaError;
use ebb_types::ObjectId;

/// Which backing store a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Metadata,
    Blob,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Metadata => f.write_str("metadata"),
            Backend::Blob => f.write_str("blob"),
        }
    }
}

/// Errors that can occur during coordinator operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Nothing is stored under the id.
    #[error("object not found: {0}")]
    NotFound(ObjectId),

    /// The presented owner token does not match the stored one.
    #[error("owner token mismatch for {0}")]
    Unauthorized(ObjectId),

    /// A liveness probe failed.
    #[error("{backend} store unavailable: {reason}")]
    Unavailable {
        /// The store that failed its probe.
        backend: Backend,
        /// The store's own description of the failure.
        reason: String,
    },

    /// Blob store failure, passed through unchanged.
    #[error("blob store error: {0}")]
    Blob(BlobError),

    /// Metadata store failure, passed through unchanged.
    #[error("metadata store error: {0}")]
    Meta(#[from] MetaError),
}

impl From<BlobError> for EngineError {
    fn from(e: BlobError) -> Self {
        match e {
            BlobError::NotFound(id) => EngineError::NotFound(id),
            other => EngineError::Blob(other),
        }
    }
}

impl EngineError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, EngineError::NotFound(_))
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, EngineError::Unauthorized(_))
    }

    /// Whether the failure is a store being unreachable rather than a
    /// refused request.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            EngineError::Unavailable { .. }
                | EngineError::Blob(BlobError::Unavailable(_))
                | EngineError::Meta(MetaError::Unavailable(_) | MetaError::Closed)
        )
    }
}
