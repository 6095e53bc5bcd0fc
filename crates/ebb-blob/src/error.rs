//! Error types for blob storage operations.

use ebb_types::ObjectId;

/// Errors that can occur during blob storage operations.
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    /// No blob is stored under the id.
    #[error("blob not found: {0}")]
    NotFound(ObjectId),

    /// An I/O error occurred, either on disk or while reading the
    /// caller-supplied stream.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The object-store service rejected or failed a request.
    #[error("object store error: {0}")]
    Backend(String),

    /// The backend cannot be reached at all.
    #[error("blob store unavailable: {0}")]
    Unavailable(String),
}
