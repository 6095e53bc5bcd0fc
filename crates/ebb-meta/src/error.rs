//! Error types for the metadata store.

/// Errors returned by [`MetadataStore`](crate::MetadataStore) operations.
#[derive(Debug, thiserror::Error)]
pub enum MetaError {
    /// Redis rejected or failed a command.
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// The store cannot be reached.
    #[error("metadata store unavailable: {0}")]
    Unavailable(String),

    /// The store was shut down with `quit`.
    #[error("metadata store connection closed")]
    Closed,
}
