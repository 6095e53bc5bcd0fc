//! Core trait for blob storage.

use ebb_types::ObjectId;

use crate::error::BlobError;
use crate::stream::BlobStream;

/// Trait for storing and retrieving object payloads.
///
/// All implementations must be `Send + Sync`: a single handle is shared by
/// every concurrent request. Payloads move as [`BlobStream`]s so objects of
/// any size pass through without being held in memory whole.
///
/// No ordering is promised between a `set` and a concurrent `get_stream` on
/// the same id. The last writer wins; an overlapping reader may see either
/// version.
#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    /// Size in bytes of the stored blob.
    async fn length(&self, id: &ObjectId) -> Result<u64, BlobError>;

    /// Open a lazy byte stream over the blob.
    ///
    /// Fails with [`BlobError::NotFound`] if nothing is stored under `id`.
    async fn get_stream(&self, id: &ObjectId) -> Result<BlobStream, BlobError>;

    /// Persist `data` under `id`, replacing any previous blob.
    ///
    /// Returns once the backend's durability guarantee is met.
    async fn set(&self, id: &ObjectId, data: BlobStream) -> Result<(), BlobError>;

    /// Remove the blob. Deleting an absent id succeeds.
    async fn delete(&self, id: &ObjectId) -> Result<(), BlobError>;

    /// Liveness probe.
    async fn ping(&self) -> Result<(), BlobError>;

    /// Short backend name for logs (`"file"`, `"s3"`, `"memory"`).
    fn kind(&self) -> &'static str;
}
