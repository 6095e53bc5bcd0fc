//! In-memory blob storage backend.

use std::collections::HashMap;
use std::sync::RwLock;

use bytes::Bytes;
use ebb_types::ObjectId;
use tracing::debug;

use crate::error::BlobError;
use crate::stream::{BlobStream, STREAM_CHUNK_SIZE, collect_stream, stream_from_shared};
use crate::traits::BlobStore;

/// In-memory blob store backed by a `RwLock<HashMap>`.
///
/// Useful for testing and for running without a data directory. Reads hand
/// out zero-copy slices of the stored buffer.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<ObjectId, Bytes>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a blob is stored under `id`.
    pub fn contains(&self, id: &ObjectId) -> bool {
        let map = self.blobs.read().expect("lock poisoned");
        map.contains_key(id)
    }

    /// Number of stored blobs.
    pub fn len(&self) -> usize {
        let map = self.blobs.read().expect("lock poisoned");
        map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl BlobStore for MemoryBlobStore {
    async fn length(&self, id: &ObjectId) -> Result<u64, BlobError> {
        let map = self.blobs.read().expect("lock poisoned");
        map.get(id)
            .map(|data| data.len() as u64)
            .ok_or_else(|| BlobError::NotFound(id.clone()))
    }

    async fn get_stream(&self, id: &ObjectId) -> Result<BlobStream, BlobError> {
        let data = {
            let map = self.blobs.read().expect("lock poisoned");
            map.get(id)
                .cloned()
                .ok_or_else(|| BlobError::NotFound(id.clone()))?
        };
        Ok(stream_from_shared(data, STREAM_CHUNK_SIZE))
    }

    async fn set(&self, id: &ObjectId, data: BlobStream) -> Result<(), BlobError> {
        // Buffer first so a failing stream never replaces the previous blob.
        let data = collect_stream(data).await?;
        debug!(%id, size = data.len(), "storing blob in memory");
        let mut map = self.blobs.write().expect("lock poisoned");
        map.insert(id.clone(), data);
        Ok(())
    }

    async fn delete(&self, id: &ObjectId) -> Result<(), BlobError> {
        let mut map = self.blobs.write().expect("lock poisoned");
        if map.remove(id).is_some() {
            debug!(%id, "deleted blob from memory");
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), BlobError> {
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "memory"
    }
}
