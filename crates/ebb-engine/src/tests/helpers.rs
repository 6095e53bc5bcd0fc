//! Shared test utilities for ebb-engine tests.

use std::sync::Arc;

use bytes::Bytes;
use ebb_blob::{BlobStream, FaultyBlobStore, MemoryBlobStore, collect_stream, stream_from_bytes};
use ebb_meta::{FaultyMetaStore, MemoryMetaStore};
use ebb_types::{Metadata, ObjectId};

use crate::coordinator::{Coordinator, CoordinatorConfig};

pub const TEST_EXPIRE_SECONDS: u64 = 300;

/// A coordinator over in-memory stores, with fault switches on both sides
/// and direct access to the raw blob store underneath.
pub struct Harness {
    pub coord: Coordinator,
    pub blobs: Arc<FaultyBlobStore>,
    pub meta: Arc<FaultyMetaStore>,
    pub raw_blobs: Arc<MemoryBlobStore>,
}

pub fn harness() -> Harness {
    harness_with(FaultyBlobStore::new)
}

/// Build a harness, letting the caller tune the blob wrapper (latency etc.).
pub fn harness_with(
    wrap: impl FnOnce(Arc<dyn ebb_blob::BlobStore>) -> FaultyBlobStore,
) -> Harness {
    let raw_blobs = Arc::new(MemoryBlobStore::new());
    let blobs = Arc::new(wrap(raw_blobs.clone()));
    let meta = Arc::new(FaultyMetaStore::new(Arc::new(MemoryMetaStore::new())));
    let coord = Coordinator::new(
        CoordinatorConfig {
            expire_seconds: TEST_EXPIRE_SECONDS,
        },
        blobs.clone(),
        meta.clone(),
    );
    Harness {
        coord,
        blobs,
        meta,
        raw_blobs,
    }
}

pub fn oid(s: &str) -> ObjectId {
    ObjectId::new(s).unwrap()
}

pub fn stream(data: impl Into<Bytes>) -> BlobStream {
    stream_from_bytes(data)
}

pub fn owned_by(owner: &str) -> Metadata {
    Metadata::with_owner(owner)
}

/// Read an object's whole payload through the coordinator.
pub async fn read_all(coord: &Coordinator, id: &ObjectId) -> Bytes {
    collect_stream(coord.get(id).await.unwrap()).await.unwrap()
}

/// Generate deterministic, non-repeating test data.
pub fn test_data(size: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(size);
    let mut state: u32 = 0xDEAD_BEEF;
    for _ in 0..size {
        state = state.wrapping_mul(1103515245).wrapping_add(12345);
        data.push((state >> 16) as u8);
    }
    data
}
