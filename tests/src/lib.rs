//! Shared test harness for Ebb integration tests.
//!
//! Provides [`Stack`]: a coordinator over a real file blob store in a
//! temporary directory and an in-memory metadata store, with fault
//! switches on both sides.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use ebb_blob::{BlobStore, FaultyBlobStore, FileBlobStore, collect_stream};
use ebb_engine::{Coordinator, CoordinatorConfig, EngineError};
use ebb_meta::{FaultyMetaStore, MemoryMetaStore, MetadataStore};
use ebb_types::ObjectId;
use tempfile::TempDir;

/// Default lifetime used by [`Stack::new`].
pub const EXPIRE_SECONDS: u64 = 600;

pub struct Stack {
    pub coord: Coordinator,
    pub blobs: Arc<FaultyBlobStore>,
    pub meta: Arc<FaultyMetaStore>,
    raw_meta: Arc<MemoryMetaStore>,
    expire_seconds: u64,
    dir: TempDir,
}

impl Stack {
    pub fn new() -> Self {
        Self::with_expiry(EXPIRE_SECONDS)
    }

    pub fn with_expiry(expire_seconds: u64) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let raw_meta = Arc::new(MemoryMetaStore::new());
        Self::assemble(dir, raw_meta, expire_seconds)
    }

    fn assemble(dir: TempDir, raw_meta: Arc<MemoryMetaStore>, expire_seconds: u64) -> Self {
        let file: Arc<dyn BlobStore> = Arc::new(FileBlobStore::new(dir.path()).unwrap());
        let blobs = Arc::new(FaultyBlobStore::new(file));
        let meta = Arc::new(FaultyMetaStore::new(
            raw_meta.clone() as Arc<dyn MetadataStore>
        ));
        let coord = Coordinator::new(
            CoordinatorConfig { expire_seconds },
            blobs.clone(),
            meta.clone(),
        );
        Self {
            coord,
            blobs,
            meta,
            raw_meta,
            expire_seconds,
            dir,
        }
    }

    /// Drop the coordinator and blob store and reopen them over the same
    /// directory. The metadata store survives, like an external Redis.
    pub fn restart(self) -> Self {
        let Self {
            raw_meta,
            expire_seconds,
            dir,
            ..
        } = self;
        Self::assemble(dir, raw_meta, expire_seconds)
    }

    pub fn blob_dir(&self) -> &Path {
        self.dir.path()
    }

    /// Where the file store keeps the payload for `id`.
    pub fn blob_path(&self, id: &ObjectId) -> PathBuf {
        self.dir.path().join("objects").join(id.as_str())
    }

    /// Whether a payload file exists on disk, whatever the metadata says.
    pub fn blob_on_disk(&self, id: &ObjectId) -> bool {
        self.blob_path(id).is_file()
    }

    /// Read a whole object through the coordinator.
    pub async fn read(&self, id: &ObjectId) -> Result<Bytes, EngineError> {
        let stream = self.coord.get(id).await?;
        Ok(collect_stream(stream).await?)
    }
}

impl Default for Stack {
    fn default() -> Self {
        Self::new()
    }
}

pub fn oid(s: &str) -> ObjectId {
    ObjectId::new(s).unwrap()
}

/// Generate deterministic test data.
pub fn test_data(size: usize) -> Vec<u8> {
    test_data_seeded(size, 0xDEAD_BEEF)
}

/// Generate test data with a specific seed (for unique objects).
pub fn test_data_seeded(size: usize, seed: u32) -> Vec<u8> {
    let mut data = Vec::with_capacity(size);
    let mut state: u32 = seed;
    for _ in 0..size {
        state = state.wrapping_mul(1103515245).wrapping_add(12345);
        data.push((state >> 16) as u8);
    }
    data
}
