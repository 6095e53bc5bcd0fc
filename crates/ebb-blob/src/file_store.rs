//! File-based blob storage backend.
//!
//! Layout under the base directory:
//!
//! - `objects/{id}`: committed blobs.
//! - `tmp/{seq}.part`: in-flight writes, renamed into `objects/` once
//!   fully written and synced. Named by sequence only so that any valid id
//!   fits within the filesystem's name limit.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use ebb_types::ObjectId;
use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::BlobError;
use crate::stream::{BlobStream, stream_from_reader};
use crate::traits::BlobStore;

/// File-based blob store.
///
/// Writes are atomic: data is streamed into a temporary file, synced, then
/// renamed into place. A failed write never leaves a truncated blob behind
/// under the object's name.
pub struct FileBlobStore {
    base_dir: PathBuf,
    objects_dir: PathBuf,
    tmp_dir: PathBuf,
    tmp_seq: AtomicU64,
}

impl FileBlobStore {
    /// Create a new file store rooted at the given directory.
    ///
    /// The directory tree is created if it does not exist. Leftover
    /// temporary files from an earlier crash are removed.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self, BlobError> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let objects_dir = base_dir.join("objects");
        let tmp_dir = base_dir.join("tmp");
        std::fs::create_dir_all(&objects_dir)?;
        if tmp_dir.exists() {
            std::fs::remove_dir_all(&tmp_dir)?;
        }
        std::fs::create_dir_all(&tmp_dir)?;
        Ok(Self {
            base_dir,
            objects_dir,
            tmp_dir,
            tmp_seq: AtomicU64::new(0),
        })
    }

    /// Root directory of this store.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn blob_path(&self, id: &ObjectId) -> PathBuf {
        self.objects_dir.join(id.as_str())
    }

    fn tmp_path(&self) -> PathBuf {
        let seq = self.tmp_seq.fetch_add(1, Ordering::Relaxed);
        self.tmp_dir.join(format!("{seq}.part"))
    }

    /// Stream `data` into `tmp`, syncing before returning the byte count.
    async fn write_tmp(tmp: &Path, mut data: BlobStream) -> Result<u64, BlobError> {
        let mut file = tokio::fs::File::create(tmp).await?;
        let mut written = 0u64;
        while let Some(chunk) = data.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        file.sync_all().await?;
        Ok(written)
    }
}

/// Map a missing file onto [`BlobError::NotFound`].
fn not_found_as(id: &ObjectId, e: std::io::Error) -> BlobError {
    if e.kind() == std::io::ErrorKind::NotFound {
        BlobError::NotFound(id.clone())
    } else {
        BlobError::Io(e)
    }
}

#[async_trait::async_trait]
impl BlobStore for FileBlobStore {
    async fn length(&self, id: &ObjectId) -> Result<u64, BlobError> {
        let meta = tokio::fs::metadata(self.blob_path(id))
            .await
            .map_err(|e| not_found_as(id, e))?;
        Ok(meta.len())
    }

    async fn get_stream(&self, id: &ObjectId) -> Result<BlobStream, BlobError> {
        let file = tokio::fs::File::open(self.blob_path(id))
            .await
            .map_err(|e| not_found_as(id, e))?;
        Ok(stream_from_reader(file))
    }

    async fn set(&self, id: &ObjectId, data: BlobStream) -> Result<(), BlobError> {
        let path = self.blob_path(id);
        let tmp_path = self.tmp_path();

        let committed = async {
            let size = Self::write_tmp(&tmp_path, data).await?;
            tokio::fs::rename(&tmp_path, &path).await?;
            Ok::<_, BlobError>(size)
        };
        let size = match committed.await {
            Ok(size) => size,
            Err(e) => {
                if let Err(rm) = tokio::fs::remove_file(&tmp_path).await
                    && rm.kind() != std::io::ErrorKind::NotFound
                {
                    warn!(%id, path = %tmp_path.display(), error = %rm, "failed to remove partial blob");
                }
                return Err(e);
            }
        };

        debug!(%id, path = %path.display(), size, "stored blob to file");
        Ok(())
    }

    async fn delete(&self, id: &ObjectId) -> Result<(), BlobError> {
        match tokio::fs::remove_file(self.blob_path(id)).await {
            Ok(()) => {
                debug!(%id, "deleted blob file");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BlobError::Io(e)),
        }
    }

    async fn ping(&self) -> Result<(), BlobError> {
        match tokio::fs::metadata(&self.objects_dir).await {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(BlobError::Unavailable(format!(
                "{} is not a directory",
                self.objects_dir.display()
            ))),
            Err(e) => Err(BlobError::Unavailable(format!(
                "{}: {e}",
                self.objects_dir.display()
            ))),
        }
    }

    fn kind(&self) -> &'static str {
        "file"
    }
}
