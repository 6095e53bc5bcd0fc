//! [`Coordinator`]: the single entry point for object operations.
//!
//! Each call fans out into the fewest possible calls on the two backing
//! stores. There is no cross-store transaction: a call is ordered only
//! within its own steps, and calls for the same id may interleave freely.
//! Callers that need stronger guarantees serialize per id themselves.
//!
//! Object states per id:
//!
//! ```text
//! ABSENT --set--> LIVE --del / force_delete--> ABSENT
//!                   \--metadata expiry-------> ORPHANED (blob only)
//! ```
//!
//! A blob whose metadata record expired, or whose metadata write failed
//! during `set`, is invisible to [`Coordinator::exists`] and is never
//! reclaimed here.

use std::sync::Arc;

use ebb_blob::{BlobStore, BlobStream};
use ebb_meta::{KeyTtl, MetadataStore};
use ebb_types::{Metadata, OWNER_FIELD, ObjectId};
use tracing::{debug, info, warn};

use crate::error::{Backend, EngineError};

/// Lifetime given to new objects when none is configured: one day.
pub const DEFAULT_EXPIRE_SECONDS: u64 = 86_400;

/// Configuration for creating a [`Coordinator`].
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Expiry applied to the metadata record of every new object.
    pub expire_seconds: u64,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            expire_seconds: DEFAULT_EXPIRE_SECONDS,
        }
    }
}

/// Keeps an object's blob and its metadata record in step.
///
/// Holds shared handles to both stores and no other state; it is cheap to
/// share behind an `Arc` across any number of concurrent callers.
pub struct Coordinator {
    blobs: Arc<dyn BlobStore>,
    meta: Arc<dyn MetadataStore>,
    expire_seconds: u64,
}

impl Coordinator {
    /// Create a coordinator over already-connected stores.
    pub fn new(
        config: CoordinatorConfig,
        blobs: Arc<dyn BlobStore>,
        meta: Arc<dyn MetadataStore>,
    ) -> Self {
        info!(
            blob_backend = blobs.kind(),
            meta_backend = meta.kind(),
            expire_seconds = config.expire_seconds,
            "coordinator ready"
        );
        Self {
            blobs,
            meta,
            expire_seconds: config.expire_seconds,
        }
    }

    /// Expiry applied to new objects, in seconds.
    pub fn expire_seconds(&self) -> u64 {
        self.expire_seconds
    }

    /// Return a reference to the blob store.
    pub fn blob_store(&self) -> &Arc<dyn BlobStore> {
        &self.blobs
    }

    /// Return a reference to the metadata store.
    pub fn metadata_store(&self) -> &Arc<dyn MetadataStore> {
        &self.meta
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Whether the object is live.
    ///
    /// Only the metadata record counts: an orphaned blob reads as absent.
    pub async fn exists(&self, id: &ObjectId) -> Result<bool, EngineError> {
        Ok(self.meta.exists(id).await?)
    }

    /// Remaining lifetime in milliseconds.
    ///
    /// `None` means the record has no expiry (it was created by
    /// [`Coordinator::set_field`] alone). Fails with
    /// [`EngineError::NotFound`] when there is no record.
    pub async fn ttl(&self, id: &ObjectId) -> Result<Option<u64>, EngineError> {
        match self.meta.ttl(id).await? {
            KeyTtl::Missing => Err(EngineError::NotFound(id.clone())),
            KeyTtl::Persistent => Ok(None),
            KeyTtl::Seconds(secs) => Ok(Some(secs.saturating_mul(1000))),
        }
    }

    /// Size of the stored blob in bytes.
    ///
    /// Asks the blob store only, so it can report a size for an object
    /// whose metadata has already expired.
    pub async fn length(&self, id: &ObjectId) -> Result<u64, EngineError> {
        Ok(self.blobs.length(id).await?)
    }

    /// Open a byte stream over the blob.
    pub async fn get(&self, id: &ObjectId) -> Result<BlobStream, EngineError> {
        Ok(self.blobs.get_stream(id).await?)
    }

    /// All metadata fields, or an empty mapping when there is no record.
    ///
    /// Every value is the string the store holds; see
    /// [`Metadata::parse`] for typed access.
    pub async fn metadata(&self, id: &ObjectId) -> Result<Metadata, EngineError> {
        Ok(self.meta.hash_get_all(id).await?)
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Store an object: blob first, then metadata, then the expiry.
    ///
    /// A metadata record must never point at a blob that does not exist,
    /// so a failed blob write leaves nothing behind. A failure after the
    /// blob is written leaves the blob orphaned (or, if only the expiry
    /// failed, a record that never expires); neither is rolled back or
    /// retried.
    pub async fn set(
        &self,
        id: &ObjectId,
        data: BlobStream,
        metadata: Metadata,
    ) -> Result<(), EngineError> {
        self.blobs.set(id, data).await?;
        debug!(%id, "blob written");

        if let Err(e) = self.meta.hash_set(id, &metadata).await {
            warn!(%id, error = %e, "metadata write failed after blob write, blob is orphaned");
            return Err(e.into());
        }
        if let Err(e) = self.meta.expire(id, self.expire_seconds).await {
            warn!(%id, error = %e, "failed to set expiry on new metadata record");
            return Err(e.into());
        }

        info!(%id, fields = metadata.len(), expire_seconds = self.expire_seconds, "object stored");
        Ok(())
    }

    /// Set one metadata field. Leaves the blob and the expiry alone.
    pub async fn set_field(
        &self,
        id: &ObjectId,
        field: &str,
        value: &str,
    ) -> Result<(), EngineError> {
        self.meta.hash_set_field(id, field, value).await?;
        debug!(%id, field, "metadata field set");
        Ok(())
    }

    /// Delete an object on behalf of its owner.
    ///
    /// The stored `owner` field must equal `owner_token` exactly. On a
    /// mismatch, or when there is no record to check against, nothing is
    /// deleted and [`EngineError::Unauthorized`] is returned.
    pub async fn del(&self, id: &ObjectId, owner_token: &str) -> Result<(), EngineError> {
        let owner = self.meta.hash_get_field(id, OWNER_FIELD).await?;
        if owner.as_deref() != Some(owner_token) {
            warn!(%id, has_record = owner.is_some(), "delete rejected: owner token mismatch");
            return Err(EngineError::Unauthorized(id.clone()));
        }
        self.force_delete(id).await
    }

    /// Delete metadata then blob, without an ownership check.
    ///
    /// Both deletes are idempotent, so removing an absent id succeeds. If
    /// the blob delete fails after the metadata is gone, the blob is left
    /// orphaned.
    pub async fn force_delete(&self, id: &ObjectId) -> Result<(), EngineError> {
        self.meta.delete(id).await?;
        if let Err(e) = self.blobs.delete(id).await {
            warn!(%id, error = %e, "blob delete failed after metadata delete, blob is orphaned");
            return Err(e.into());
        }
        info!(%id, "object deleted");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Succeeds only if both stores answer their liveness probe.
    ///
    /// The metadata store is probed first; the first failure is reported
    /// with the backend it came from.
    pub async fn ping(&self) -> Result<(), EngineError> {
        self.meta
            .ping()
            .await
            .map_err(|e| EngineError::Unavailable {
                backend: Backend::Metadata,
                reason: e.to_string(),
            })?;
        self.blobs
            .ping()
            .await
            .map_err(|e| EngineError::Unavailable {
                backend: Backend::Blob,
                reason: e.to_string(),
            })?;
        Ok(())
    }

    /// Release the metadata store connection.
    ///
    /// The blob store is left alone: its backends hold no connection to
    /// close.
    pub async fn quit(&self) -> Result<(), EngineError> {
        self.meta.quit().await?;
        info!("metadata store connection released");
        Ok(())
    }
}
