//! Core trait for metadata storage.

use ebb_types::{Metadata, ObjectId};

use crate::error::MetaError;

/// Remaining lifetime of a record, at the store's native one-second
/// resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTtl {
    /// No record under this id.
    Missing,
    /// The record exists but never expires.
    Persistent,
    /// The record expires in this many seconds.
    Seconds(u64),
}

impl KeyTtl {
    /// Decode a Redis `TTL` reply: `-2` missing, `-1` no expiry.
    pub fn from_redis(raw: i64) -> Self {
        match raw {
            -1 => KeyTtl::Persistent,
            n if n >= 0 => KeyTtl::Seconds(n as u64),
            _ => KeyTtl::Missing,
        }
    }
}

/// A store of string-field hashes with per-key expiry.
///
/// Field-level writes are atomic at the store level; nothing above this
/// trait coordinates concurrent writers to the same id. Values come back
/// exactly as stored, as strings.
#[async_trait::async_trait]
pub trait MetadataStore: Send + Sync {
    /// Whether a record exists for `id`.
    async fn exists(&self, id: &ObjectId) -> Result<bool, MetaError>;

    /// Remaining lifetime of the record.
    async fn ttl(&self, id: &ObjectId) -> Result<KeyTtl, MetaError>;

    /// Set many fields at once, creating the record if absent.
    async fn hash_set(&self, id: &ObjectId, fields: &Metadata) -> Result<(), MetaError>;

    /// Set one field, creating the record if absent.
    async fn hash_set_field(&self, id: &ObjectId, field: &str, value: &str)
    -> Result<(), MetaError>;

    /// Read one field.
    async fn hash_get_field(&self, id: &ObjectId, field: &str)
    -> Result<Option<String>, MetaError>;

    /// Read every field. A missing record reads as an empty mapping.
    async fn hash_get_all(&self, id: &ObjectId) -> Result<Metadata, MetaError>;

    /// Expire the record `seconds` from now, replacing any earlier expiry.
    /// Has no effect on a missing record; `0` removes the record.
    async fn expire(&self, id: &ObjectId, seconds: u64) -> Result<(), MetaError>;

    /// Remove the record. Removing a missing record succeeds.
    async fn delete(&self, id: &ObjectId) -> Result<(), MetaError>;

    /// Liveness probe.
    async fn ping(&self) -> Result<(), MetaError>;

    /// Release the connection. Later calls fail with [`MetaError::Closed`].
    async fn quit(&self) -> Result<(), MetaError>;

    /// Short backend name for logs (`"redis"`, `"memory"`).
    fn kind(&self) -> &'static str;
}
