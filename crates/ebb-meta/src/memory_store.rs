//! In-memory metadata backend.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use ebb_types::{Metadata, ObjectId};
use tokio::time::Instant;
use tracing::debug;

use crate::error::MetaError;
use crate::traits::{KeyTtl, MetadataStore};

struct Record {
    fields: Metadata,
    expires_at: Option<Instant>,
}

/// Metadata store held in process memory.
///
/// Expiry deadlines use [`tokio::time::Instant`], so tests can drive them
/// with a paused clock. Expired records are dropped on the next access.
#[derive(Default)]
pub struct MemoryMetaStore {
    records: Mutex<HashMap<ObjectId, Record>>,
    closed: AtomicBool,
}

impl MemoryMetaStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_open(&self) -> Result<(), MetaError> {
        if self.closed.load(Ordering::Acquire) {
            Err(MetaError::Closed)
        } else {
            Ok(())
        }
    }

    /// Run `f` against the live record for `id`, reaping it first if its
    /// deadline has passed.
    fn with_record<T>(
        &self,
        id: &ObjectId,
        f: impl FnOnce(&mut HashMap<ObjectId, Record>) -> T,
    ) -> Result<T, MetaError> {
        self.check_open()?;
        let mut map = self.records.lock().expect("lock poisoned");
        let expired = map
            .get(id)
            .and_then(|r| r.expires_at)
            .is_some_and(|deadline| deadline <= Instant::now());
        if expired {
            map.remove(id);
            debug!(%id, "metadata record expired");
        }
        Ok(f(&mut map))
    }

    fn upsert<'a>(map: &'a mut HashMap<ObjectId, Record>, id: &ObjectId) -> &'a mut Record {
        map.entry(id.clone()).or_insert_with(|| Record {
            fields: Metadata::new(),
            expires_at: None,
        })
    }
}

/// Round a remaining duration to whole seconds the way Redis `TTL` does.
fn round_secs(remaining: Duration) -> u64 {
    (remaining.as_millis() as u64 + 500) / 1000
}

#[async_trait::async_trait]
impl MetadataStore for MemoryMetaStore {
    async fn exists(&self, id: &ObjectId) -> Result<bool, MetaError> {
        self.with_record(id, |map| map.contains_key(id))
    }

    async fn ttl(&self, id: &ObjectId) -> Result<KeyTtl, MetaError> {
        self.with_record(id, |map| match map.get(id) {
            None => KeyTtl::Missing,
            Some(Record {
                expires_at: None, ..
            }) => KeyTtl::Persistent,
            Some(Record {
                expires_at: Some(deadline),
                ..
            }) => KeyTtl::Seconds(round_secs(
                deadline.saturating_duration_since(Instant::now()),
            )),
        })
    }

    async fn hash_set(&self, id: &ObjectId, fields: &Metadata) -> Result<(), MetaError> {
        if fields.is_empty() {
            return Ok(());
        }
        self.with_record(id, |map| {
            let record = Self::upsert(map, id);
            for (field, value) in fields.iter() {
                record.fields.insert(field, value);
            }
        })?;
        debug!(%id, fields = fields.len(), "stored metadata fields");
        Ok(())
    }

    async fn hash_set_field(
        &self,
        id: &ObjectId,
        field: &str,
        value: &str,
    ) -> Result<(), MetaError> {
        self.with_record(id, |map| {
            Self::upsert(map, id).fields.insert(field, value);
        })
    }

    async fn hash_get_field(
        &self,
        id: &ObjectId,
        field: &str,
    ) -> Result<Option<String>, MetaError> {
        self.with_record(id, |map| {
            map.get(id)
                .and_then(|r| r.fields.get(field))
                .map(str::to_string)
        })
    }

    async fn hash_get_all(&self, id: &ObjectId) -> Result<Metadata, MetaError> {
        self.with_record(id, |map| {
            map.get(id).map(|r| r.fields.clone()).unwrap_or_default()
        })
    }

    async fn expire(&self, id: &ObjectId, seconds: u64) -> Result<(), MetaError> {
        self.with_record(id, |map| {
            if seconds == 0 {
                map.remove(id);
            } else if let Some(record) = map.get_mut(id) {
                // A deadline past the clock's range never arrives.
                record.expires_at = Instant::now().checked_add(Duration::from_secs(seconds));
            }
        })
    }

    async fn delete(&self, id: &ObjectId) -> Result<(), MetaError> {
        let removed = self.with_record(id, |map| map.remove(id).is_some())?;
        if removed {
            debug!(%id, "deleted metadata record");
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), MetaError> {
        self.check_open()
    }

    async fn quit(&self) -> Result<(), MetaError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "memory"
    }
}
