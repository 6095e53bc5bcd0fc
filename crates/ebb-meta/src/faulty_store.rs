//! A [`MetadataStore`] wrapper that injects failures on demand.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use ebb_types::{Metadata, ObjectId};

use crate::error::MetaError;
use crate::traits::{KeyTtl, MetadataStore};

/// Wraps any metadata store and fails selected operation classes while a
/// switch is on. Used to reproduce the windows where one store accepted a
/// write and the other did not.
pub struct FaultyMetaStore {
    inner: Arc<dyn MetadataStore>,
    unavailable: AtomicBool,
    fail_writes: AtomicBool,
    fail_expire: AtomicBool,
    fail_deletes: AtomicBool,
}

impl FaultyMetaStore {
    pub fn new(inner: Arc<dyn MetadataStore>) -> Self {
        Self {
            inner,
            unavailable: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            fail_expire: AtomicBool::new(false),
            fail_deletes: AtomicBool::new(false),
        }
    }

    /// Fail every call, including `ping`.
    pub fn set_unavailable(&self, on: bool) {
        self.unavailable.store(on, Ordering::SeqCst);
    }

    /// Fail `hash_set` and `hash_set_field`.
    pub fn set_fail_writes(&self, on: bool) {
        self.fail_writes.store(on, Ordering::SeqCst);
    }

    /// Fail `expire`.
    pub fn set_fail_expire(&self, on: bool) {
        self.fail_expire.store(on, Ordering::SeqCst);
    }

    /// Fail `delete`.
    pub fn set_fail_deletes(&self, on: bool) {
        self.fail_deletes.store(on, Ordering::SeqCst);
    }

    fn check(&self, flag: Option<&AtomicBool>) -> Result<(), MetaError> {
        if self.unavailable.load(Ordering::SeqCst)
            || flag.is_some_and(|f| f.load(Ordering::SeqCst))
        {
            Err(MetaError::Unavailable("injected failure".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait::async_trait]
impl MetadataStore for FaultyMetaStore {
    async fn exists(&self, id: &ObjectId) -> Result<bool, MetaError> {
        self.check(None)?;
        self.inner.exists(id).await
    }

    async fn ttl(&self, id: &ObjectId) -> Result<KeyTtl, MetaError> {
        self.check(None)?;
        self.inner.ttl(id).await
    }

    async fn hash_set(&self, id: &ObjectId, fields: &Metadata) -> Result<(), MetaError> {
        self.check(Some(&self.fail_writes))?;
        self.inner.hash_set(id, fields).await
    }

    async fn hash_set_field(
        &self,
        id: &ObjectId,
        field: &str,
        value: &str,
    ) -> Result<(), MetaError> {
        self.check(Some(&self.fail_writes))?;
        self.inner.hash_set_field(id, field, value).await
    }

    async fn hash_get_field(
        &self,
        id: &ObjectId,
        field: &str,
    ) -> Result<Option<String>, MetaError> {
        self.check(None)?;
        self.inner.hash_get_field(id, field).await
    }

    async fn hash_get_all(&self, id: &ObjectId) -> Result<Metadata, MetaError> {
        self.check(None)?;
        self.inner.hash_get_all(id).await
    }

    async fn expire(&self, id: &ObjectId, seconds: u64) -> Result<(), MetaError> {
        self.check(Some(&self.fail_expire))?;
        self.inner.expire(id, seconds).await
    }

    async fn delete(&self, id: &ObjectId) -> Result<(), MetaError> {
        self.check(Some(&self.fail_deletes))?;
        self.inner.delete(id).await
    }

    async fn ping(&self) -> Result<(), MetaError> {
        self.check(None)?;
        self.inner.ping().await
    }

    async fn quit(&self) -> Result<(), MetaError> {
        self.inner.quit().await
    }

    fn kind(&self) -> &'static str {
        self.inner.kind()
    }
}
