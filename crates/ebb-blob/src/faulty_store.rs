//! A [`BlobStore`] wrapper that injects latency and failures.
//!
//! `FaultyBlobStore` wraps any `Arc<dyn BlobStore>`. Latency is drawn from a
//! seeded RNG so runs are reproducible; failures are switched on and off at
//! runtime to open the partial-failure windows between the blob and
//! metadata stores.
//!
//! # Example
//!
//! ```ignore
//! let faulty = FaultyBlobStore::new(inner)
//!     .read_latency(1, 5)     // 1–5 ms per read
//!     .write_latency(5, 20)   // 5–20 ms per write
//!     .seed(42);
//! faulty.set_fail_writes(true);
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use ebb_types::ObjectId;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::error::BlobError;
use crate::stream::BlobStream;
use crate::traits::BlobStore;

/// A [`BlobStore`] wrapper for chaos and partial-failure tests.
pub struct FaultyBlobStore {
    inner: Arc<dyn BlobStore>,
    read_latency_ms: (u64, u64),
    write_latency_ms: (u64, u64),
    rng: Mutex<StdRng>,
    unavailable: AtomicBool,
    fail_writes: AtomicBool,
    fail_deletes: AtomicBool,
}

impl FaultyBlobStore {
    /// Wrap an existing store with no latency and no faults.
    pub fn new(inner: Arc<dyn BlobStore>) -> Self {
        Self {
            inner,
            read_latency_ms: (0, 0),
            write_latency_ms: (0, 0),
            rng: Mutex::new(StdRng::seed_from_u64(0)),
            unavailable: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            fail_deletes: AtomicBool::new(false),
        }
    }

    /// Set the read latency range in milliseconds (uniform random).
    pub fn read_latency(mut self, min_ms: u64, max_ms: u64) -> Self {
        self.read_latency_ms = (min_ms, max_ms);
        self
    }

    /// Set the write latency range in milliseconds (uniform random).
    pub fn write_latency(mut self, min_ms: u64, max_ms: u64) -> Self {
        self.write_latency_ms = (min_ms, max_ms);
        self
    }

    /// Set the RNG seed for deterministic latency.
    pub fn seed(self, seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            ..self
        }
    }

    /// Make every operation, including `ping`, fail as unreachable.
    pub fn set_unavailable(&self, on: bool) {
        self.unavailable.store(on, Ordering::SeqCst);
    }

    /// Make `set` fail without touching the inner store.
    pub fn set_fail_writes(&self, on: bool) {
        self.fail_writes.store(on, Ordering::SeqCst);
    }

    /// Make `delete` fail without touching the inner store.
    pub fn set_fail_deletes(&self, on: bool) {
        self.fail_deletes.store(on, Ordering::SeqCst);
    }

    fn check(&self, flag: &AtomicBool, what: &str) -> Result<(), BlobError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(BlobError::Unavailable("injected outage".into()));
        }
        if flag.load(Ordering::SeqCst) {
            return Err(BlobError::Io(std::io::Error::other(format!(
                "injected {what} failure"
            ))));
        }
        Ok(())
    }

    fn check_up(&self) -> Result<(), BlobError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(BlobError::Unavailable("injected outage".into()))
        } else {
            Ok(())
        }
    }

    /// Sleep for a random duration in `[min, max]` milliseconds.
    async fn delay(&self, range: (u64, u64)) {
        let (min, max) = range;

        if max == 0 {
            return;
        }

        let ms = if min == max {
            min
        } else {
            self.rng
                .lock()
                .expect("rng lock poisoned")
                .random_range(min..=max)
        };

        if ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(ms)).await;
        }
    }
}

#[async_trait::async_trait]
impl BlobStore for FaultyBlobStore {
    async fn length(&self, id: &ObjectId) -> Result<u64, BlobError> {
        self.delay(self.read_latency_ms).await;
        self.check_up()?;
        self.inner.length(id).await
    }

    async fn get_stream(&self, id: &ObjectId) -> Result<BlobStream, BlobError> {
        self.delay(self.read_latency_ms).await;
        self.check_up()?;
        self.inner.get_stream(id).await
    }

    async fn set(&self, id: &ObjectId, data: BlobStream) -> Result<(), BlobError> {
        self.delay(self.write_latency_ms).await;
        self.check(&self.fail_writes, "write")?;
        self.inner.set(id, data).await
    }

    async fn delete(&self, id: &ObjectId) -> Result<(), BlobError> {
        self.delay(self.write_latency_ms).await;
        self.check(&self.fail_deletes, "delete")?;
        self.inner.delete(id).await
    }

    async fn ping(&self) -> Result<(), BlobError> {
        self.check_up()?;
        self.inner.ping().await
    }

    fn kind(&self) -> &'static str {
        self.inner.kind()
    }
}
