//! Metadata store trait and backends.
//!
//! A metadata record is a hash of string fields keyed by [`ObjectId`],
//! with an optional per-record expiry after which the store itself drops
//! the record:
//!
//! - [`RedisMetaStore`]: one Redis hash per id, expiry via `EXPIRE`.
//! - [`MemoryMetaStore`]: in-process map with lazily reaped deadlines.
//!
//! [`ObjectId`]: ebb_types::ObjectId

mod error;
mod faulty_store;
mod memory_store;
mod redis_store;
mod traits;

pub use error::MetaError;
pub use faulty_store::FaultyMetaStore;
pub use memory_store::MemoryMetaStore;
pub use redis_store::RedisMetaStore;
pub use traits::{KeyTtl, MetadataStore};
