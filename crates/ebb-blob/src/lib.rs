//! Blob storage trait and backend implementations.
//!
//! This crate defines the [`BlobStore`] trait for persisting object payloads
//! as byte streams, along with three concrete backends:
//!
//! - [`FileBlobStore`]: one file per object under a local directory.
//! - [`S3BlobStore`]: objects in an S3-compatible bucket.
//! - [`MemoryBlobStore`]: in-memory storage backed by a `RwLock<HashMap>`.
//!
//! [`FaultyBlobStore`] wraps any backend to inject latency and outages in
//! tests.

mod error;
mod faulty_store;
mod file_store;
mod memory_store;
mod s3_store;
mod stream;
mod traits;

pub use error::BlobError;
pub use faulty_store::FaultyBlobStore;
pub use file_store::FileBlobStore;
pub use memory_store::MemoryBlobStore;
pub use s3_store::{S3BlobStore, S3Config};
pub use stream::{BlobStream, collect_stream, stream_from_bytes, stream_from_reader};
pub use traits::BlobStore;
