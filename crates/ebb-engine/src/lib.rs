//! Object lifecycle coordination for Ebb.
//!
//! The [`Coordinator`] pairs a [`BlobStore`](ebb_blob::BlobStore) holding
//! object bytes with a [`MetadataStore`](ebb_meta::MetadataStore) holding a
//! time-limited metadata record for the same id, and defines the ordering
//! between the two for every object operation.

pub mod coordinator;
pub mod error;

pub use coordinator::{Coordinator, CoordinatorConfig, DEFAULT_EXPIRE_SECONDS};
pub use error::{Backend, EngineError};

#[cfg(test)]
mod tests;
