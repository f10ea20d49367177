//! Blob Store Module
//!
//! Opaque durable storage keyed by name. Stores never interpret the bytes
//! they hold; snapshot names are produced by `store::FileInfo`.
//!
//! ## Backends
//! - `InMemoryBlobStore`: HashMap behind a RwLock, for tests and embedding
//! - `LocalBlobStore`: one file per blob under a root directory

mod local;
mod memory;

use std::fmt;

use bytes::Bytes;

use crate::error::Result;

pub use local::LocalBlobStore;
pub use memory::InMemoryBlobStore;

/// Name → bytes storage
///
/// Implementations must be safe to share between workers.
pub trait BlobStore: Send + Sync + fmt::Debug {
    /// Read a blob. Returns `RangeKvError::BlobNotFound` if it does not exist.
    fn get(&self, name: &str) -> Result<Bytes>;

    /// Create or replace a blob
    fn put(&self, name: &str, content: Bytes) -> Result<()>;

    /// Remove a blob. Returns `RangeKvError::BlobNotFound` if it does not exist.
    fn delete(&self, name: &str) -> Result<()>;

    /// Check whether a blob exists
    fn exists(&self, name: &str) -> Result<bool>;

    /// Names starting with `prefix`, sorted
    fn list(&self, prefix: &str) -> Result<Vec<String>>;
}
