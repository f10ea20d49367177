//! In-memory blob store

use std::collections::HashMap;
use std::fmt;

use bytes::Bytes;
use parking_lot::RwLock;

use crate::error::{RangeKvError, Result};

use super::BlobStore;

/// HashMap-based blob store. Payloads are `Bytes`, so reads are cheap clones.
#[derive(Default)]
pub struct InMemoryBlobStore {
    blobs: RwLock<HashMap<String, Bytes>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blobs currently stored
    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }
}

impl BlobStore for InMemoryBlobStore {
    fn get(&self, name: &str) -> Result<Bytes> {
        self.blobs
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| RangeKvError::BlobNotFound(name.to_string()))
    }

    fn put(&self, name: &str, content: Bytes) -> Result<()> {
        self.blobs.write().insert(name.to_string(), content);
        Ok(())
    }

    fn delete(&self, name: &str) -> Result<()> {
        match self.blobs.write().remove(name) {
            Some(_) => Ok(()),
            None => Err(RangeKvError::BlobNotFound(name.to_string())),
        }
    }

    fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.blobs.read().contains_key(name))
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let mut names: Vec<String> = self
            .blobs
            .read()
            .keys()
            .filter(|name| name.starts_with(prefix))
            .cloned()
            .collect();
        names.sort();
        Ok(names)
    }
}

impl fmt::Debug for InMemoryBlobStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryBlobStore")
            .field("blob_count", &self.len())
            .finish()
    }
}
