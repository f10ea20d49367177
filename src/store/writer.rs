//! Pending snapshot writes

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

use crate::blob::BlobStore;
use crate::error::Result;

/// A serialized snapshot that has not been written yet.
///
/// Produced by `Store::save`; the caller decides when and where `write` runs
/// and may call it again after a failure without re-serializing.
#[derive(Clone)]
pub struct FileWriter {
    store: Arc<dyn BlobStore>,
    filename: String,
    content: Bytes,
}

impl FileWriter {
    pub(crate) fn new(store: Arc<dyn BlobStore>, filename: String, content: Bytes) -> Self {
        Self {
            store,
            filename,
            content,
        }
    }

    /// Destination blob name
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Serialized snapshot
    pub fn content(&self) -> &Bytes {
        &self.content
    }

    /// Commit the content to the blob store
    pub fn write(&self) -> Result<()> {
        self.store.put(&self.filename, self.content.clone())?;
        tracing::info!(
            file_name = %self.filename,
            size = self.content.len(),
            "store snapshot written"
        );
        Ok(())
    }
}

impl fmt::Debug for FileWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileWriter")
            .field("filename", &self.filename)
            .field("content_len", &self.content.len())
            .finish()
    }
}
