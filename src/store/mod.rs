//! Store Module
//!
//! Checkpointed key-value state of one module.
//!
//! ## Responsibilities
//! - Apply block-by-block mutations (`set`, `delete`, `delete_prefix`)
//! - Record every mutation as an ordered delta
//! - Serialize state at a checkpoint boundary into a named snapshot
//! - Rebuild state from a previously persisted snapshot
//!
//! ## Variants
//! - `PartialStore`: only the mutations of the currently open segment, plus
//!   the prefixes deleted since the segment began
//! - `FullStore`: complete state since the module's initial block, produced
//!   by merging an ordered, gap-free sequence of partial segments
//!
//! Both share `BaseStore` primitives, the `codec::Marshaller` and the naming
//! scheme of `FileInfo`; the kind tag in the name tells them apart.
//!
//! A store is owned by the single worker processing its unit of work, so
//! nothing here locks.

mod base;
mod file;
mod full;
mod partial;
mod writer;

use std::fmt;
use std::sync::Arc;

use crate::blob::BlobStore;
use crate::codec::Marshaller;
use crate::error::{RangeKvError, Result};

pub use base::{BaseStore, Delta, DeltaOperation};
pub use file::{FileInfo, FileKind};
pub use full::FullStore;
pub use partial::PartialStore;
pub use writer::FileWriter;

/// Capability shared by partial and full stores
pub trait Store: fmt::Display + Send {
    fn base(&self) -> &BaseStore;

    fn base_mut(&mut self) -> &mut BaseStore;

    /// Kind tag written into this store's snapshot names
    fn kind(&self) -> FileKind;

    fn name(&self) -> &str {
        self.base().name()
    }

    fn get(&self, key: &str) -> Option<&[u8]> {
        self.base().get(key)
    }

    fn set(&mut self, ordinal: u64, key: &str, value: &[u8]) {
        self.base_mut().set(ordinal, key, value)
    }

    fn delete(&mut self, ordinal: u64, key: &str) {
        self.base_mut().delete(ordinal, key)
    }

    fn delete_prefix(&mut self, ordinal: u64, prefix: &str) {
        self.base_mut().delete_prefix(ordinal, prefix)
    }

    fn deltas(&self) -> &[Delta] {
        self.base().deltas()
    }

    /// Clear the delta log at a block boundary
    fn reset(&mut self) {
        self.base_mut().reset()
    }

    fn total_size_bytes(&self) -> u64 {
        self.base().total_size_bytes()
    }

    /// Replace in-memory state with a persisted snapshot
    fn load(&mut self, file: &FileInfo) -> Result<()>;

    /// Serialize current state for the boundary `end_boundary_block`.
    ///
    /// Performs no I/O and does not mutate the store; the returned
    /// `FileWriter` commits the bytes. A boundary the store cannot cover is
    /// `InvalidBoundary`.
    fn save(&self, end_boundary_block: u64) -> Result<(FileInfo, FileWriter)>;
}

/// Everything needed to create the stores of one module
#[derive(Clone)]
pub struct StoreConfig {
    name: String,
    module_initial_block: u64,
    blob_store: Arc<dyn BlobStore>,
    marshaller: Arc<dyn Marshaller>,
}

impl StoreConfig {
    /// Fails with `InvalidStoreName` for an empty name, which no snapshot
    /// name could carry
    pub fn new(
        name: impl Into<String>,
        module_initial_block: u64,
        blob_store: Arc<dyn BlobStore>,
        marshaller: Arc<dyn Marshaller>,
    ) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(RangeKvError::InvalidStoreName(name));
        }

        Ok(Self {
            name,
            module_initial_block,
            blob_store,
            marshaller,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn module_initial_block(&self) -> u64 {
        self.module_initial_block
    }

    pub fn blob_store(&self) -> &Arc<dyn BlobStore> {
        &self.blob_store
    }

    /// Empty partial store whose segment starts at `initial_block`
    pub fn new_partial_store(&self, initial_block: u64, trace_id: &str) -> PartialStore {
        PartialStore::new(self.new_base(trace_id), initial_block)
    }

    /// Empty full store
    pub fn new_full_store(&self) -> FullStore {
        FullStore::new(self.new_base(""))
    }

    fn new_base(&self, trace_id: &str) -> BaseStore {
        BaseStore::new(
            self.name.clone(),
            self.module_initial_block,
            trace_id.to_string(),
            Arc::clone(&self.blob_store),
            Arc::clone(&self.marshaller),
        )
    }
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("name", &self.name)
            .field("module_initial_block", &self.module_initial_block)
            .finish()
    }
}

/// Every snapshot persisted for `store_name`, ordered by block range then
/// kind. Names that do not parse are skipped.
pub fn list_snapshots(blob_store: &dyn BlobStore, store_name: &str) -> Result<Vec<FileInfo>> {
    let prefix = format!("{}/", store_name);
    let mut files = Vec::new();

    for name in blob_store.list(&prefix)? {
        match FileInfo::parse(&name) {
            Ok(info) if info.store_name == store_name => files.push(info),
            Ok(_) => {}
            Err(e) => tracing::debug!(file_name = %name, error = %e, "skipping unrecognized blob"),
        }
    }

    files.sort_by(|a, b| (a.range, a.kind).cmp(&(b.range, b.kind)));
    Ok(files)
}
