//! Partial store
//!
//! Holds the mutations of one checkpoint segment. Reconstructing complete
//! state requires merging the ordered sequence of segments into a
//! `FullStore`.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use bytes::Bytes;

use crate::codec::StoreDataRef;
use crate::error::{RangeKvError, Result};

use super::{BaseStore, FileInfo, FileKind, FileWriter, Store};

pub struct PartialStore {
    base: BaseStore,

    /// Block at which the currently open segment began
    initial_block: u64,

    /// Prefixes deleted since the store was created, first deletion first
    deleted_prefixes: Vec<String>,
    seen: HashSet<String>,

    /// Name of the last snapshot successfully loaded
    loaded_from: Option<String>,
}

impl PartialStore {
    pub(super) fn new(base: BaseStore, initial_block: u64) -> Self {
        Self {
            base,
            initial_block,
            deleted_prefixes: Vec::new(),
            seen: HashSet::new(),
            loaded_from: None,
        }
    }

    /// Start block of the open segment
    pub fn initial_block(&self) -> u64 {
        self.initial_block
    }

    pub fn deleted_prefixes(&self) -> &[String] {
        &self.deleted_prefixes
    }

    pub fn loaded_from(&self) -> Option<&str> {
        self.loaded_from.as_deref()
    }

    pub fn kv(&self) -> &BTreeMap<String, Vec<u8>> {
        self.base.kv()
    }

    /// Open a new segment at `last_block` with an empty mapping.
    ///
    /// The deleted-prefix log is carried over into the new segment, so a
    /// later [`FullStore::merge_partial`](super::FullStore::merge_partial)
    /// applies those prefixes again.
    pub fn roll(&mut self, last_block: u64) {
        self.initial_block = last_block;
        self.base.replace_kv(BTreeMap::new(), 0);
    }

    /// Remove a persisted snapshot. Failures are logged and returned; the
    /// caller decides whether they matter.
    pub fn delete_store(&self, file: &FileInfo) -> Result<()> {
        tracing::debug!(file_name = %file.filename, "deleting partial store file");

        let result = self.base.blob_store.delete(&file.filename);
        if let Err(e) = &result {
            tracing::warn!(file_name = %file.filename, error = %e, "deleting file");
        }
        result
    }

    fn record_prefix(&mut self, prefix: &str) {
        if self.seen.insert(prefix.to_string()) {
            self.deleted_prefixes.push(prefix.to_string());
        }
    }
}

impl Store for PartialStore {
    fn base(&self) -> &BaseStore {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseStore {
        &mut self.base
    }

    fn kind(&self) -> FileKind {
        FileKind::Partial
    }

    /// Deletes matching keys, then remembers `prefix` even when nothing
    /// matched so the merge can apply it to older state.
    fn delete_prefix(&mut self, ordinal: u64, prefix: &str) {
        self.base.delete_prefix(ordinal, prefix);
        self.record_prefix(prefix);
    }

    fn load(&mut self, file: &FileInfo) -> Result<()> {
        tracing::debug!(file_name = %file.filename, "loading partial store state from file");

        let (data, size) = self.base.read_snapshot(file)?;

        self.base.replace_kv(data.kv, size);
        self.deleted_prefixes.clear();
        self.seen.clear();
        for prefix in &data.delete_prefixes {
            self.record_prefix(prefix);
        }
        self.loaded_from = Some(file.filename.clone());

        tracing::debug!(
            file_name = %file.filename,
            key_count = self.base.len(),
            data_size = size,
            "partial store loaded"
        );
        Ok(())
    }

    fn save(&self, end_boundary_block: u64) -> Result<(FileInfo, FileWriter)> {
        tracing::debug!(store = %self, "writing partial store state");

        if end_boundary_block < self.initial_block {
            return Err(RangeKvError::InvalidBoundary {
                store: self.base.name().to_string(),
                boundary: end_boundary_block,
                reason: format!("segment starts at block {}", self.initial_block),
            });
        }

        let content = self.base.marshaller.marshal(StoreDataRef {
            kv: self.base.kv(),
            delete_prefixes: &self.deleted_prefixes,
        })?;

        let file = FileInfo::new_partial(
            self.base.name(),
            self.initial_block,
            end_boundary_block,
            self.base.trace_id(),
        );
        tracing::debug!(
            file_name = %file.filename,
            block_range = %file.range,
            "partial store snapshot prepared"
        );

        let writer = FileWriter::new(
            self.base.blob_store.clone(),
            file.filename.clone(),
            Bytes::from(content),
        );
        Ok((file, writer))
    }
}

impl fmt::Display for PartialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "partial store {} (module_initial_block={}, initial_block={}, keys={}, deltas={}, loaded_from={})",
            self.base.name(),
            self.base.module_initial_block(),
            self.initial_block,
            self.base.len(),
            self.base.deltas().len(),
            self.loaded_from.as_deref().unwrap_or("-")
        )
    }
}

impl fmt::Debug for PartialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartialStore")
            .field("base", &self.base)
            .field("initial_block", &self.initial_block)
            .field("deleted_prefixes", &self.deleted_prefixes)
            .field("loaded_from", &self.loaded_from)
            .finish()
    }
}
