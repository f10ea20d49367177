//! Full store
//!
//! Complete state of a module from its initial block up to the last merged
//! boundary. Built by folding partial segments in block order.

use std::fmt;

use bytes::Bytes;

use crate::codec::{self, StoreDataRef};
use crate::error::{RangeKvError, Result};

use super::{BaseStore, FileInfo, FileKind, FileWriter, PartialStore, Store};

pub struct FullStore {
    base: BaseStore,

    /// Boundary up to which state has been merged or loaded
    end_block: u64,

    loaded_from: Option<String>,
}

impl FullStore {
    pub(super) fn new(base: BaseStore) -> Self {
        let end_block = base.module_initial_block();
        Self {
            base,
            end_block,
            loaded_from: None,
        }
    }

    /// Exclusive end of the covered range `[module_initial_block, end_block)`
    pub fn end_block(&self) -> u64 {
        self.end_block
    }

    pub fn loaded_from(&self) -> Option<&str> {
        self.loaded_from.as_deref()
    }

    /// Fold the next partial segment, `[partial.initial_block(),
    /// end_boundary_block)`, into this state: first drop every key under the
    /// segment's deleted prefixes, then overlay its mapping.
    ///
    /// The segment must start exactly at `end_block`. The merge itself is not
    /// a block mutation, so no deltas are recorded.
    ///
    /// A segment opened with [`PartialStore::roll`] still carries the prefixes
    /// deleted in earlier segments, and they are applied again here. A key
    /// under such a prefix that an earlier segment set after the deletion is
    /// dropped by this merge unless the current segment sets it again.
    pub fn merge_partial(&mut self, partial: &PartialStore, end_boundary_block: u64) -> Result<()> {
        if partial.base().name() != self.base.name() {
            return Err(RangeKvError::Merge(format!(
                "partial store {} cannot merge into full store {}",
                partial.base().name(),
                self.base.name()
            )));
        }
        if partial.initial_block() != self.end_block {
            return Err(RangeKvError::Merge(format!(
                "store {}: partial segment starts at block {}, full state ends at block {}",
                self.base.name(),
                partial.initial_block(),
                self.end_block
            )));
        }
        if end_boundary_block < partial.initial_block() {
            return Err(RangeKvError::Merge(format!(
                "store {}: segment end {} is before its start {}",
                self.base.name(),
                end_boundary_block,
                partial.initial_block()
            )));
        }

        let mut kv = std::mem::take(&mut self.base.kv);
        for prefix in partial.deleted_prefixes() {
            kv.retain(|key, _| !key.starts_with(prefix.as_str()));
        }
        for (key, value) in partial.kv() {
            kv.insert(key.clone(), value.clone());
        }

        let size = codec::value_size(&kv);
        self.base.replace_kv(kv, size);
        self.end_block = end_boundary_block;

        tracing::debug!(
            store = %self.base.name(),
            partial_initial_block = partial.initial_block(),
            end_block = end_boundary_block,
            key_count = self.base.len(),
            "merged partial store"
        );
        Ok(())
    }
}

impl Store for FullStore {
    fn base(&self) -> &BaseStore {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseStore {
        &mut self.base
    }

    fn kind(&self) -> FileKind {
        FileKind::Full
    }

    fn load(&mut self, file: &FileInfo) -> Result<()> {
        tracing::debug!(file_name = %file.filename, "loading full store state from file");

        let (data, size) = self.base.read_snapshot(file)?;
        self.base.replace_kv(data.kv, size);
        self.end_block = file.range.exclusive_end_block;
        self.loaded_from = Some(file.filename.clone());

        tracing::debug!(
            file_name = %file.filename,
            key_count = self.base.len(),
            data_size = size,
            "full store loaded"
        );
        Ok(())
    }

    /// Snapshot covering `[module_initial_block, end_boundary_block)`.
    ///
    /// `end_boundary_block` must equal `end_block`: a full snapshot never
    /// claims blocks that were not merged or loaded.
    fn save(&self, end_boundary_block: u64) -> Result<(FileInfo, FileWriter)> {
        if end_boundary_block != self.end_block {
            return Err(RangeKvError::InvalidBoundary {
                store: self.base.name().to_string(),
                boundary: end_boundary_block,
                reason: format!("full state ends at block {}", self.end_block),
            });
        }
        if end_boundary_block < self.base.module_initial_block() {
            return Err(RangeKvError::InvalidBoundary {
                store: self.base.name().to_string(),
                boundary: end_boundary_block,
                reason: format!(
                    "module starts at block {}",
                    self.base.module_initial_block()
                ),
            });
        }

        let content = self.base.marshaller.marshal(StoreDataRef {
            kv: self.base.kv(),
            delete_prefixes: &[],
        })?;

        let file = FileInfo::new_full(
            self.base.name(),
            self.base.module_initial_block(),
            end_boundary_block,
        );
        tracing::debug!(
            file_name = %file.filename,
            block_range = %file.range,
            "full store snapshot prepared"
        );

        let writer = FileWriter::new(
            self.base.blob_store.clone(),
            file.filename.clone(),
            Bytes::from(content),
        );
        Ok((file, writer))
    }
}

impl fmt::Display for FullStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "full store {} (module_initial_block={}, end_block={}, keys={}, size={})",
            self.base.name(),
            self.base.module_initial_block(),
            self.end_block,
            self.base.len(),
            self.base.total_size_bytes()
        )
    }
}

impl fmt::Debug for FullStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FullStore")
            .field("base", &self.base)
            .field("end_block", &self.end_block)
            .field("loaded_from", &self.loaded_from)
            .finish()
    }
}
