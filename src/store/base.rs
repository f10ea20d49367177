//! Base store
//!
//! Segment-scoped key-value mutation, delta log and size accounting shared by
//! every store variant.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Bound;
use std::sync::Arc;

use crate::blob::BlobStore;
use crate::codec::{Marshaller, StoreData};
use crate::error::{RangeKvError, Result};

use super::FileInfo;

/// Kind of mutation a delta records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaOperation {
    Create,
    Update,
    Delete,
}

/// One recorded mutation, kept for deterministic replay and merge.
///
/// `old_value` is empty for creates, `new_value` is empty for deletes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delta {
    pub operation: DeltaOperation,
    pub ordinal: u64,
    pub key: String,
    pub old_value: Vec<u8>,
    pub new_value: Vec<u8>,
}

/// In-memory mapping of the active segment plus its mutation log
pub struct BaseStore {
    name: String,
    module_initial_block: u64,
    trace_id: String,

    pub(super) kv: BTreeMap<String, Vec<u8>>,
    deltas: Vec<Delta>,
    pub(super) total_size_bytes: u64,

    pub(super) blob_store: Arc<dyn BlobStore>,
    pub(super) marshaller: Arc<dyn Marshaller>,
}

impl BaseStore {
    pub(super) fn new(
        name: String,
        module_initial_block: u64,
        trace_id: String,
        blob_store: Arc<dyn BlobStore>,
        marshaller: Arc<dyn Marshaller>,
    ) -> Self {
        Self {
            name,
            module_initial_block,
            trace_id,
            kv: BTreeMap::new(),
            deltas: Vec::new(),
            total_size_bytes: 0,
            blob_store,
            marshaller,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Block at which the owning module became active
    pub fn module_initial_block(&self) -> u64 {
        self.module_initial_block
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    /// Current mapping, in key order
    pub fn kv(&self) -> &BTreeMap<String, Vec<u8>> {
        &self.kv
    }

    /// Mutations recorded since the last `reset`
    pub fn deltas(&self) -> &[Delta] {
        &self.deltas
    }

    /// Sum of the lengths of every stored value
    pub fn total_size_bytes(&self) -> u64 {
        self.total_size_bytes
    }

    pub fn len(&self) -> usize {
        self.kv.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kv.is_empty()
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.kv.get(key).map(Vec::as_slice)
    }

    /// Upsert `key`
    ///
    /// Panics if `ordinal` is lower than the last recorded delta's.
    pub fn set(&mut self, ordinal: u64, key: &str, value: &[u8]) {
        self.check_ordinal(ordinal);

        let new_len = value.len() as u64;
        match self.kv.insert(key.to_string(), value.to_vec()) {
            Some(old_value) => {
                self.total_size_bytes = self.total_size_bytes - old_value.len() as u64 + new_len;
                self.deltas.push(Delta {
                    operation: DeltaOperation::Update,
                    ordinal,
                    key: key.to_string(),
                    old_value,
                    new_value: value.to_vec(),
                });
            }
            None => {
                self.total_size_bytes += new_len;
                self.deltas.push(Delta {
                    operation: DeltaOperation::Create,
                    ordinal,
                    key: key.to_string(),
                    old_value: Vec::new(),
                    new_value: value.to_vec(),
                });
            }
        }
    }

    /// Remove a single key; no-op (and no delta) if it is absent
    pub fn delete(&mut self, ordinal: u64, key: &str) {
        self.check_ordinal(ordinal);

        if let Some(old_value) = self.kv.remove(key) {
            self.record_delete(ordinal, key.to_string(), old_value);
        }
    }

    /// Remove every key starting with `prefix`, one delta per removed key in
    /// key order
    pub fn delete_prefix(&mut self, ordinal: u64, prefix: &str) {
        self.check_ordinal(ordinal);

        let doomed: Vec<String> = self
            .kv
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect();

        for key in doomed {
            if let Some(old_value) = self.kv.remove(&key) {
                self.record_delete(ordinal, key, old_value);
            }
        }
    }

    /// Clear the delta log; ordinals restart from zero afterwards
    pub fn reset(&mut self) {
        self.deltas.clear();
    }

    // =========================================================================
    // Snapshot helpers
    // =========================================================================

    /// Replace the mapping wholesale; `size` is trusted as reported by the
    /// decoder
    pub(super) fn replace_kv(&mut self, kv: BTreeMap<String, Vec<u8>>, size: u64) {
        self.kv = kv;
        self.total_size_bytes = size;
    }

    /// Read and decode a snapshot, attaching store and file context to any
    /// failure
    pub(super) fn read_snapshot(&self, file: &FileInfo) -> Result<(StoreData, u64)> {
        let wrap = |source: RangeKvError| RangeKvError::Load {
            store: self.name.clone(),
            filename: file.filename.clone(),
            source: Box::new(source),
        };

        let data = self.blob_store.get(&file.filename).map_err(wrap)?;
        self.marshaller.unmarshal(&data).map_err(wrap)
    }

    fn record_delete(&mut self, ordinal: u64, key: String, old_value: Vec<u8>) {
        self.total_size_bytes -= old_value.len() as u64;
        self.deltas.push(Delta {
            operation: DeltaOperation::Delete,
            ordinal,
            key,
            old_value,
            new_value: Vec::new(),
        });
    }

    fn check_ordinal(&self, ordinal: u64) {
        if let Some(last) = self.deltas.last() {
            assert!(
                ordinal >= last.ordinal,
                "store {}: ordinal {} is lower than last recorded ordinal {}",
                self.name,
                ordinal,
                last.ordinal
            );
        }
    }
}

impl fmt::Debug for BaseStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BaseStore")
            .field("name", &self.name)
            .field("module_initial_block", &self.module_initial_block)
            .field("key_count", &self.kv.len())
            .field("deltas_count", &self.deltas.len())
            .field("total_size_bytes", &self.total_size_bytes)
            .finish()
    }
}
