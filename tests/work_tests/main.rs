//! Work Tests
//!
//! Tests verify:
//! - StoreWorker runs modules block by block and persists one partial each
//! - Progress events, cancellation and failure reporting
//! - CmdRunner delivery, including panicking commands
//! - Scheduling a block span through the pool end to end
//! - Block range splitting and configuration validation

use std::collections::HashMap;
use std::sync::Arc;

use rangekv::blob::{BlobStore, InMemoryBlobStore};
use rangekv::codec::{new_marshaller, MarshallerKind};
use rangekv::work::{Module, StoreWorker};
use rangekv::{RangeKvError, Result, Store};

mod store_worker_tests;

// =============================================================================
// Test Modules
// =============================================================================

/// Counts processed blocks under `count` and records each block number
pub struct CounterModule {
    pub initial_block: u64,
}

impl Module for CounterModule {
    fn initial_block(&self) -> u64 {
        self.initial_block
    }

    fn process_block(&self, block_num: u64, store: &mut dyn Store) -> Result<()> {
        let count = store
            .get("count")
            .map(|v| u64::from_le_bytes(v.try_into().unwrap_or([0; 8])))
            .unwrap_or(0);
        store.set(1, "count", &(count + 1).to_le_bytes());
        store.set(2, &format!("block:{:04}", block_num), b"seen");
        Ok(())
    }
}

/// Fails at one specific block
pub struct FailingModule {
    pub fail_at: u64,
}

impl Module for FailingModule {
    fn initial_block(&self) -> u64 {
        0
    }

    fn process_block(&self, block_num: u64, store: &mut dyn Store) -> Result<()> {
        if block_num == self.fail_at {
            return Err(RangeKvError::Module {
                module: "failing".to_string(),
                block: block_num,
                reason: "boom".to_string(),
            });
        }
        store.set(1, "last", &block_num.to_le_bytes());
        Ok(())
    }
}

/// Panics on its first block
pub struct PanickingModule;

impl Module for PanickingModule {
    fn initial_block(&self) -> u64 {
        0
    }

    fn process_block(&self, block_num: u64, _store: &mut dyn Store) -> Result<()> {
        panic!("module exploded at block {}", block_num);
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

pub fn setup_worker() -> (Arc<InMemoryBlobStore>, StoreWorker) {
    let blob = Arc::new(InMemoryBlobStore::new());

    let mut modules: HashMap<String, Arc<dyn Module>> = HashMap::new();
    modules.insert("counter".to_string(), Arc::new(CounterModule { initial_block: 0 }));
    modules.insert("late".to_string(), Arc::new(CounterModule { initial_block: 15 }));
    modules.insert("failing".to_string(), Arc::new(FailingModule { fail_at: 13 }));
    modules.insert("panicking".to_string(), Arc::new(PanickingModule));

    let worker = StoreWorker::new(
        tracing::Span::none(),
        Arc::clone(&blob) as Arc<dyn BlobStore>,
        new_marshaller(MarshallerKind::Binary),
        Arc::new(modules),
    );
    (blob, worker)
}

pub fn decode_count(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    u64::from_le_bytes(buf)
}
