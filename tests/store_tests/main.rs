//! Store Tests
//!
//! Tests verify:
//! - Base store mutation, delta log and size accounting
//! - Partial store segment lifecycle (save, load, roll, delete)
//! - Full store merge of consecutive partial segments
//! - Snapshot file naming and listing

use std::sync::Arc;

use rangekv::blob::{BlobStore, InMemoryBlobStore};
use rangekv::codec::{new_marshaller, MarshallerKind};
use rangekv::store::StoreConfig;

mod base_tests;

// =============================================================================
// Helper Functions
// =============================================================================

pub fn setup_store_config(name: &str) -> (Arc<InMemoryBlobStore>, StoreConfig) {
    setup_store_config_with(name, MarshallerKind::Binary)
}

pub fn setup_store_config_with(
    name: &str,
    kind: MarshallerKind,
) -> (Arc<InMemoryBlobStore>, StoreConfig) {
    let blob = Arc::new(InMemoryBlobStore::new());
    let config = StoreConfig::new(
        name,
        0,
        Arc::clone(&blob) as Arc<dyn BlobStore>,
        new_marshaller(kind),
    )
    .unwrap();
    (blob, config)
}
