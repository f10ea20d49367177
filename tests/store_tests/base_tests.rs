//! Base store primitives, exercised through a partial store

use std::panic::{catch_unwind, AssertUnwindSafe};

use rangekv::store::{DeltaOperation, Store};

use super::setup_store_config;

// =============================================================================
// Set / Get
// =============================================================================

#[test]
fn test_set_and_get() {
    let (_blob, config) = setup_store_config("balances");
    let mut store = config.new_partial_store(0, "trace");

    store.set(1, "alice", b"100");

    assert_eq!(store.get("alice"), Some(&b"100"[..]));
    assert_eq!(store.get("bob"), None);
}

#[test]
fn test_set_records_create_then_update_deltas() {
    let (_blob, config) = setup_store_config("balances");
    let mut store = config.new_partial_store(0, "trace");

    store.set(1, "alice", b"100");
    store.set(2, "alice", b"250");

    let deltas = store.deltas();
    assert_eq!(deltas.len(), 2);

    assert_eq!(deltas[0].operation, DeltaOperation::Create);
    assert_eq!(deltas[0].ordinal, 1);
    assert!(deltas[0].old_value.is_empty());
    assert_eq!(deltas[0].new_value, b"100");

    assert_eq!(deltas[1].operation, DeltaOperation::Update);
    assert_eq!(deltas[1].old_value, b"100");
    assert_eq!(deltas[1].new_value, b"250");
}

// =============================================================================
// Size Tracking Tests
// =============================================================================

#[test]
fn test_size_tracks_value_bytes() {
    let (_blob, config) = setup_store_config("balances");
    let mut store = config.new_partial_store(0, "trace");

    store.set(1, "a", b"12345");
    store.set(2, "b", b"123");
    assert_eq!(store.total_size_bytes(), 8);

    // Overwrite adjusts by the signed difference
    store.set(3, "a", b"1");
    assert_eq!(store.total_size_bytes(), 4);

    store.set(4, "a", b"1234567890");
    assert_eq!(store.total_size_bytes(), 13);
}

#[test]
fn test_single_key_delete() {
    let (_blob, config) = setup_store_config("balances");
    let mut store = config.new_partial_store(0, "trace");

    store.set(1, "alice", b"100");
    store.set(1, "bob", b"7");
    store.delete(2, "alice");

    assert_eq!(store.get("alice"), None);
    assert_eq!(store.total_size_bytes(), 1);

    let last = store.deltas().last().unwrap();
    assert_eq!(last.operation, DeltaOperation::Delete);
    assert_eq!(last.key, "alice");
    assert_eq!(last.old_value, b"100");
}

#[test]
fn test_delete_missing_key_records_nothing() {
    let (_blob, config) = setup_store_config("balances");
    let mut store = config.new_partial_store(0, "trace");

    store.delete(1, "ghost");

    assert!(store.deltas().is_empty());
    assert_eq!(store.total_size_bytes(), 0);
}

// =============================================================================
// Prefix Delete Tests
// =============================================================================

#[test]
fn test_delete_prefix_removes_matching_keys_only() {
    let (_blob, config) = setup_store_config("pairs");
    let mut store = config.new_partial_store(0, "trace");

    store.set(1, "pair:a", b"1");
    store.set(1, "pair:b", b"22");
    store.set(1, "pairing", b"333");
    store.set(1, "token:x", b"4444");

    store.delete_prefix(2, "pair:");

    assert_eq!(store.get("pair:a"), None);
    assert_eq!(store.get("pair:b"), None);
    assert_eq!(store.get("pairing"), Some(&b"333"[..]));
    assert_eq!(store.get("token:x"), Some(&b"4444"[..]));
    assert_eq!(store.total_size_bytes(), 7);
}

#[test]
fn test_delete_prefix_records_one_delta_per_key_in_key_order() {
    let (_blob, config) = setup_store_config("pairs");
    let mut store = config.new_partial_store(0, "trace");

    store.set(1, "p:b", b"2");
    store.set(1, "p:a", b"1");
    store.reset();

    store.delete_prefix(5, "p:");

    let deltas = store.deltas();
    assert_eq!(deltas.len(), 2);
    assert!(deltas.iter().all(|d| d.operation == DeltaOperation::Delete && d.ordinal == 5));
    assert_eq!(deltas[0].key, "p:a");
    assert_eq!(deltas[1].key, "p:b");
}

// =============================================================================
// Ordinal Invariant Tests
// =============================================================================

#[test]
fn test_ordinal_going_backwards_panics() {
    let (_blob, config) = setup_store_config("balances");
    let mut store = config.new_partial_store(0, "trace");

    store.set(10, "a", b"1");
    let result = catch_unwind(AssertUnwindSafe(|| store.set(9, "b", b"2")));

    assert!(result.is_err());
}

#[test]
fn test_reset_clears_deltas_and_restarts_ordinals() {
    let (_blob, config) = setup_store_config("balances");
    let mut store = config.new_partial_store(0, "trace");

    store.set(10, "a", b"1");
    store.reset();
    assert!(store.deltas().is_empty());

    // Lower ordinal is fine in the next block
    store.set(1, "b", b"2");
    assert_eq!(store.deltas().len(), 1);
    assert_eq!(store.get("a"), Some(&b"1"[..]));
}
