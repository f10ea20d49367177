//! StoreWorker execution

use rangekv::blob::BlobStore;
use rangekv::codec::{new_marshaller, MarshallerKind};
use rangekv::response::{Progress, Stream};
use rangekv::store::{FileKind, StoreConfig};
use rangekv::{BlockRange, Context, Msg, RangeKvError, Store, Unit, Worker};

use super::{decode_count, setup_worker};

fn modules(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

// =============================================================================
// Success Path
// =============================================================================

#[test]
fn test_work_persists_one_partial_per_module() {
    let (blob, worker) = setup_worker();
    let ctx = Context::new("t1");
    let range = BlockRange::new(10, 20);

    let cmd = worker.work(&ctx, Unit::new(0, 1), range, modules(&["counter", "late"]), Stream::discard());
    let msg = cmd();

    let Msg::Done { unit, range: done_range, result } = msg else {
        panic!("expected Done");
    };
    assert_eq!(unit, Unit::new(0, 1));
    assert_eq!(done_range, range);

    let names: Vec<&str> = result.partials_written.iter().map(|f| f.filename.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "counter/0000000020-0000000010.t1.partial",
            "late/0000000020-0000000010.t1.partial",
        ]
    );
    for file in &result.partials_written {
        assert_eq!(file.kind, FileKind::Partial);
        assert!(blob.exists(&file.filename).unwrap());
    }
}

#[test]
fn test_persisted_partial_holds_segment_state() {
    let (blob, worker) = setup_worker();
    let ctx = Context::new("t1");

    let msg = worker.work(&ctx, Unit::new(0, 0), BlockRange::new(10, 20), modules(&["counter", "late"]), Stream::discard())();
    let Msg::Done { result, .. } = msg else {
        panic!("expected Done");
    };

    let marshaller = new_marshaller(MarshallerKind::Binary);
    let blob: std::sync::Arc<dyn BlobStore> = blob;

    // counter runs every block of the range
    let config = StoreConfig::new("counter", 0, blob.clone(), marshaller.clone()).unwrap();
    let mut store = config.new_partial_store(10, "t1");
    store.load(&result.partials_written[0]).unwrap();
    assert_eq!(decode_count(store.get("count").unwrap()), 10);
    assert_eq!(store.get("block:0010"), Some(&b"seen"[..]));
    assert_eq!(store.get("block:0019"), Some(&b"seen"[..]));

    // late skips blocks before its initial block
    let config = StoreConfig::new("late", 15, blob, marshaller).unwrap();
    let mut store = config.new_partial_store(10, "t1");
    store.load(&result.partials_written[1]).unwrap();
    assert_eq!(decode_count(store.get("count").unwrap()), 5);
    assert_eq!(store.get("block:0014"), None);
    assert_eq!(store.get("block:0015"), Some(&b"seen"[..]));
}

#[test]
fn test_work_reports_progress_in_order() {
    let (_blob, worker) = setup_worker();
    let (stream, events) = Stream::unbounded();
    let unit = Unit::new(2, 3);
    let range = BlockRange::new(0, 5);

    let msg = worker.work(&Context::new("p"), unit, range, modules(&["counter", "late"]), stream)();
    assert!(msg.is_done());

    let events: Vec<Progress> = events.try_iter().collect();
    assert_eq!(events.len(), 4);
    assert_eq!(events[0], Progress::RangeStarted { unit, range });
    assert!(matches!(&events[1], Progress::StoreSaved { module, .. } if module == "counter"));
    assert!(matches!(&events[2], Progress::StoreSaved { module, .. } if module == "late"));
    assert_eq!(events[3], Progress::RangeCompleted { unit, range });
}

#[test]
fn test_work_is_deferred_until_invoked() {
    let (blob, worker) = setup_worker();

    let cmd = worker.work(&Context::new("d"), Unit::new(0, 0), BlockRange::new(0, 10), modules(&["counter"]), Stream::discard());
    assert!(blob.is_empty());

    let _ = cmd();
    assert_eq!(blob.len(), 1);
}

// =============================================================================
// Failure Path
// =============================================================================

#[test]
fn test_unknown_module_fails_unit() {
    let (blob, worker) = setup_worker();
    let (stream, events) = Stream::unbounded();

    let msg = worker.work(&Context::new("u"), Unit::new(0, 0), BlockRange::new(0, 10), modules(&["missing"]), stream)();

    let Msg::Failed { error, .. } = msg else {
        panic!("expected Failed");
    };
    assert!(matches!(error, RangeKvError::UnknownModule(ref name) if name == "missing"));
    assert!(blob.is_empty());
    assert_eq!(events.try_iter().count(), 1);
}

#[test]
fn test_module_error_fails_unit_without_persisting() {
    let (blob, worker) = setup_worker();

    let msg = worker.work(&Context::new("f"), Unit::new(0, 0), BlockRange::new(10, 20), modules(&["failing"]), Stream::discard())();

    let Msg::Failed { error, range, .. } = msg else {
        panic!("expected Failed");
    };
    assert_eq!(range, BlockRange::new(10, 20));
    assert!(matches!(error, RangeKvError::Module { block: 13, .. }));
    assert!(blob.is_empty());
}

#[test]
fn test_cancelled_context_stops_work() {
    let (blob, worker) = setup_worker();
    let ctx = Context::new("c");

    let cmd = worker.work(&ctx, Unit::new(0, 0), BlockRange::new(0, 10), modules(&["counter"]), Stream::discard());
    ctx.cancel();
    let msg = cmd();

    assert!(matches!(msg, Msg::Failed { error: RangeKvError::Cancelled, .. }));
    assert!(blob.is_empty());
}

#[test]
fn test_empty_range_still_persists_empty_partial() {
    let (blob, worker) = setup_worker();

    let msg = worker.work(&Context::new("e"), Unit::new(0, 0), BlockRange::new(30, 30), modules(&["counter"]), Stream::discard())();

    assert!(msg.is_done());
    assert!(blob.exists("counter/0000000030-0000000030.e.partial").unwrap());
}
