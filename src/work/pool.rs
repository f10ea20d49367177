//! Worker pool
//!
//! A fixed set of interchangeable workers. Each slot is either idle (in the
//! pool) or borrowed by exactly one caller.
//!
//! ## Concurrency:
//! - `workers`: created once at construction, never resized, read-only
//! - `state`: idle stack and per-slot leases behind a Mutex
//! - `worker_available` is a snapshot; admission control (e.g. a semaphore
//!   sized to the pool) belongs to the scheduler
//!
//! Every borrow issues a fresh lease. A handle is only valid while its lease
//! is the slot's current one, so a clone kept past `return_worker` can
//! neither run work nor be returned again.
//!
//! Misuse (borrowing from an exhausted pool, returning a worker that is not
//! borrowed, using a handle after its return) is a scheduling bug and panics.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::block::BlockRange;
use crate::context::Context;
use crate::response::Stream;

use super::{Cmd, Unit, Worker};

/// A borrowed worker slot
#[derive(Clone)]
pub struct WorkerHandle {
    pool: Arc<PoolInner>,
    slot: usize,
    lease: u64,
}

impl WorkerHandle {
    /// Slot index inside the pool
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Prepare a unit of work on this worker.
    ///
    /// Panics if the handle was already returned to its pool.
    pub fn work(
        &self,
        ctx: &Context,
        unit: Unit,
        range: BlockRange,
        module_names: Vec<String>,
        upstream: Stream,
    ) -> Cmd {
        if !self.pool.holds(self.slot, self.lease) {
            panic!("worker {} used after it was returned", self.slot);
        }
        self.pool.workers[self.slot].work(ctx, unit, range, module_names, upstream)
    }
}

impl fmt::Debug for WorkerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerHandle")
            .field("slot", &self.slot)
            .field("lease", &self.lease)
            .finish()
    }
}

struct PoolState {
    /// Idle slot indexes; borrow pops, return pushes
    idle: Vec<usize>,
    /// `leases[slot]` is the current borrow's lease, `None` while idle
    leases: Vec<Option<u64>>,
    next_lease: u64,
}

struct PoolInner {
    workers: Vec<Arc<dyn Worker>>,
    state: Mutex<PoolState>,
}

impl PoolInner {
    fn holds(&self, slot: usize, lease: u64) -> bool {
        self.state.lock().leases[slot] == Some(lease)
    }
}

/// Bounded pool of workers with exclusive borrow/return
pub struct WorkerPool {
    inner: Arc<PoolInner>,
}

impl WorkerPool {
    /// Create a pool of exactly `size` workers, built eagerly by `factory`.
    ///
    /// Each worker receives its own span, `worker{slot=N}`, to log under.
    /// `max_buffer` and `hint` describe the scheduler's intended load and are
    /// only recorded in the pool's log line.
    pub fn new<W, F>(ctx: &Context, size: usize, max_buffer: usize, hint: usize, factory: F) -> Self
    where
        W: Worker + 'static,
        F: Fn(tracing::Span) -> W,
    {
        let workers: Vec<Arc<dyn Worker>> = (0..size)
            .map(|slot| {
                let span = tracing::debug_span!("worker", slot);
                Arc::new(factory(span)) as Arc<dyn Worker>
            })
            .collect();

        tracing::info!(
            trace_id = %ctx.trace_id(),
            worker_count = size,
            max_buffer,
            hint,
            "initiating worker pool"
        );

        Self {
            inner: Arc::new(PoolInner {
                workers,
                state: Mutex::new(PoolState {
                    idle: (0..size).rev().collect(),
                    leases: vec![None; size],
                    next_lease: 1,
                }),
            }),
        }
    }

    /// Whether at least one worker is idle. Advisory: another caller may
    /// borrow it before you do.
    pub fn worker_available(&self) -> bool {
        !self.inner.state.lock().idle.is_empty()
    }

    /// Take an idle worker.
    ///
    /// Panics if none is idle; callers must check `worker_available` (or
    /// gate admission to at most the pool size) first.
    pub fn borrow(&self) -> WorkerHandle {
        let mut state = self.inner.state.lock();
        let slot = match state.idle.pop() {
            Some(slot) => slot,
            None => {
                drop(state);
                panic!(
                    "worker pool exhausted: all {} workers are borrowed",
                    self.inner.workers.len()
                );
            }
        };
        let lease = state.next_lease;
        state.next_lease += 1;
        state.leases[slot] = Some(lease);

        tracing::trace!(slot, lease, "worker borrowed");
        WorkerHandle {
            pool: Arc::clone(&self.inner),
            slot,
            lease,
        }
    }

    /// Give a borrowed worker back.
    ///
    /// Panics if the handle belongs to another pool or does not hold the
    /// slot's current lease (returned twice, or a stale clone).
    pub fn return_worker(&self, worker: WorkerHandle) {
        assert!(
            Arc::ptr_eq(&worker.pool, &self.inner),
            "worker {} from another pool returned to pool",
            worker.slot
        );

        let mut state = self.inner.state.lock();
        if state.leases[worker.slot] != Some(worker.lease) {
            drop(state);
            panic!("worker {} returned but it was not borrowed", worker.slot);
        }
        state.leases[worker.slot] = None;
        state.idle.push(worker.slot);

        tracing::trace!(slot = worker.slot, lease = worker.lease, "worker returned");
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let idle = self.inner.state.lock().idle.len();
        f.debug_struct("WorkerPool")
            .field("worker_count", &self.inner.workers.len())
            .field("idle", &idle)
            .finish()
    }
}
