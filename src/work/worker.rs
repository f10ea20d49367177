//! Worker contract
//!
//! A worker turns a unit of work into a deferred `Cmd`; invoking the command
//! performs the work and yields a `Msg` for the scheduler's control loop.

use crate::block::BlockRange;
use crate::context::Context;
use crate::error::RangeKvError;
use crate::response::Stream;
use crate::store::FileInfo;

use super::Unit;

/// Deferred computation returned by `Worker::work`
pub type Cmd = Box<dyn FnOnce() -> Msg + Send + 'static>;

/// Successful completion of a unit of work
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkResult {
    /// Partial snapshots written while executing the unit
    pub partials_written: Vec<FileInfo>,
}

/// Completion event consumed by the scheduler
#[derive(Debug)]
pub enum Msg {
    /// The unit completed
    Done {
        unit: Unit,
        range: BlockRange,
        result: WorkResult,
    },

    /// The unit failed or was cancelled
    Failed {
        unit: Unit,
        range: BlockRange,
        error: RangeKvError,
    },

    /// The command panicked before producing a message
    Aborted { reason: String },
}

impl Msg {
    pub fn is_done(&self) -> bool {
        matches!(self, Msg::Done { .. })
    }
}

/// Executes one unit of work at a time. Workers hold no per-call state.
pub trait Worker: Send + Sync {
    /// Prepare the work; must return without blocking.
    ///
    /// The returned command must check `ctx` while it runs and stop promptly
    /// once it is cancelled.
    fn work(
        &self,
        ctx: &Context,
        unit: Unit,
        range: BlockRange,
        module_names: Vec<String>,
        upstream: Stream,
    ) -> Cmd;
}

/// Adapter turning a closure into a `Worker`
pub struct FuncWorker<F> {
    func: F,
}

impl<F> FuncWorker<F>
where
    F: Fn(&Context, Unit, BlockRange, Vec<String>, Stream) -> Cmd + Send + Sync,
{
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> Worker for FuncWorker<F>
where
    F: Fn(&Context, Unit, BlockRange, Vec<String>, Stream) -> Cmd + Send + Sync,
{
    fn work(
        &self,
        ctx: &Context,
        unit: Unit,
        range: BlockRange,
        module_names: Vec<String>,
        upstream: Stream,
    ) -> Cmd {
        (self.func)(ctx, unit, range, module_names, upstream)
    }
}
