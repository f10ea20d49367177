//! Work Module
//!
//! Runs module computations over block ranges on a bounded set of workers.
//!
//! ## Flow
//! ```text
//!   scheduler ──worker_available?──▶ WorkerPool
//!       │ borrow()                       │
//!       ▼                                │
//!   WorkerHandle::work(..) ──▶ Cmd       │
//!       │                                │
//!       ▼                                │
//!   CmdRunner::spawn(tag, cmd)           │
//!       │ (thread)                       │
//!       ▼                                │
//!   (tag, Msg) on channel ──▶ scheduler ─┘ return_worker(handle)
//! ```
//!
//! Obtaining a worker is fast and synchronous; running the work is slow and
//! happens wherever the returned `Cmd` is invoked.

mod pool;
mod runner;
mod store_worker;
mod worker;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use pool::{WorkerHandle, WorkerPool};
pub use runner::CmdRunner;
pub use store_worker::{Module, StoreWorker};
pub use worker::{Cmd, FuncWorker, Msg, WorkResult, Worker};

/// Position of a unit of work in the scheduler's plan: which stage and which
/// segment of that stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Unit {
    pub stage: usize,
    pub segment: usize,
}

impl Unit {
    pub fn new(stage: usize, segment: usize) -> Self {
        Self { stage, segment }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stage {} segment {}", self.stage, self.segment)
    }
}
