//! Output stream
//!
//! Workers report progress to the downstream consumer through a `Stream`.
//! The consumer side is a plain crossbeam receiver; what it does with the
//! events is outside this crate.

use crossbeam::channel::{self, Receiver, Sender};

use crate::block::BlockRange;
use crate::store::FileInfo;
use crate::work::Unit;

/// Progress events emitted while a unit of work runs
#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    /// A worker started executing a range
    RangeStarted { unit: Unit, range: BlockRange },

    /// A module's partial store was persisted
    StoreSaved {
        unit: Unit,
        module: String,
        file: FileInfo,
    },

    /// Every module of the range completed
    RangeCompleted { unit: Unit, range: BlockRange },
}

/// Sending half of a progress stream; cloning shares the same consumer
#[derive(Debug, Clone, Default)]
pub struct Stream {
    sender: Option<Sender<Progress>>,
}

impl Stream {
    /// Wrap an existing sender
    pub fn new(sender: Sender<Progress>) -> Self {
        Self {
            sender: Some(sender),
        }
    }

    /// Unbounded stream and its receiving end
    pub fn unbounded() -> (Self, Receiver<Progress>) {
        let (tx, rx) = channel::unbounded();
        (Self::new(tx), rx)
    }

    /// Stream that drops every event
    pub fn discard() -> Self {
        Self { sender: None }
    }

    /// Publish an event. A consumer that went away is not an error for the
    /// producer: the event is dropped.
    pub fn send(&self, progress: Progress) {
        if let Some(sender) = &self.sender {
            if sender.send(progress).is_err() {
                tracing::debug!("progress receiver disconnected, dropping event");
            }
        }
    }
}
