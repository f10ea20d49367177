//! Command runner
//!
//! Executes `Cmd`s off the caller's thread and delivers their messages over
//! a channel, tagged with whatever the caller needs to match completions to
//! dispatches (typically the `WorkerHandle` to return).

use std::panic::{self, AssertUnwindSafe};
use std::thread;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};

use crate::error::Result;

use super::{Cmd, Msg};

/// Thread-per-command executor with a completion channel
pub struct CmdRunner<T> {
    tx: Sender<(T, Msg)>,
    rx: Receiver<(T, Msg)>,
}

impl<T: Send + 'static> CmdRunner<T> {
    /// Runner with an unbounded completion channel
    pub fn new() -> Self {
        let (tx, rx) = channel::unbounded();
        Self { tx, rx }
    }

    /// Runner whose completion channel holds at most `capacity` undelivered
    /// messages; finished commands wait for the scheduler to catch up
    pub fn bounded(capacity: usize) -> Self {
        let (tx, rx) = channel::bounded(capacity);
        Self { tx, rx }
    }

    /// Run `cmd` on a new thread. Its message, or `Msg::Aborted` if it
    /// panics, is delivered with `tag`.
    pub fn spawn(&self, tag: T, cmd: Cmd) -> Result<()> {
        let tx = self.tx.clone();
        thread::Builder::new()
            .name("rangekv-cmd".to_string())
            .spawn(move || {
                let msg = match panic::catch_unwind(AssertUnwindSafe(cmd)) {
                    Ok(msg) => msg,
                    Err(payload) => Msg::Aborted {
                        reason: panic_reason(payload.as_ref()),
                    },
                };
                if tx.send((tag, msg)).is_err() {
                    tracing::debug!("command runner dropped before completion was delivered");
                }
            })?;
        Ok(())
    }

    /// Block until the next completion
    pub fn recv(&self) -> Option<(T, Msg)> {
        self.rx.recv().ok()
    }

    /// Wait at most `timeout` for the next completion
    pub fn recv_timeout(&self, timeout: std::time::Duration) -> Option<(T, Msg)> {
        match self.rx.recv_timeout(timeout) {
            Ok(item) => Some(item),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Next completion if one is ready
    pub fn try_recv(&self) -> Option<(T, Msg)> {
        self.rx.try_recv().ok()
    }
}

impl<T: Send + 'static> Default for CmdRunner<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_reason(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
