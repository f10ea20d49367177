//! Request context
//!
//! Carries the trace id of the originating request and a cooperative
//! cancellation flag shared by every clone.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Trace id plus cancellation signal, cheap to clone
#[derive(Debug, Clone)]
pub struct Context {
    trace_id: Arc<str>,
    cancelled: Arc<AtomicBool>,
}

impl Context {
    pub fn new(trace_id: impl Into<String>) -> Self {
        Self {
            trace_id: Arc::from(trace_id.into()),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Context with an empty trace id
    pub fn background() -> Self {
        Self::new("")
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    /// Signal cancellation to every holder of this context
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}
