//! # rangekv
//!
//! Checkpointed key-value state for block processing:
//! - Segment-scoped stores that track every mutation since a checkpoint
//! - Snapshots persisted to blob storage under block-range encoded names
//! - Pluggable, deterministic snapshot codecs
//! - A bounded worker pool with exclusive borrow/return discipline
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Scheduler (caller-provided)                  │
//! │        worker_available → borrow → work → return_worker      │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ Cmd
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                 CmdRunner (thread per command)               │
//! │                  completions: crossbeam channel              │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │ PartialStore│          │  FullStore  │
//!   │  (segment)  │          │  (merged)   │
//!   └──────┬──────┘          └──────┬──────┘
//!          └────────────┬───────────┘
//!                       ▼
//!               ┌──────────────┐      ┌─────────────┐
//!               │  Marshaller  │ ───▶ │  BlobStore  │
//!               │   (codec)    │      │ (FileWriter)│
//!               └──────────────┘      └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod block;
pub mod context;
pub mod response;
pub mod blob;
pub mod codec;
pub mod store;
pub mod work;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{RangeKvError, Result};
pub use config::Config;
pub use block::BlockRange;
pub use context::Context;
pub use store::{FileInfo, FileKind, FileWriter, FullStore, PartialStore, Store};
pub use work::{Cmd, Msg, Unit, Worker, WorkerHandle, WorkerPool};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of rangekv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
