//! Error types for rangekv
//!
//! Provides a unified error type for recoverable failures. Scheduling and
//! ordering invariant violations are not represented here: they panic.

use thiserror::Error;

/// Result type alias using RangeKvError
pub type Result<T> = std::result::Result<T, RangeKvError>;

/// Unified error type for rangekv operations
#[derive(Debug, Error)]
pub enum RangeKvError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Blob Store Errors
    // -------------------------------------------------------------------------
    #[error("Blob not found: {0}")]
    BlobNotFound(String),

    #[error("Blob store error: {0}")]
    Blob(String),

    // -------------------------------------------------------------------------
    // Store Errors
    // -------------------------------------------------------------------------
    #[error("load store {store} at {filename}: {source}")]
    Load {
        store: String,
        filename: String,
        #[source]
        source: Box<RangeKvError>,
    },

    #[error("Invalid snapshot file name {filename:?}: {reason}")]
    InvalidFileName { filename: String, reason: String },

    #[error("Invalid boundary {boundary} for store {store}: {reason}")]
    InvalidBoundary {
        store: String,
        boundary: u64,
        reason: String,
    },

    #[error("Invalid store name {0:?}")]
    InvalidStoreName(String),

    #[error("Cannot merge: {0}")]
    Merge(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Marshal error: {0}")]
    Marshal(String),

    #[error("Unmarshal error: {0}")]
    Unmarshal(String),

    // -------------------------------------------------------------------------
    // Work Errors
    // -------------------------------------------------------------------------
    #[error("Unknown module: {0}")]
    UnknownModule(String),

    #[error("Module {module} failed at block {block}: {reason}")]
    Module {
        module: String,
        block: u64,
        reason: String,
    },

    #[error("Work cancelled")]
    Cancelled,

    #[error("Work aborted: {0}")]
    Aborted(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RangeKvError {
    /// True when the error (or the cause of a load error) is a missing blob
    pub fn is_not_found(&self) -> bool {
        match self {
            RangeKvError::BlobNotFound(_) => true,
            RangeKvError::Load { source, .. } => source.is_not_found(),
            _ => false,
        }
    }
}
