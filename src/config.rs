//! Configuration for rangekv
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;
use std::sync::Arc;

use crate::codec::{self, Marshaller, MarshallerKind};
use crate::error::{RangeKvError, Result};

/// Main configuration for a rangekv deployment
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory of the local blob store
    /// Internal structure:
    ///   {data_dir}/
    ///     └── {store_name}/
    ///           ├── 0000001000-0000000000.{trace}.partial
    ///           └── 0000002000-0000000000.kv
    pub data_dir: PathBuf,

    /// Snapshot encoding used by stores
    pub marshaller: MarshallerKind,

    /// Number of blocks per checkpoint segment
    pub segment_size: u64,

    // -------------------------------------------------------------------------
    // Worker Pool Configuration
    // -------------------------------------------------------------------------
    /// Number of workers in the pool (fixed for the pool's lifetime)
    pub worker_count: usize,

    /// Max buffered jobs the scheduler may queue ahead of the pool
    pub max_buffer: usize,

    /// Expected number of jobs, used only as a sizing hint
    pub hint: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./rangekv_data"),
            marshaller: MarshallerKind::Binary,
            segment_size: 1000,
            worker_count: 4,
            max_buffer: 4,
            hint: 0,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject configurations no pool or scheduler could run with
    pub fn validate(&self) -> Result<()> {
        if self.worker_count == 0 {
            return Err(RangeKvError::Config(
                "worker_count must be greater than zero".to_string(),
            ));
        }
        if self.segment_size == 0 {
            return Err(RangeKvError::Config(
                "segment_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Instantiate the configured snapshot codec
    pub fn new_marshaller(&self) -> Arc<dyn Marshaller> {
        codec::new_marshaller(self.marshaller)
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root of the local blob store)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the snapshot encoding
    pub fn marshaller(mut self, kind: MarshallerKind) -> Self {
        self.config.marshaller = kind;
        self
    }

    /// Set the number of blocks per segment
    pub fn segment_size(mut self, blocks: u64) -> Self {
        self.config.segment_size = blocks;
        self
    }

    /// Set the number of pool workers
    pub fn worker_count(mut self, count: usize) -> Self {
        self.config.worker_count = count;
        self
    }

    /// Set the scheduler buffer size
    pub fn max_buffer(mut self, size: usize) -> Self {
        self.config.max_buffer = size;
        self
    }

    /// Set the job count hint
    pub fn hint(mut self, hint: usize) -> Self {
        self.config.hint = hint;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
