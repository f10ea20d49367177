//! Store worker
//!
//! Runs registered modules over a block range, one partial store per module,
//! and persists each store's segment at the end of the range.

use std::collections::HashMap;
use std::sync::Arc;

use crate::blob::BlobStore;
use crate::block::BlockRange;
use crate::codec::Marshaller;
use crate::context::Context;
use crate::error::{RangeKvError, Result};
use crate::response::{Progress, Stream};
use crate::store::{FileInfo, Store, StoreConfig};

use super::{Cmd, Msg, Unit, WorkResult, Worker};

/// A block-by-block computation that writes to its store
pub trait Module: Send + Sync {
    /// Block at which the module becomes active
    fn initial_block(&self) -> u64;

    /// Apply one block's mutations. Deltas are reset before each call, so
    /// ordinals only need to increase within a block.
    fn process_block(&self, block_num: u64, store: &mut dyn Store) -> Result<()>;
}

/// Worker executing `Module`s against partial stores
#[derive(Clone)]
pub struct StoreWorker {
    span: tracing::Span,
    blob_store: Arc<dyn BlobStore>,
    marshaller: Arc<dyn Marshaller>,
    modules: Arc<HashMap<String, Arc<dyn Module>>>,
}

impl StoreWorker {
    pub fn new(
        span: tracing::Span,
        blob_store: Arc<dyn BlobStore>,
        marshaller: Arc<dyn Marshaller>,
        modules: Arc<HashMap<String, Arc<dyn Module>>>,
    ) -> Self {
        Self {
            span,
            blob_store,
            marshaller,
            modules,
        }
    }

    fn execute(
        &self,
        ctx: &Context,
        unit: Unit,
        range: BlockRange,
        module_names: &[String],
        upstream: &Stream,
    ) -> Result<WorkResult> {
        upstream.send(Progress::RangeStarted { unit, range });

        let mut result = WorkResult::default();
        for name in module_names {
            let module = self
                .modules
                .get(name)
                .ok_or_else(|| RangeKvError::UnknownModule(name.clone()))?;

            let file = self.run_module(ctx, name, module.as_ref(), range)?;
            upstream.send(Progress::StoreSaved {
                unit,
                module: name.clone(),
                file: file.clone(),
            });
            result.partials_written.push(file);
        }

        upstream.send(Progress::RangeCompleted { unit, range });
        Ok(result)
    }

    fn run_module(
        &self,
        ctx: &Context,
        name: &str,
        module: &dyn Module,
        range: BlockRange,
    ) -> Result<FileInfo> {
        let config = StoreConfig::new(
            name,
            module.initial_block(),
            Arc::clone(&self.blob_store),
            Arc::clone(&self.marshaller),
        )?;
        let mut store = config.new_partial_store(range.start_block, ctx.trace_id());

        for block_num in range.blocks() {
            if ctx.is_cancelled() {
                tracing::debug!(module = name, block_num, "work cancelled");
                return Err(RangeKvError::Cancelled);
            }
            if block_num < module.initial_block() {
                continue;
            }

            store.reset();
            module.process_block(block_num, &mut store)?;
        }

        let (file, writer) = store.save(range.exclusive_end_block)?;
        writer.write()?;
        Ok(file)
    }
}

impl Worker for StoreWorker {
    fn work(
        &self,
        ctx: &Context,
        unit: Unit,
        range: BlockRange,
        module_names: Vec<String>,
        upstream: Stream,
    ) -> Cmd {
        let worker = self.clone();
        let ctx = ctx.clone();

        Box::new(move || {
            let _entered = worker.span.enter();
            tracing::debug!(%unit, %range, modules = ?module_names, "executing unit of work");

            match worker.execute(&ctx, unit, range, &module_names, &upstream) {
                Ok(result) => Msg::Done {
                    unit,
                    range,
                    result,
                },
                Err(error) => {
                    tracing::warn!(%unit, %range, %error, "unit of work failed");
                    Msg::Failed { unit, range, error }
                }
            }
        })
    }
}
