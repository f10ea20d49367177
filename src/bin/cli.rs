//! rangekv CLI
//!
//! Operator tooling for a local rangekv blob directory: run a demo module
//! over a block span on the worker pool, then list, inspect, parse or delete
//! the resulting snapshots.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::thread;

use clap::{Parser, Subcommand};
use rangekv::blob::{BlobStore, LocalBlobStore};
use rangekv::codec::MarshallerKind;
use rangekv::response::{Progress, Stream};
use rangekv::store::{list_snapshots, FileKind, StoreConfig};
use rangekv::work::{CmdRunner, Module, StoreWorker};
use rangekv::{
    BlockRange, Config, Context, FileInfo, Msg, RangeKvError, Result, Store, Unit, WorkerPool,
};
use tracing_subscriber::{fmt, EnvFilter};

/// Name of the demo module registered by `run`
const DEMO_MODULE: &str = "block_index";

/// rangekv CLI
#[derive(Parser, Debug)]
#[command(name = "rangekv-cli")]
#[command(about = "Checkpointed block-range key-value stores")]
#[command(version)]
struct Args {
    /// Data directory (local blob store root)
    #[arg(short, long, default_value = "./rangekv_data")]
    data_dir: String,

    /// Snapshot encoding: binary or bincode
    #[arg(short, long, default_value = "binary")]
    marshaller: MarshallerKind,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Process a block span with the demo module and persist partial snapshots
    Run {
        /// First block (inclusive)
        #[arg(long, default_value = "0")]
        start: u64,

        /// Last block (exclusive)
        #[arg(long)]
        stop: u64,

        /// Blocks per segment
        #[arg(long, default_value = "1000")]
        segment_size: u64,

        /// Number of pool workers
        #[arg(short, long, default_value = "4")]
        workers: usize,

        /// Trace id written into partial snapshot names
        #[arg(long, default_value = "cli")]
        trace_id: String,

        /// Merge the partials into a full snapshot afterwards
        #[arg(long)]
        merge: bool,
    },

    /// List snapshots of a store
    List {
        /// Store name
        store: String,
    },

    /// Decode a snapshot and print its content
    Inspect {
        /// Snapshot file name, e.g. block_index/0000001000-0000000000.cli.partial
        filename: String,
    },

    /// Decode a snapshot file name
    ParseName {
        filename: String,
    },

    /// Delete a snapshot
    Delete {
        filename: String,
    },
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,rangekv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::debug!("rangekv CLI v{}", rangekv::VERSION);

    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let base = Config::builder()
        .data_dir(&args.data_dir)
        .marshaller(args.marshaller);

    match args.command {
        Commands::Run {
            start,
            stop,
            segment_size,
            workers,
            trace_id,
            merge,
        } => {
            let config = base
                .segment_size(segment_size)
                .worker_count(workers)
                .max_buffer(workers)
                .build();
            config.validate()?;
            run_blocks(&config, start, stop, &trace_id, merge)
        }
        Commands::List { store } => {
            let blob = LocalBlobStore::open(&args.data_dir)?;
            for file in list_snapshots(&blob, &store)? {
                println!("{:<8} {:<24} {}", file.kind, file.range, file.filename);
            }
            Ok(())
        }
        Commands::Inspect { filename } => inspect(&base.build(), &filename),
        Commands::ParseName { filename } => {
            let file = FileInfo::parse(&filename)?;
            println!("store:    {}", file.store_name);
            println!("kind:     {}", file.kind);
            println!("range:    {}", file.range);
            println!("trace_id: {}", file.trace_id);
            Ok(())
        }
        Commands::Delete { filename } => {
            let config = base.build();
            let file = FileInfo::parse(&filename)?;
            let blob: Arc<dyn BlobStore> = Arc::new(LocalBlobStore::open(&config.data_dir)?);
            let store = StoreConfig::new(&file.store_name, 0, blob, config.new_marshaller())?
                .new_partial_store(file.range.start_block, &file.trace_id);
            store.delete_store(&file)
        }
    }
}

// =============================================================================
// run
// =============================================================================

/// Indexes block numbers and clears the index at every 100th block
struct BlockIndexModule;

impl Module for BlockIndexModule {
    fn initial_block(&self) -> u64 {
        0
    }

    fn process_block(&self, block_num: u64, store: &mut dyn Store) -> Result<()> {
        if block_num % 100 == 0 {
            store.delete_prefix(0, "block:");
        }
        store.set(1, &format!("block:{:010}", block_num), &block_num.to_le_bytes());
        store.set(2, "last_block", &block_num.to_le_bytes());
        Ok(())
    }
}

fn run_blocks(config: &Config, start: u64, stop: u64, trace_id: &str, merge: bool) -> Result<()> {
    let blob: Arc<dyn BlobStore> = Arc::new(LocalBlobStore::open(&config.data_dir)?);
    let marshaller = config.new_marshaller();

    let mut modules: HashMap<String, Arc<dyn Module>> = HashMap::new();
    modules.insert(DEMO_MODULE.to_string(), Arc::new(BlockIndexModule));
    let modules = Arc::new(modules);

    let mut pending: VecDeque<BlockRange> =
        BlockRange::split(start, stop, config.segment_size).into();
    let ctx = Context::new(trace_id);

    let pool = WorkerPool::new(&ctx, config.worker_count, config.max_buffer, pending.len(), |span| {
        StoreWorker::new(span, Arc::clone(&blob), Arc::clone(&marshaller), Arc::clone(&modules))
    });
    let runner = CmdRunner::bounded(config.max_buffer.max(1));

    let (stream, progress) = Stream::unbounded();
    let reporter = thread::spawn(move || {
        for event in progress {
            if let Progress::StoreSaved { unit, file, .. } = event {
                tracing::info!(%unit, file_name = %file.filename, "segment persisted");
            }
        }
    });

    let mut next_segment = 0usize;
    let mut in_flight = 0usize;
    let mut first_error: Option<RangeKvError> = None;

    loop {
        while !pending.is_empty() && pool.worker_available() {
            let Some(range) = pending.pop_front() else { break };
            let worker = pool.borrow();
            let unit = Unit::new(0, next_segment);
            next_segment += 1;

            let cmd = worker.work(&ctx, unit, range, vec![DEMO_MODULE.to_string()], stream.clone());
            runner.spawn(worker, cmd)?;
            in_flight += 1;
        }

        if in_flight == 0 {
            break;
        }

        let Some((worker, msg)) = runner.recv() else { break };
        pool.return_worker(worker);
        in_flight -= 1;

        match msg {
            Msg::Done { unit, range, result } => {
                tracing::debug!(%unit, %range, files = result.partials_written.len(), "unit done");
            }
            Msg::Failed { unit, range, error } => {
                tracing::error!(%unit, %range, %error, "unit failed");
                first_error.get_or_insert(error);
            }
            Msg::Aborted { reason } => {
                tracing::error!(%reason, "unit aborted");
                first_error.get_or_insert(RangeKvError::Aborted(reason));
            }
        }
    }

    drop(stream);
    let _ = reporter.join();

    if let Some(error) = first_error {
        return Err(error);
    }

    if merge {
        merge_partials(config, blob, trace_id, stop)?;
    }
    Ok(())
}

/// Fold the partials written under `trace_id` into a full snapshot ending at
/// `stop`
fn merge_partials(config: &Config, blob: Arc<dyn BlobStore>, trace_id: &str, stop: u64) -> Result<()> {
    let store_config = StoreConfig::new(DEMO_MODULE, 0, Arc::clone(&blob), config.new_marshaller())?;
    let mut full = store_config.new_full_store();

    for file in list_snapshots(blob.as_ref(), DEMO_MODULE)? {
        if file.kind != FileKind::Partial
            || file.trace_id != trace_id
            || file.range.exclusive_end_block > stop
        {
            continue;
        }
        let mut partial = store_config.new_partial_store(file.range.start_block, &file.trace_id);
        partial.load(&file)?;
        full.merge_partial(&partial, file.range.exclusive_end_block)?;
    }

    let (file, writer) = full.save(stop)?;
    writer.write()?;
    println!("{}", file.filename);
    Ok(())
}

// =============================================================================
// inspect
// =============================================================================

fn inspect(config: &Config, filename: &str) -> Result<()> {
    let file = FileInfo::parse(filename)?;
    let blob: Arc<dyn BlobStore> = Arc::new(LocalBlobStore::open(&config.data_dir)?);
    let store_config = StoreConfig::new(&file.store_name, 0, blob, config.new_marshaller())?;

    let (keys, size, prefixes) = match file.kind {
        FileKind::Partial => {
            let mut store = store_config.new_partial_store(file.range.start_block, &file.trace_id);
            store.load(&file)?;
            let keys: Vec<(String, usize)> =
                store.kv().iter().map(|(k, v)| (k.clone(), v.len())).collect();
            (keys, store.total_size_bytes(), store.deleted_prefixes().to_vec())
        }
        FileKind::Full => {
            let mut store = store_config.new_full_store();
            store.load(&file)?;
            let keys: Vec<(String, usize)> =
                store.base().kv().iter().map(|(k, v)| (k.clone(), v.len())).collect();
            (keys, store.total_size_bytes(), Vec::new())
        }
    };

    println!("{} ({} keys, {} value bytes)", file, keys.len(), size);
    for (key, len) in keys {
        println!("  {:<40} {} bytes", key, len);
    }
    if !prefixes.is_empty() {
        println!("deleted prefixes:");
        for prefix in prefixes {
            println!("  {}", prefix);
        }
    }
    Ok(())
}
