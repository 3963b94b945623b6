//! # regscope - Main Entry Point
//!
//! Two subcommands:
//! - **decode** (`regscope decode <FILE>`): split a dump of raw samples, decode
//!   them on a pool of worker threads and print one line (or JSON object) per event
//! - **resolve** (`regscope resolve --pid <PID> <ADDR>...`): translate addresses
//!   to `module + offset` using the process's maps

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::bounded;
use log::{info, warn};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use regscope::cli::{ArchiveSpec, Args, Command, DecodeArgs, ResolveArgs};
use regscope::config::{DecodeConfig, ExtraOptions};
use regscope::decode::Record;
use regscope::domain::{ConfigError, Pid};
use regscope::processing::{
    describe, display_stopped, split_samples, EventJson, EventProcessor, LoggingForeignHandler,
    ProcessorStats,
};
use regscope::registry::PidRegistry;
use regscope::symbolization::{MapSnapshot, MapsResolver, MmapArchive};
use regscope_common::PERF_RECORD_SAMPLE;

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_USAGE: i32 = 2;

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            let code = exit_code_for(&e);
            eprintln!("error: {e:#}");
            code
        }
    });
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    if err.downcast_ref::<ConfigError>().is_some() {
        EXIT_USAGE
    } else {
        EXIT_ERROR
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    match args.command {
        Command::Decode(decode) => run_decode(&decode),
        Command::Resolve(resolve) => run_resolve(&resolve),
    }
}

/// Build the mapping archive from `--archive-maps` files
fn load_archive(specs: &[ArchiveSpec]) -> Result<MmapArchive> {
    let archive = MmapArchive::new();
    for spec in specs {
        let content = std::fs::read_to_string(&spec.path)
            .with_context(|| format!("Failed to read maps file {}", spec.path.display()))?;
        let snapshot = MapSnapshot::parse(&content);
        info!("{}: archived {} segments from {}", spec.pid, snapshot.segments().len(), spec.path.display());
        archive.seed_from_snapshot(spec.pid, &snapshot);
    }
    Ok(archive)
}

fn worker_count(requested: usize) -> usize {
    if requested > 0 {
        return requested;
    }
    thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
}

/// Output of one record: its rendered line, or the error that aborted it
type RecordOutcome = (usize, Result<Option<String>, String>);

fn run_decode(args: &DecodeArgs) -> Result<()> {
    let config = args.decode_config()?;
    let options = args.extra_options();
    let archive = load_archive(&args.archive_maps)?;
    let registry = PidRegistry::new();

    let bytes = std::fs::read(&args.input)
        .with_context(|| format!("Failed to read dump {}", args.input.display()))?;
    let samples = split_samples(&bytes).context("Dump file is not a sequence of samples")?;
    let workers = worker_count(args.threads).min(samples.len().max(1));
    info!("{} samples from {}, {workers} workers", samples.len(), args.input.display());

    let abort = AtomicBool::new(false);
    let (config, registry, archive, abort) = (&config, &registry, &archive, &abort);
    let (job_tx, job_rx) = bounded::<(usize, &[u8])>(workers * 4);
    let (out_tx, out_rx) = bounded::<RecordOutcome>(workers * 4);

    let (outcomes, stats) = thread::scope(|scope| {
        let mut handles = Vec::with_capacity(workers);
        for _ in 0..workers {
            let job_rx = job_rx.clone();
            let out_tx = out_tx.clone();
            handles.push(scope.spawn(move || {
                decode_worker(config, options, registry, archive, abort, args.json, &job_rx, &out_tx)
            }));
        }
        drop(job_rx);
        drop(out_tx);

        let feeder = scope.spawn(move || {
            for job in samples.into_iter().enumerate() {
                if abort.load(Ordering::Relaxed) || job_tx.send(job).is_err() {
                    break;
                }
            }
        });

        // Keep output in file order regardless of which worker finished first
        let mut outcomes = BTreeMap::new();
        for (idx, outcome) in &out_rx {
            if args.strict && outcome.is_err() {
                abort.store(true, Ordering::Relaxed);
            }
            outcomes.insert(idx, outcome);
        }

        let _ = feeder.join();
        let mut stats = ProcessorStats::default();
        for handle in handles {
            if let Ok(worker_stats) = handle.join() {
                stats.merge(&worker_stats);
            }
        }
        (outcomes, stats)
    });

    let mut first_error = None;
    for (idx, outcome) in outcomes {
        match outcome {
            Ok(Some(line)) => println!("{line}"),
            Ok(None) => {}
            Err(e) if args.strict => {
                first_error = Some(format!("record {idx}: {e}"));
                break;
            }
            Err(e) => warn!("record {idx} skipped: {e}"),
        }
    }

    info!("{stats}");
    display_stopped(&registry.stopped_pids());

    if let Some(e) = first_error {
        anyhow::bail!("Decoding aborted at {e}");
    }
    Ok(())
}

/// Decode records from `jobs` until the channel closes or a strict abort
#[allow(clippy::too_many_arguments)]
fn decode_worker(
    config: &DecodeConfig,
    options: ExtraOptions,
    registry: &PidRegistry,
    archive: &MmapArchive,
    abort: &AtomicBool,
    json: bool,
    jobs: &crossbeam_channel::Receiver<(usize, &[u8])>,
    out: &crossbeam_channel::Sender<RecordOutcome>,
) -> ProcessorStats {
    let mut processor = EventProcessor::new(config, registry, archive, None);
    let mut foreign = LoggingForeignHandler::default();

    for (idx, raw) in jobs {
        if abort.load(Ordering::Relaxed) {
            break;
        }
        let record = Record { record_type: PERF_RECORD_SAMPLE, raw_sample: raw, options };
        let outcome = match processor.process_record(&record, &mut foreign) {
            Ok(Some(event)) if json => serde_json::to_string(&EventJson::from_event(&event, config))
                .map(Some)
                .map_err(|e| e.to_string()),
            Ok(Some(event)) => Ok(Some(describe(&event, config, processor.resolver()))),
            Ok(None) => Ok(None),
            Err(e) => Err(e.to_string()),
        };
        if out.send((idx, outcome)).is_err() {
            break;
        }
    }

    processor.stats
}

fn run_resolve(args: &ResolveArgs) -> Result<()> {
    let archive = load_archive(&args.archive_maps)?;
    let resolver = MapsResolver::new(args.proc_root.clone(), &archive).manual(args.manual);
    let pid = Pid(args.pid);

    match resolver.snapshot(pid) {
        Some((snapshot, origin)) => {
            info!("{pid}: using {origin} maps");
            for addr in &args.addrs {
                println!("0x{addr:x} {}", snapshot.resolve(*addr));
            }
        }
        None => {
            warn!("{pid}: no maps available");
            for addr in &args.addrs {
                println!("0x{addr:x} {}", regscope::symbolization::UNKNOWN_SYMBOL);
            }
        }
    }
    Ok(())
}
