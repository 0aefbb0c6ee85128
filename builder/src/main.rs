use anyhow::Context;
use clap::Parser;
use generator::profile::{write_synthetic_trail, TrailProfile};
use log::{info, warn};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use workflow::config::{WorkflowConfig, SETTINGS_FILE};
use workflow::runner::Runner;

mod generator;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Builds panorama viewer sequences from trail photo directories")]
struct Args {
    /// Trail directory (or, with --batch, a directory of trails)
    dir: PathBuf,
    /// Web base path the trail is served from
    base: String,
    /// Panoramas were captured with the camera mounted upside down
    #[arg(long, default_value_t = false)]
    flip: bool,
    /// Global settings file
    #[arg(long, default_value = SETTINGS_FILE)]
    global_config: PathBuf,
    #[arg(long, default_value_t = false)]
    batch: bool,
    /// Also write bearing_sequence.json and geo_sequence.json
    #[arg(long, default_value_t = false)]
    export_geo: bool,
    /// Neighbor graph workers; defaults to available parallelism
    #[arg(long)]
    workers: Option<usize>,
    /// Write a synthetic trail of N images into DIR before processing
    #[arg(long)]
    synthesize: Option<usize>,
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

/// Sets `flag` on Ctrl+C; the runner checks it between stages.
fn watch_interrupt(flag: Arc<AtomicBool>) -> anyhow::Result<()> {
    let runtime = TokioBuilder::new_current_thread()
        .enable_all()
        .build()
        .context("creating runtime for signal handling")?;
    thread::spawn(move || {
        let received = runtime.block_on(signal::ctrl_c());
        match received {
            Ok(()) => {
                warn!("interrupt received; stopping after the current stage");
                flag.store(true, Ordering::SeqCst);
            }
            Err(err) => warn!("cannot listen for Ctrl+C: {err}"),
        }
    });
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let workers = args.workers.unwrap_or_else(|| {
        thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    });
    let workflow_config =
        WorkflowConfig::load(&args.global_config, args.flip, args.export_geo, workers)?;

    let cancelled = Arc::new(AtomicBool::new(false));
    watch_interrupt(cancelled.clone())?;
    let runner = Runner::new(workflow_config).with_cancel_flag(cancelled);

    if let Some(images) = args.synthesize {
        let profile = TrailProfile {
            images,
            seed: args.seed,
            ..Default::default()
        };
        let trail = write_synthetic_trail(&args.dir, &profile)?;
        info!(
            "synthesized {} images into {}",
            trail.located.len(),
            args.dir.display()
        );
    }

    if args.batch {
        let outcome = runner.execute_batch(&args.dir, &args.base)?;
        for done in &outcome.completed {
            println!(
                "{} -> {} scenes, {} hotspots, {} skipped",
                done.trail.display(),
                done.scenes,
                done.edges,
                done.skipped
            );
        }
        for (trail, reason) in &outcome.failed {
            println!("{} FAILED: {reason}", trail.display());
        }
        let metrics = runner.metrics();
        info!(
            "batch done: {} processed, {} failed, {} images, {} hotspots",
            metrics.trails_processed,
            metrics.trails_failed,
            metrics.records_loaded,
            metrics.edges_kept
        );
        if !outcome.failed.is_empty() {
            let total = outcome.completed.len() + outcome.failed.len();
            anyhow::bail!("{} of {total} trails failed", outcome.failed.len());
        }
    } else {
        let outcome = runner.execute(&args.dir, &args.base)?;
        println!(
            "Sequence {} -> {} scenes, {} hotspots, {} skipped images",
            outcome.sequence_id, outcome.scenes, outcome.edges, outcome.skipped
        );
    }

    Ok(())
}
