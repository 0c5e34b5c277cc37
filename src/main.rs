use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

use inkboard::collect;
use inkboard::config;
use inkboard::display::{DisplaySink, SimulatorDriver};
use inkboard::feeds;
use inkboard::render::{GridRenderer, RenderOrchestrator};
use inkboard::store::SnapshotStore;
use inkboard_types::{unix_time_ms, SourceId};

#[derive(Parser, Debug)]
#[command(name = "inkboard")]
#[command(about = "E-paper home dashboard: feeds in, one composite frame out")]
struct Args {
    /// Path to the configuration file (default: ./inkboard.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the snapshot state file path
    #[arg(long)]
    state: Option<PathBuf>,

    /// Override where the simulator driver writes frames
    #[arg(long)]
    frame: Option<PathBuf>,

    /// Collect every source once, render one frame, and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();

    let mut settings = config::load(args.config.as_deref())?;
    if let Some(state) = args.state {
        settings.state_path = state;
    }
    if let Some(frame) = args.frame {
        settings.frame_path = frame;
    }

    let store = Arc::new(SnapshotStore::open(&settings.state_path));
    let collectors = feeds::build_collectors(&settings);
    info!(
        collectors = collectors.len(),
        state = %settings.state_path.display(),
        "inkboard starting"
    );

    let sink = DisplaySink::new(Box::new(SimulatorDriver::new(&settings.frame_path)));
    let max_staleness = SourceId::ALL
        .into_iter()
        .map(|id| (id, settings.sources[&id].max_staleness))
        .collect();
    let mut orchestrator = RenderOrchestrator::new(
        store.clone(),
        Box::new(GridRenderer::new()),
        sink,
        max_staleness,
    );

    if args.once {
        collect::run_once(collectors, store.clone()).await;
        let outcome = orchestrator.render_once(unix_time_ms())?;
        info!(?outcome, "single pass finished");
        return Ok(());
    }

    let collection = collect::spawn_all(collectors, store.clone());
    let (stop_tx, stop_rx) = watch::channel(false);
    let render_task = tokio::spawn(orchestrator.run(settings.render_interval, stop_rx));

    tokio::signal::ctrl_c().await?;
    info!("shutting down");

    let _ = stop_tx.send(true);
    collection.stop().await;
    let _ = render_task.await;

    Ok(())
}
