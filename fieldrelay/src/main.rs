//! fieldrelay - device telemetry queue and relay agent
//!
//! This tool provides commands for:
//! - Checking relay configuration and queue status
//! - Running a report cycle once or on a periodic schedule
//! - Inspecting, exporting and purging the local event queue
//!
//! Uses XDG Base Directory specification for file locations:
//! - Database: $XDG_DATA_HOME/fieldrelay/queue.db (~/.local/share/fieldrelay/queue.db)
//! - Config: $XDG_CONFIG_HOME/fieldrelay/config.toml (~/.config/fieldrelay/config.toml)

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use fieldrelay_core::format::format_relative_time;
use fieldrelay_core::probes::host::{AllowAll, NoRadios, StaticDeviceInfo, SysfsPowerProbe};
use fieldrelay_core::probes::{snapshot, LocationPriority, ProbeSet};
use fieldrelay_core::relay::{RelayWorker, WebhookSink};
use fieldrelay_core::types::Payload;
use fieldrelay_core::{Config, CycleOutcome, EventStore};

#[derive(Parser)]
#[command(name = "fieldrelay")]
#[command(about = "Device telemetry queue and relay agent")]
#[command(version)]
struct Args {
    /// Verbose output (logs to the XDG state directory)
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show relay configuration and queue status
    Status,

    /// Assemble and submit one report now
    Send,

    /// Run periodic report cycles until interrupted
    Watch,

    /// List pending events in the queue
    Queue,

    /// Append one event to the queue
    Capture {
        /// Producer/category name (e.g. "notifications")
        source: String,

        /// Payload fields as key=value pairs
        #[arg(short, long = "field", value_name = "KEY=VALUE")]
        fields: Vec<String>,
    },

    /// Write the pending queue and a device snapshot to a JSON file
    Export {
        /// Target directory (default: current directory)
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },

    /// Delete every pending event from the queue
    Purge {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    Config::ensure_xdg_env();

    // Load configuration
    let config = Config::load().context("failed to load configuration")?;

    // Initialize logging if verbose
    let _log_guard = if args.verbose {
        Some(
            fieldrelay_core::logging::init(&config.logging)
                .context("failed to initialize logging")?,
        )
    } else {
        None
    };

    match args.command {
        Command::Status => cmd_status(&config),
        Command::Send => cmd_send(&config),
        Command::Watch => cmd_watch(&config),
        Command::Queue => cmd_queue(&config),
        Command::Capture { source, fields } => cmd_capture(&config, &source, &fields),
        Command::Export { dir } => cmd_export(&config, dir),
        Command::Purge { yes } => cmd_purge(&config, yes),
    }
}

/// Open the event queue, running migrations.
fn open_store(config: &Config) -> Result<EventStore> {
    let path = config.database_path();
    let store = EventStore::open(&path)
        .with_context(|| format!("failed to open event queue at {}", path.display()))?;
    store.migrate().context("failed to run database migrations")?;
    Ok(store)
}

/// Probes available on a plain host: identity and battery from the
/// filesystem, no radios, everything permitted.
fn host_probes() -> ProbeSet {
    ProbeSet {
        location: Box::new(NoRadios),
        power: Box::new(SysfsPowerProbe),
        network: Box::new(NoRadios),
        device: Box::new(StaticDeviceInfo::detect()),
        permissions: Box::new(AllowAll),
    }
}

fn build_worker(config: &Config) -> Result<Arc<RelayWorker>> {
    if !config.relay.is_ready() {
        bail!(
            "relay is not configured; set [relay] enabled and endpoint_url in {}",
            Config::config_path().display()
        );
    }
    config
        .relay
        .validate()
        .context("invalid relay configuration")?;

    let store = Arc::new(open_store(config)?);
    let sink = WebhookSink::new(&config.relay).context("failed to create webhook client")?;

    Ok(Arc::new(RelayWorker::new(
        store,
        host_probes(),
        Box::new(sink),
        &config.relay,
    )))
}

fn cmd_status(config: &Config) -> Result<()> {
    println!("fieldrelay status");
    println!("=================");
    println!();

    let relay = &config.relay;
    println!("Enabled:       {}", relay.enabled);
    println!(
        "Endpoint:      {}",
        relay.endpoint_url.as_deref().unwrap_or("(not set)")
    );
    println!("Device name:   {}", relay.display_name());
    println!("Batch cap:     {}", relay.batch_cap);
    println!("Interval:      {}s", relay.interval_secs);
    println!();

    let db_path = config.database_path();
    println!("Queue:         {}", db_path.display());

    let store = open_store(config)?;
    let pending = store.pending_count().context("failed to count queue")?;
    println!("Pending:       {} event(s)", pending);

    if !relay.is_ready() {
        println!();
        println!("Relay is not configured. Enable it in config.toml:");
        println!();
        println!("  [relay]");
        println!("  enabled = true");
        println!("  endpoint_url = \"https://hooks.example.com/devices\"");
    }

    Ok(())
}

fn cmd_send(config: &Config) -> Result<()> {
    let worker = build_worker(config)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to create async runtime")?;

    let outcome = runtime.block_on(worker.trigger_now());
    tracing::info!(%outcome, "Manual cycle finished");
    println!("Cycle finished: {}", outcome);

    match outcome {
        CycleOutcome::Success => Ok(()),
        CycleOutcome::Retry => bail!("submission failed; events remain queued"),
        CycleOutcome::PermissionDenied => bail!("a required capability is not granted"),
        CycleOutcome::AssembleError => bail!("snapshot assembly failed; events remain queued"),
    }
}

fn cmd_watch(config: &Config) -> Result<()> {
    let worker = build_worker(config)?;
    let interval = config.relay.interval();

    let runtime = tokio::runtime::Runtime::new().context("failed to create async runtime")?;

    let running = Arc::new(AtomicBool::new(true));
    let handler_flag = running.clone();
    ctrlc::set_handler(move || handler_flag.store(false, Ordering::SeqCst))
        .context("failed to install interrupt handler")?;

    println!(
        "Relaying every {}s (first cycle now). Press Ctrl-C to stop.",
        interval.as_secs()
    );

    // Periodic cycles run on the runtime's worker threads; this thread just
    // waits for the interrupt.
    let _guard = runtime.enter();
    worker.schedule_periodic(interval);

    while running.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(200));
    }

    worker.cancel_periodic();
    tracing::info!("Watch loop interrupted; periodic relay cancelled");
    println!("Stopped.");
    Ok(())
}

fn cmd_queue(config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let events = store.list_all().context("failed to read queue")?;

    if events.is_empty() {
        println!("Queue is empty.");
        return Ok(());
    }

    println!("{} pending event(s):", events.len());
    println!();
    for event in &events {
        let title = event.title().unwrap_or("-");
        println!(
            "  [{}] {:>9}  {:<16} {}",
            event.id,
            format_relative_time(event.captured_at),
            event.source,
            title
        );
    }

    Ok(())
}

fn cmd_capture(config: &Config, source: &str, fields: &[String]) -> Result<()> {
    let mut payload = Payload::new();
    for field in fields {
        let (key, value) = field
            .split_once('=')
            .with_context(|| format!("invalid field '{}', expected KEY=VALUE", field))?;
        payload.insert(key.to_string(), value.to_string());
    }

    let store = open_store(config)?;
    let event = store
        .insert(source, &payload)
        .context("failed to insert event")?;

    println!("Captured event {} from '{}'", event.id, event.source);
    Ok(())
}

fn cmd_export(config: &Config, dir: Option<PathBuf>) -> Result<()> {
    let store = open_store(config)?;
    let probes = host_probes();
    let snapshot = snapshot::assemble(&probes, LocationPriority::Balanced);

    let dir = dir.unwrap_or_else(|| PathBuf::from("."));
    let path = fieldrelay_core::export::export_pending(&store, &snapshot, &dir)
        .context("export failed")?;

    println!("Exported to {}", path.display());
    Ok(())
}

fn cmd_purge(config: &Config, yes: bool) -> Result<()> {
    if !yes {
        bail!("refusing to purge without --yes");
    }

    let store = open_store(config)?;
    let deleted = store.purge_all().context("failed to purge queue")?;
    println!("Deleted {} event(s).", deleted);
    Ok(())
}
