//! ScanPreview - headless preview scan runner
//!
//! Runs one preview scan through [`PreviewController`] against the simulated
//! scanner backend and writes the resulting PNG to disk.
//!
//! # Execution Flow
//!
//! 1. Load `ScanPreview Config.yaml` from the config directory (defaults if absent)
//!    and apply `SCANPREVIEW__*` environment overrides
//! 2. Initialize logging → <log_dir>/scanpreview.<date>
//! 3. Create tokio runtime and the controller over the simulated devices
//! 4. Relay status events to the console, start the preview, wait for it
//! 5. Write the preview image, log metrics, shut the runtime down
//!
//! Ctrl+C while scanning cancels the preview.

use anyhow::{Context, Result, anyhow, bail};
use camino::Utf8PathBuf;
use clap::Parser;
use scanpreview::services::SimulatedDirectory;
use scanpreview::workflow::{ControllerOptions, PreviewController};
use scanpreview::{
    APP_NAME, ConfigManager, MemorySink, PreviewStatus, ScanSource, Severity, StatusBroadcaster,
    StatusEvent, VERSION,
};
use std::sync::Arc;
use std::time::Duration;

/// Preview scan from a (simulated) document scanner
#[derive(Parser, Debug)]
#[command(name = "scanpreview", version, about)]
struct Args {
    /// Directory holding ScanPreview Config.yaml
    #[arg(long, default_value = "ScanPreview Data")]
    config_dir: Utf8PathBuf,

    /// Scanner device id (defaults to settings.default_device)
    #[arg(short, long)]
    device: Option<String>,

    /// Scan source: flatbed, feeder, default, auto-configured
    #[arg(short, long)]
    source: Option<String>,

    /// Where to write the preview image
    #[arg(short, long)]
    output: Option<Utf8PathBuf>,

    /// List known scanners and exit
    #[arg(long)]
    list: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config_manager = ConfigManager::new(&args.config_dir)?;
    let user_config = config_manager.load_effective_config()?;
    let settings = &user_config.settings;

    let log_dir = Utf8PathBuf::from(&settings.log_dir);
    let _log_guard = scanpreview::logging::setup_logging(
        &log_dir,
        APP_NAME,
        args.debug || settings.debug_mode,
        true,
    )?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let source = match args.source.as_deref() {
        Some(name) => {
            ScanSource::parse(name).ok_or_else(|| anyhow!("Unknown scan source: {}", name))?
        }
        None => settings.source,
    };
    let device_id = args
        .device
        .clone()
        .unwrap_or_else(|| settings.default_device.clone());
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| Utf8PathBuf::from(&settings.output_path));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(2)
        .thread_name("scanpreview-worker")
        .build()?;

    let broadcaster = StatusBroadcaster::new();
    let directory = Arc::new(SimulatedDirectory::new(user_config.devices.clone()));
    let controller = PreviewController::with_options(
        directory,
        Arc::new(broadcaster.clone()),
        Arc::new(scanpreview::metrics::Metrics::new()),
        ControllerOptions::from(settings),
        runtime.handle().clone(),
    );

    let result: Result<Option<Vec<u8>>> = runtime.block_on(async {
        if args.list {
            let devices = controller
                .devices()
                .await
                .context("Failed to enumerate scanners")?;
            for device in devices {
                println!("{}\t{}", device.id, device.name);
            }
            return Ok(None);
        }

        run_preview(&controller, &broadcaster, &device_id, source).await
    });

    controller.metrics().log_summary();
    runtime.shutdown_timeout(Duration::from_secs(5));

    let Some(image) = result? else {
        return Ok(());
    };

    std::fs::write(&output, &image)
        .with_context(|| format!("Failed to write preview image: {}", output))?;
    println!("Preview saved to {}", output);
    tracing::info!("Wrote {} byte preview to {}", image.len(), output);

    Ok(())
}

fn print_event(event: &StatusEvent) {
    match event.severity {
        Severity::Info => println!("{}", event.message),
        Severity::Error => eprintln!("{}", event.message),
    }
}

/// Start the preview, print its status events, and return the image bytes
async fn run_preview(
    controller: &PreviewController,
    broadcaster: &StatusBroadcaster,
    device_id: &str,
    source: ScanSource,
) -> Result<Option<Vec<u8>>> {
    let mut status_rx = broadcaster.subscribe();

    let sink = Arc::new(MemorySink::new());
    let handle = controller.start_preview(device_id, source, sink.clone())?;
    let id = handle.id();

    let mut wait = std::pin::pin!(handle.wait());
    let status = loop {
        tokio::select! {
            status = &mut wait => break status,
            Ok(event) = status_rx.recv() => print_event(&event),
            _ = tokio::signal::ctrl_c() => {
                tracing::warn!("Interrupted - cancelling preview {}", id);
                controller.cancel_current();
            }
        }
    };

    // Terminal events are sent before the handle resolves
    while let Ok(event) = status_rx.try_recv() {
        print_event(&event);
    }

    match status {
        PreviewStatus::Succeeded => Ok(Some(sink.contents())),
        PreviewStatus::Cancelled => {
            tracing::warn!("Preview {} cancelled", id);
            Ok(None)
        }
        PreviewStatus::Failed(reason) => bail!("Preview {} failed: {}", id, reason),
        PreviewStatus::Pending => bail!("Preview {} ended without a terminal status", id),
    }
}
