//! tcwizard - Terminal host for the conversion wizard
//!
//! Polls the conversion backend, prints each workflow state, and reads
//! wizard commands from stdin.

mod config;
mod console;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tcwizard_client::{HttpBackend, WizardController};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "tcwizard")]
#[command(about = "Device conversion and firmware flashing wizard")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "tcwizard.toml")]
    config: PathBuf,

    /// Backend base URL (overrides the configuration file)
    #[arg(short, long)]
    backend: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Write the default configuration to the config path and exit
    #[arg(long)]
    write_default_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // stdout belongs to the wizard output
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("tcwizard v{}", env!("CARGO_PKG_VERSION"));

    if args.write_default_config {
        config::save_default_config(&args.config)?;
        info!(path = %args.config.display(), "Wrote default configuration");
        return Ok(());
    }

    let mut config = config::load_config(&args.config)?;
    if let Some(backend) = args.backend {
        config.backend.base_url = backend;
    }

    info!(
        backend = %config.backend.base_url,
        interval_ms = config.poller.interval_ms,
        "Configuration loaded"
    );

    let backend = HttpBackend::new(&config.backend.base_url, config.backend.request_timeout())
        .context("Failed to set up backend client")?;
    let (controller, handle) = WizardController::new(backend, config.poller.interval());

    let printer = tokio::spawn(console::print_events(handle.subscribe()));
    let controller = tokio::spawn(controller.run());

    console::read_commands(handle.clone()).await?;

    // Stopping the controller closes the event stream, which ends the printer
    let _ = handle.shutdown();
    controller.await.context("Controller task failed")?;
    drop(handle);
    printer.await.context("Console printer failed")?;

    Ok(())
}
