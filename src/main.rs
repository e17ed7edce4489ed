//! Orba GW
//!
//! Reads the Orba's MIDI stream and serves state snapshots over WebSocket.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use orba_gw::api::{self, ApiState};
use orba_gw::broadcast::{Broadcaster, SubscriberRegistry};
use orba_gw::config::AppConfig;
use orba_gw::device::DeviceInput;
use orba_gw::pipeline::{Pipeline, StopReason};
use orba_gw::{sink, sniffer};

/// Orba GW - stream Orba controller state to WebSocket clients
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "ORBA_CONFIG")]
    config: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// MIDI input port (name substring or index)
    #[arg(short, long, env = "ORBA_DEVICE")]
    device: Option<String>,

    /// Listen host
    #[arg(long, env = "ORBA_HOST")]
    host: Option<String>,

    /// Listen port
    #[arg(short, long, env = "ORBA_PORT")]
    port: Option<u16>,

    /// Also print every snapshot to stdout as NDJSON
    #[arg(long)]
    stdout: bool,

    /// Don't send the current snapshot to newly connected clients
    #[arg(long)]
    no_initial_snapshot: bool,

    /// List available MIDI input ports
    #[arg(long)]
    list_ports: bool,

    /// Print incoming MIDI and its normalized updates instead of serving
    #[arg(long)]
    sniff: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();

    init_logging(&args.log_level)?;

    let config = load_config(&args).await?;

    if args.list_ports {
        sniffer::list_ports_formatted(&config.device.client_name);
        return Ok(());
    }

    if args.sniff {
        sniffer::run_cli_sniffer(&config.device).await?;
        return Ok(());
    }

    info!("Starting Orba GW...");
    run_app(config).await?;
    info!("Orba GW shutdown complete");
    Ok(())
}

/// File configuration (if any) with command-line overrides applied
async fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Configuration file: {}", path);
            AppConfig::load(path)
                .await
                .with_context(|| format!("Failed to load configuration from {}", path))?
        }
        None => AppConfig::default(),
    };

    if let Some(device) = &args.device {
        config.device.input_port = Some(device.clone());
    }
    if let Some(host) = &args.host {
        config.server.host = host.clone();
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if args.stdout {
        config.output.stdout = true;
    }
    if args.no_initial_snapshot {
        config.server.initial_snapshot = false;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

async fn run_app(config: AppConfig) -> Result<()> {
    // No device is fatal; there is no reconnect loop
    let mut device = DeviceInput::open(&config.device).context("Failed to open MIDI input")?;
    info!("Opened MIDI device: {}", device.port_name());

    let registry = Arc::new(SubscriberRegistry::new());
    let broadcaster = Arc::new(
        Broadcaster::new(registry).with_initial_snapshot(config.server.initial_snapshot),
    );

    let listen_addr = config.listen_addr();
    let listener = TcpListener::bind(&listen_addr)
        .await
        .with_context(|| format!("Failed to bind WebSocket server on {}", listen_addr))?;
    info!("WebSocket server on ws://{}", listener.local_addr()?);

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let api_state = Arc::new(ApiState {
        broadcaster: Arc::clone(&broadcaster),
    });
    let server = tokio::spawn(api::serve(listener, api_state, async move {
        let _ = stop_rx.await;
    }));

    let stdout_sink = config
        .output
        .stdout
        .then(|| sink::spawn_stdout_sink(&broadcaster));

    let mut pipeline = Pipeline::new(Arc::clone(&broadcaster));
    let summary = pipeline.run(&mut device, shutdown_signal()).await;

    match summary.reason {
        StopReason::StreamEnded => info!("MIDI stream ended, shutting down"),
        StopReason::Shutdown => info!("Shutting down..."),
    }

    // Orderly teardown: device, subscribers, then the server
    device.close();
    broadcaster.shutdown();
    let _ = stop_tx.send(());

    match server.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("API server error: {:#}", e),
        Err(e) => warn!("API server task failed: {}", e),
    }

    if let Some(handle) = stdout_sink {
        let _ = handle.await;
    }

    Ok(())
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    // stderr keeps stdout free for NDJSON output
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to install Ctrl+C handler: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
