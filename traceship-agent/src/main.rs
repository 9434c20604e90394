//! traceship-agent entry point.
//!
//! Assembly order mirrors the data flow: configuration, publisher,
//! cursor store, then one tail reader per stream under the supervisor.
//! The process blocks until SIGTERM/SIGINT, then asks every reader to
//! stop at its next safe checkpoint and waits for full convergence.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use traceship_core::config::TraceshipConfig;
use traceship_core::metrics as m;
use traceship_publish::create_publisher;
use traceship_tailer::{CursorLoadReport, CursorStore, TailerConfig, TailerSupervisorBuilder};

mod cli;
mod logging;
mod metrics_server;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::AgentCli::parse();

    let mut config = TraceshipConfig::load(&args.config)
        .await
        .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;

    // CLI overrides take precedence over file and environment
    if let Some(level) = args.log_level {
        config.general.log_level = level;
    }
    if let Some(format) = args.log_format {
        config.general.log_format = format;
    }
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

    if args.validate {
        println!("configuration OK: {}", args.config.display());
        return Ok(());
    }

    logging::init_tracing(&config.general)?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %args.config.display(),
        "traceship-agent starting"
    );

    if config.metrics.enabled {
        metrics_server::install_metrics_recorder(&config.metrics)?;
        m::describe_metrics();
        metrics::gauge!(m::AGENT_BUILD_INFO, "version" => env!("CARGO_PKG_VERSION")).set(1.0);
        tracing::info!(port = config.metrics.port, "metrics endpoint enabled");
    }

    let publisher = create_publisher(&config.publisher)
        .map_err(|e| anyhow::anyhow!("failed to create publisher: {}", e))?;
    tracing::info!(backend = publisher.name(), topic = %config.publisher.topic, "publisher initialized");

    let (cursor, load_report) = CursorStore::load(&config.tailing.cursor_path).await;
    match &load_report {
        CursorLoadReport::FreshStart => {
            tracing::info!("no cursor snapshot found, starting from origin");
        }
        CursorLoadReport::Restored { streams } => {
            tracing::info!(streams, "cursor snapshot restored");
        }
        CursorLoadReport::CorruptReset { reason } => {
            tracing::warn!(reason = %reason, "corrupt cursor snapshot, starting from origin");
        }
    }

    let supervisor = TailerSupervisorBuilder::new()
        .config(TailerConfig::from_core(&config))
        .cursor_store(Arc::new(cursor))
        .publisher(Arc::clone(&publisher))
        .build()
        .map_err(|e| anyhow::anyhow!("failed to build tailer supervisor: {}", e))?;
    let cancel = supervisor.cancellation_token();

    let mut supervisor_task = tokio::spawn(supervisor.run());

    let report = tokio::select! {
        signal = wait_for_shutdown_signal() => {
            let signal = signal?;
            tracing::info!(signal, "shutdown signal received");
            cancel.cancel();
            supervisor_task
                .await
                .map_err(|e| anyhow::anyhow!("supervisor task failed: {}", e))?
        }
        joined = &mut supervisor_task => {
            // every reader stopped on its own (all streams failed fatally)
            tracing::warn!("all tail readers stopped before shutdown signal");
            joined.map_err(|e| anyhow::anyhow!("supervisor task failed: {}", e))?
        }
    };
    tracing::info!(
        streams = report.streams,
        failed = report.failed,
        "all tail readers stopped"
    );

    if let Err(e) = publisher.shutdown().await {
        tracing::error!(error = %e, "publisher shutdown failed");
    }

    tracing::info!("traceship-agent shut down");
    Ok(())
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
///
/// Returns the name of the signal that triggered the shutdown.
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}
