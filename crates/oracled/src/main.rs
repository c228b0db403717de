//! oracled - Flight Oracle Bridge Daemon
//!
//! Registers up to `--capacity` of the ledger node's accounts as oracle
//! agents, then answers every flight status request the registry emits with
//! each agent holding the request's index. Runs until Ctrl-C/SIGTERM or until
//! the request subscription ends.

mod config;
mod liveness;

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use ledger_gateway::{HttpLedgerGateway, LedgerGateway};
use oracle_core::{
    init_tracing, register_available, DispatchSummary, LogFormat, RandomStatusGenerator,
    RequestDispatcher, StopReason, METRICS,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{error, info, warn, Level};

use crate::config::{ConfigArgs, Settings};

#[derive(Parser)]
#[command(name = "oracled")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Off-chain oracle agents for flight status requests", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, env = "ORACLE_VERBOSE")]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, env = "ORACLE_LOG_JSON")]
    json: bool,

    #[command(flatten)]
    config: ConfigArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(LogFormat::from_json_flag(cli.json), level);
    info!(version = oracle_core::VERSION, "oracled starting");

    let settings = Settings::resolve(&cli.config).context("Invalid configuration")?;
    let summary = run(settings, shutdown_signal()).await;
    METRICS.flush();

    let summary = summary?;
    info!(summary = %json_line(&summary), "Dispatch summary");
    if summary.stop == StopReason::StreamEnded {
        warn!("Request subscription ended; restart the daemon to resume answering");
    }
    Ok(())
}

async fn run<F>(settings: Settings, shutdown: F) -> Result<DispatchSummary>
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    info!(
        endpoint = %settings.gateway.endpoint,
        registry = %settings.gateway.registry_address,
        "Connecting to oracle registry"
    );
    let gateway: Arc<dyn LedgerGateway> = Arc::new(
        HttpLedgerGateway::new(settings.gateway.clone())
            .context("Failed to build registry client")?,
    );

    let report = tokio::select! {
        biased;
        _ = &mut shutdown => {
            warn!("Shutdown during oracle registration");
            return Ok(DispatchSummary::default());
        }
        report = register_available(gateway.as_ref(), &settings.registration) => {
            report.context("Failed to list ledger accounts")?
        }
    };
    if !report.is_complete() {
        let failed: Vec<&str> = report.failures.iter().map(|f| f.identity.short()).collect();
        warn!(
            registered = report.registry.len(),
            failed = ?failed,
            "Continuing with a partial oracle roster"
        );
    }
    if report.registry.is_empty() {
        warn!("No oracle agents registered; requests will go unanswered");
    }
    info!(roster = %json_line(&report.registry), "Oracle roster");

    let dispatcher = RequestDispatcher::new(
        gateway,
        Arc::new(report.registry),
        Arc::new(RandomStatusGenerator),
        settings.dispatch,
    );
    let stream = dispatcher
        .subscribe()
        .await
        .context("Failed to subscribe to oracle requests")?;

    let listener = TcpListener::bind(settings.listen)
        .await
        .with_context(|| format!("Failed to bind liveness endpoint {}", settings.listen))?;
    info!(addr = %settings.listen, "Liveness endpoint listening");
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let server = tokio::spawn(liveness::serve(listener, async {
        let _ = stop_rx.await;
    }));

    let summary = dispatcher.run(stream, &mut shutdown).await;

    let _ = stop_tx.send(());
    match server.await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => error!(error = %err, "Liveness endpoint failed"),
        Err(err) => error!(error = %err, "Liveness endpoint task panicked"),
    }
    Ok(summary)
}

/// Compact JSON for a log field.
fn json_line<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|err| format!("<unserializable: {err}>"))
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
