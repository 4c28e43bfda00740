//! Codeflow CI controller.
//!
//! Receives source-control, build and schedule events, starts CodeBuild
//! jobs for them and reports build status back to CodeCommit pull requests.
//!
//! `serve` exposes the four entry points over HTTP; `invoke` runs a single
//! event from a file or stdin and prints the outcome.

mod aws;
mod config;
mod invocation;
mod metrics;
mod routes;

use std::io::Read;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use ci_flow::{Dispatcher, EntryPoint, EventEnvelope};

use crate::aws::services::{CloudWatchLogsClient, CodeBuildClient, CodeCommitClient};
use crate::config::{FlowConfig, LogLevel};

#[derive(Parser)]
#[command(name = "codeflow-ci", about = "Codeflow CI event controller")]
struct Cli {
    /// Server port
    #[arg(short, long, env = "CI_PORT", default_value = "9090", global = true)]
    port: u16,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the entry points over HTTP
    Serve,
    /// Handle one event and print the outcome as JSON
    Invoke {
        /// Entry point: review, branch, tag or schedule
        #[arg(long)]
        entry: EntryPoint,

        /// Event file (reads stdin when omitted)
        #[arg(long)]
        event: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing. RUST_LOG wins over LOG_LEVEL.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| LogLevel::from_env().as_filter().into());
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    if log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    let cli = Cli::parse();
    let config = FlowConfig::from_env()?;
    tracing::debug!(
        log_level = ?config.log_level,
        region = %config.aws.region,
        "Configuration loaded"
    );
    let dispatcher = Arc::new(build_dispatcher(&config)?);

    match cli.command {
        Command::Serve => serve(dispatcher, cli.port).await,
        Command::Invoke { entry, event } => invoke(&dispatcher, entry, event).await,
    }
}

fn build_dispatcher(config: &FlowConfig) -> anyhow::Result<Dispatcher> {
    let http = reqwest::Client::builder()
        .timeout(config.aws.request_timeout)
        .user_agent(concat!("codeflow-ci/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("building HTTP client")?;

    Ok(Dispatcher::new(
        config.project_name.clone(),
        Arc::new(CodeBuildClient::new(http.clone(), &config.aws)?),
        Arc::new(CodeCommitClient::new(http.clone(), &config.aws)?),
        Arc::new(CloudWatchLogsClient::new(http, &config.aws)?),
    ))
}

async fn serve(dispatcher: Arc<Dispatcher>, port: u16) -> anyhow::Result<()> {
    tracing::info!(project = %dispatcher.project_name(), "Starting Codeflow CI controller...");

    let app = routes::router(routes::AppState { dispatcher });

    // Initialize metrics
    metrics::init_metrics();

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Codeflow CI controller listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn invoke(
    dispatcher: &Dispatcher,
    entry: EntryPoint,
    event: Option<PathBuf>,
) -> anyhow::Result<()> {
    let raw = match &event {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading event from {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading event from stdin")?;
            buf
        }
    };

    let value: serde_json::Value = serde_json::from_str(&raw).context("event is not valid JSON")?;
    let envelope = EventEnvelope::from_value(value)?;

    let outcome = invocation::invoke(dispatcher, entry, &envelope).await?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
