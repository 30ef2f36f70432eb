//! Route Lab - pass-play simulation server
//!
//! This is the main entry point. It handles:
//! - WebSocket sessions streaming live play frames at 60 Hz
//! - HTTP endpoints for formations, defensive looks, headless runs and SVG renders
//! - A `health` subcommand that checks a running server

mod app;
mod client;
mod config;
mod http;
mod render;
mod session;
mod sim;
mod util;
mod ws;

use std::net::SocketAddr;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::app::AppState;
use crate::client::HealthClient;
use crate::config::Config;
use crate::http::build_router;
use crate::util::time::init_server_time;

#[derive(Debug, Parser)]
#[command(name = "route_lab", version, about)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON", global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP and WebSocket server (default)
    Serve,
    /// Query a running server's /health endpoint and print the result
    Health {
        /// Overrides API_BASE_URL
        #[arg(long)]
        base_url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    init_tracing(&config.log_level, cli.json_logs);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Health { base_url } => health(&config, base_url.as_deref()).await,
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    init_server_time();

    info!("Starting Route Lab server");
    info!("Server address: {}", config.server_addr);

    let addr: SocketAddr = config.server_addr;
    let state = AppState::new(config);
    let router = build_router(state);

    let listener = TcpListener::bind(addr).await?;

    info!("Server listening on {}", addr);
    info!("Health check: http://{}/health", addr);
    info!("WebSocket endpoint: ws://{}/ws", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn health(config: &Config, base_url: Option<&str>) -> anyhow::Result<()> {
    let client = match base_url {
        Some(url) => HealthClient::new(url),
        None => HealthClient::from_config(config),
    };
    info!(base_url = client.base_url(), "Checking server health");

    let body = client.health_check().await?;
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str, json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    // stdout is reserved for command output
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        }
    }
}
