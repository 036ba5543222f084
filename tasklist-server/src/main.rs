//! `tasklist-server`: in-memory tasklist REST API.
//!
//! ```bash
//! # Listen on 127.0.0.1:8080
//! cargo run --bin tasklist-server
//!
//! # Elsewhere, with request logging
//! TASKLIST_SERVER_LOG=debug cargo run --bin tasklist-server -- --bind 0.0.0.0:9090
//! ```
//!
//! Every account, list and task is lost when the process exits.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tasklist_server::config::{ServerCliArgs, ServerConfig};
use tasklist_server::server;
use tasklist_server::store::TodoStore;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = ServerCliArgs::parse();
    let config = match ServerConfig::load(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    run(&config).await
}

async fn run(config: &ServerConfig) -> ExitCode {
    let store = Arc::new(TodoStore::new());
    let (addr, handle) = match server::start_server_with_config(config, store).await {
        Ok(started) => started,
        Err(e) => {
            tracing::error!(addr = %config.bind_addr, error = %e, "cannot bind");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(%addr, "serving tasklist api");

    match handle.await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "server task ended abnormally");
            ExitCode::FAILURE
        }
    }
}
