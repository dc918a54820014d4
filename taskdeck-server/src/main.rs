//! `TaskDeck` server -- real-time task tracker backend.
//!
//! Serves the bearer-authenticated WebSocket push channel and the task
//! HTTP API from one process, which owns all live connections and presence
//! state.
//!
//! # Usage
//!
//! ```bash
//! # Run on the default address 0.0.0.0:7180
//! TASKDECK_SECRET=change-me cargo run --bin taskdeck-server
//!
//! # Run on a custom address
//! cargo run --bin taskdeck-server -- --bind 127.0.0.1:8080 --secret change-me
//! ```

use std::sync::Arc;

use clap::Parser;
use taskdeck_server::config::{ServerCliArgs, ServerConfig};
use taskdeck_server::server::{self, AppState};

#[tokio::main]
async fn main() {
    let cli = ServerCliArgs::parse();

    // Load config from CLI args + config file + env vars + defaults.
    let config = match ServerConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            std::process::exit(1);
        }
    };

    // Initialize tracing with the resolved log level.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!(addr = %config.bind_addr, "starting taskdeck server");

    let state = Arc::new(AppState::new(config.secret.as_bytes()));

    match server::start_server_with_state(&config.bind_addr, state).await {
        Ok((bound_addr, handle)) => {
            tracing::info!(addr = %bound_addr, "taskdeck server listening");
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "server task failed");
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to start server");
            std::process::exit(1);
        }
    }
}
