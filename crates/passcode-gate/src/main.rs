//! # Passcode Gate - OTP issuance and verification service
//!
//! Issues four digit one-time passcodes by mail and verifies them, enforcing
//! cooldown, request throttling, and brute-force lockout.
//!
//! ## Architecture
//! ```text
//! Client → Passcode Gate → Notifier (log / Redis outbox → mailer)
//!                ↓
//!          Redis (all OTP state, TTL-expired)
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod accounts;
mod config;
mod notify;
mod otp;
mod routes;
mod state;
mod store;

use config::{AppConfig, NotifierBackend, StoreBackend};
use state::AppState;

/// Passcode Gate - one-time passcode service
#[derive(Parser, Debug)]
#[command(name = "passcode-gate")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/passcode-gate.toml")]
    config: String,

    /// Redis URL (overrides config)
    #[arg(long, env = "REDIS_URL")]
    redis_url: Option<String>,

    /// Listen address (overrides config)
    #[arg(short, long, env = "LISTEN_ADDR")]
    listen: Option<String>,

    /// State backend (overrides config)
    #[arg(long, value_enum, env = "OTP_STORE")]
    store: Option<StoreBackend>,

    /// Delivery backend (overrides config)
    #[arg(long, value_enum, env = "OTP_NOTIFIER")]
    notifier: Option<NotifierBackend>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "LOG_LEVEL")]
    log_level: String,

    /// Enable JSON logging output
    #[arg(long, default_value = "false")]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Pick up a local .env before reading env-backed arguments
    dotenvy::dotenv().ok();

    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(&args.log_level, args.json_logs)?;

    info!("Starting Passcode Gate v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::load(&args.config, &args)?;
    info!(
        store = ?config.store,
        notifier = ?config.notifier,
        "Configuration loaded from {}",
        args.config
    );

    // Initialize application state
    let state = AppState::new(config.clone()).await?;
    if config.store == StoreBackend::Redis {
        info!("Redis connected: {}", config.redis_url);
    }

    // Build router
    let app = routes::create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;
    info!("Passcode Gate listening on {}", config.listen_addr);

    // Handle graceful shutdown
    let shutdown_signal = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .context("Server error")?;

    info!("Passcode Gate shutdown complete");
    Ok(())
}

/// Initialize structured logging with tracing
fn init_logging(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
            .context("Failed to initialize logging")?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_thread_ids(true))
            .try_init()
            .context("Failed to initialize logging")?;
    }

    Ok(())
}
