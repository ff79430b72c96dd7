//! PR reviewer assignment API server.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use prr_api::{
    api,
    config::{Config, LogFormat},
    db::Database,
    state::AppState,
    store::{memory::MemoryStore, Store},
};
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "pr-reviewer-api", version, about = "PR reviewer assignment API server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the HTTP API (default).
    Serve {
        /// Keep all state in process memory instead of Postgres.
        #[arg(long)]
        in_memory: bool,
    },
    /// Apply pending database migrations and exit.
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    // RUST_LOG wins over PRR_LOG_LEVEL
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_level.clone().into());
    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer().pretty()).init(),
    }

    match cli.command.unwrap_or(Command::Serve { in_memory: false }) {
        Command::Serve { in_memory } => serve(config, in_memory).await,
        Command::Migrate => migrate(&config).await,
    }
}

async fn connect(config: &Config) -> Result<Database> {
    match Database::connect(&config.database).await {
        Ok(db) => Ok(db),
        Err(e) => {
            error!(error = %e, "Failed to connect to database");
            Err(e.into())
        }
    }
}

async fn migrate(config: &Config) -> Result<()> {
    let db = connect(config).await?;
    if let Err(e) = db.run_migrations().await {
        error!(error = %e, "Failed to run migrations");
        return Err(e.into());
    }
    Ok(())
}

async fn serve(config: Config, in_memory: bool) -> Result<()> {
    info!(
        listen_addr = %config.listen_addr,
        max_reviewers = config.service.max_reviewers,
        op_timeout_ms = config.service.op_timeout.as_millis() as u64,
        "Starting PR reviewer API"
    );

    let store: Arc<dyn Store> = if in_memory {
        warn!("Using in-memory store; all data is lost on exit");
        Arc::new(MemoryStore::new())
    } else {
        let db = connect(&config).await?;
        if config.run_migrations {
            if let Err(e) = db.run_migrations().await {
                error!(error = %e, "Failed to run migrations");
                return Err(e.into());
            }
        }
        Arc::new(db.store())
    };

    let state = AppState::new(store, &config.service);
    let app = api::create_router(state);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!(addr = %config.listen_addr, "Listening for connections");

    let mut server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let mut shutdown_rx = shutdown_rx;
                loop {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                    if shutdown_rx.changed().await.is_err() {
                        break;
                    }
                }
                info!("HTTP server shutting down");
            })
            .await
    });

    let server_finished = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
            false
        }
        result = &mut server_handle => {
            match result {
                Ok(Ok(())) => info!("Server exited normally"),
                Ok(Err(e)) => error!(error = %e, "Server error"),
                Err(e) => error!(error = %e, "Server task panicked"),
            }
            true
        }
    };

    let _ = shutdown_tx.send(true);

    if !server_finished {
        let drain_timeout = Duration::from_secs(10);
        if tokio::time::timeout(drain_timeout, server_handle).await.is_err() {
            warn!("Server did not drain connections in time");
        }
    }

    info!("Shutdown complete");
    Ok(())
}
