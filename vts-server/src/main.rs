//! Violation tracking service - main entry point

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vts_common::config::{self, CliOverrides};
use vts_common::events::EventBus;

use vts_server::{build_router, db, AppState};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "vts-server")]
#[command(about = "Traffic violation record-keeping service")]
#[command(version)]
struct Args {
    /// Host to bind
    #[arg(long, env = "VTS_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "VTS_PORT")]
    port: Option<u16>,

    /// Directory holding the SQLite database
    #[arg(long, env = "VTS_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Seed the default section/offense/fine catalog on startup
    #[arg(long)]
    seed: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vts_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let config = config::resolve(&CliOverrides {
        host: args.host,
        port: args.port,
        data_dir: args.data_dir,
    });
    config
        .ensure_data_dir()
        .context("Failed to create data directory")?;

    info!("Data directory: {}", config.data_dir.display());

    let pool = db::init_database(&config.database_path())
        .await
        .context("Failed to initialize database")?;

    if args.seed {
        let summary = db::catalog::seed_catalog(&pool)
            .await
            .context("Failed to seed catalog")?;
        info!(
            sections = summary.sections,
            offenses = summary.offenses,
            fines = summary.fines,
            "Catalog seeded"
        );
    }

    let event_bus = EventBus::new(100);
    let app = build_router(AppState::new(pool, event_bus));

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;
    info!("HTTP server listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => tracing::error!("Failed to install signal handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
