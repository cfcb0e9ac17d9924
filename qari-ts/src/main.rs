//! qari-ts (Transcription & Scoring) service
//!
//! Accepts recitation uploads over HTTP, stores the audio, drives
//! transcription through an external speech recognition service, and
//! scores transcripts against assignment reference text.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio::signal;
use tracing::info;

use qari_common::config::{default_config_path, load_or_create_toml_config};
use qari_common::events::EventBus;
use qari_ts::config::{ConfigOverrides, ServiceConfig, TomlConfig};
use qari_ts::services::storage::ArtifactStore;
use qari_ts::services::transcriber::TranscriberClient;
use qari_ts::AppState;

/// Pending submissions older than this at startup are failed by the sweep
const STALE_PENDING_MAX_AGE_HOURS: i64 = 1;

/// Recitation transcription and scoring service
#[derive(Parser, Debug)]
#[command(name = "qari-ts", version, about)]
struct Args {
    /// Path to TOML config file
    #[arg(short, long, env = "QARI_TS_CONFIG")]
    config: Option<PathBuf>,

    /// HTTP port override
    #[arg(short, long, env = "QARI_TS_PORT")]
    port: Option<u16>,

    /// Root folder override (database and stored audio)
    #[arg(long, env = "QARI_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Transcription endpoint override
    #[arg(long, env = "QARI_ASR_ENDPOINT")]
    asr_endpoint: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| default_config_path("qari-ts"));
    let toml_config: TomlConfig = load_or_create_toml_config(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let overrides = ConfigOverrides {
        port: args.port,
        root_folder: args.root_folder,
        asr_endpoint: args.asr_endpoint,
    };
    let config = ServiceConfig::resolve(toml_config, overrides);

    // RUST_LOG takes precedence over the configured level
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.log_level.clone())),
        )
        .init();

    info!(
        "Starting qari-ts (Transcription & Scoring) v{}",
        env!("CARGO_PKG_VERSION")
    );
    info!("Configuration: {}", config_path.display());
    info!("Root folder: {}", config.root_folder.display());
    info!("Database: {}", config.database_path.display());
    info!("Transcription endpoint: {}", config.asr_endpoint);

    let db_pool = qari_common::db::init_database(&config.database_path).await?;
    info!("Database connection established");

    // Fail pending rows left behind by a previous run
    let cutoff = chrono::Utc::now() - chrono::Duration::hours(STALE_PENDING_MAX_AGE_HOURS);
    let swept = qari_ts::db::submissions::sweep_stale_pending(&db_pool, cutoff).await?;
    if swept > 0 {
        info!(count = swept, "Swept stale pending submissions to error");
    }

    let event_bus = EventBus::new(100);
    let transcriber = TranscriberClient::new(config.asr_endpoint.clone(), config.asr_timeout)
        .map_err(|e| anyhow::anyhow!("Failed to build transcription client: {}", e))?;
    let artifacts = ArtifactStore::new(config.root_folder.clone());

    let state = AppState::new(db_pool, event_bus, artifacts, transcriber);
    let app = qari_ts::build_router(state);

    let addr = format!("127.0.0.1:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/api/health", addr);

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
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
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
