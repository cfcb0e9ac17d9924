//! qari-ts library interface
//!
//! Exposes the router and application state for integration testing.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use qari_common::events::EventBus;
use services::storage::ArtifactStore;
use services::transcriber::TranscriberClient;
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

/// Request body cap: the audio limit plus multipart framing overhead
const MAX_REQUEST_BYTES: usize = qari_common::media::MAX_UPLOAD_BYTES + 512 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Artifact store rooted at the configured root folder
    pub artifacts: ArtifactStore,
    /// Client for the speech recognition service
    pub transcriber: TranscriberClient,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        event_bus: EventBus,
        artifacts: ArtifactStore,
        transcriber: TranscriberClient,
    ) -> Self {
        Self {
            db,
            event_bus,
            artifacts,
            transcriber,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
///
/// Stored audio is served read-only under `/media`, mirroring the
/// relative keys kept in submission rows.
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    let media_dir = ServeDir::new(state.artifacts.root());

    Router::new()
        .merge(api::submission_routes())
        .merge(api::assignment_routes())
        .route("/api/events", get(api::event_stream))
        .merge(api::health_routes())
        .nest_service("/media", media_dir)
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
