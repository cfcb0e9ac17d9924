//! Assignment endpoints.
//!
//! Assignments are owned by an external gradebook; it pushes the fields
//! this pipeline needs (title, reference text, due date) and nothing
//! else about them lives here.

use axum::extract::{Path, State};
use axum::routing::put;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use qari_common::models::Assignment;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::{db, AppState};

/// Request body for assignment upsert
#[derive(Debug, Deserialize)]
pub struct UpsertAssignmentRequest {
    pub title: String,
    #[serde(default)]
    pub target_text: Option<String>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
}

/// PUT /api/assignments/:id - create or update an assignment
pub async fn put_assignment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpsertAssignmentRequest>,
) -> ApiResult<Json<Assignment>> {
    if request.title.trim().is_empty() {
        return Err(ApiError::BadRequest("title must not be empty".to_string()));
    }

    let existing = db::assignments::load_assignment(&state.db, id).await?;
    let created_at = existing.map(|a| a.created_at).unwrap_or_else(Utc::now);

    let assignment = Assignment {
        id,
        title: request.title,
        target_text: request.target_text,
        due_date: request.due_date,
        created_at,
        updated_at: Utc::now(),
    };

    db::assignments::upsert_assignment(&state.db, &assignment).await?;
    info!(assignment_id = %id, "Stored assignment");

    Ok(Json(assignment))
}

/// GET /api/assignments/:id
pub async fn get_assignment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Assignment>> {
    let assignment = db::assignments::load_assignment(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Assignment not found: {}", id)))?;

    Ok(Json(assignment))
}

/// Build assignment routes
pub fn assignment_routes() -> Router<AppState> {
    Router::new().route(
        "/api/assignments/:id",
        put(put_assignment).get(get_assignment),
    )
}
