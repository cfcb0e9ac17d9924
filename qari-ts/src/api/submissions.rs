//! Recitation submission endpoints.
//!
//! POST accepts the upload, persists everything durable (audio artifact
//! and submission row), then returns 202 while transcription and scoring
//! continue in a background task. The GET endpoints are the read surface
//! clients poll alongside the SSE stream.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use qari_common::events::RecitationEvent;
use qari_common::models::{Feedback, Submission, TranscriptionStatus};
use qari_common::{deadline, media, text};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::{db, services, AppState};

/// Response for an accepted upload
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub submission_id: Uuid,
    pub audio_url: String,
}

/// Submission as returned by the read endpoints
#[derive(Debug, Serialize)]
pub struct SubmissionResponse {
    pub id: Uuid,
    pub assignment_id: Uuid,
    pub student_id: Uuid,
    pub audio_url: String,
    pub content_type: String,
    pub submitted_at: DateTime<Utc>,
    pub is_latest: bool,
    pub is_late: bool,
    pub transcription: Option<String>,
    pub transcription_status: TranscriptionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcription_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<FeedbackResponse>,
}

/// Feedback as embedded in submission responses
#[derive(Debug, Serialize)]
pub struct FeedbackResponse {
    pub accuracy: f64,
    pub notes: String,
    pub generated_at: DateTime<Utc>,
}

impl From<Feedback> for FeedbackResponse {
    fn from(feedback: Feedback) -> Self {
        Self {
            accuracy: feedback.accuracy,
            notes: feedback.notes,
            generated_at: feedback.generated_at,
        }
    }
}

impl SubmissionResponse {
    fn from_parts(submission: Submission, feedback: Option<Feedback>) -> Self {
        Self {
            id: submission.id,
            assignment_id: submission.assignment_id,
            student_id: submission.student_id,
            audio_url: format!("/media/{}", submission.audio_path),
            content_type: submission.content_type,
            submitted_at: submission.submitted_at,
            is_latest: submission.is_latest,
            is_late: submission.is_late,
            transcription: submission.transcription,
            transcription_status: submission.transcription_status,
            transcription_error: submission.transcription_error,
            progress: submission.progress,
            feedback: feedback.map(FeedbackResponse::from),
        }
    }
}

/// POST /api/recitations - accept a recitation upload
///
/// Multipart form with `assignment_id`, `student_id`, and `file` fields.
/// Recorded and imported audio take this same path; the server does not
/// care which client produced the bytes.
pub async fn submit_recitation(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let mut assignment_id: Option<Uuid> = None;
    let mut student_id: Option<Uuid> = None;
    let mut declared_type: Option<String> = None;
    let mut file_bytes: Option<axum::body::Bytes> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart request: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "assignment_id" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Invalid assignment_id: {}", e)))?;
                assignment_id = Some(parse_uuid_field("assignment_id", &value)?);
            }
            "student_id" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Invalid student_id: {}", e)))?;
                student_id = Some(parse_uuid_field("student_id", &value)?);
            }
            "file" => {
                declared_type = field.content_type().map(|s| s.to_string());
                file_bytes = Some(field.bytes().await.map_err(|e| {
                    ApiError::BadRequest(format!("Failed to read audio field: {}", e))
                })?);
            }
            _ => {
                // Unknown fields are ignored
            }
        }
    }

    let assignment_id =
        assignment_id.ok_or_else(|| ApiError::BadRequest("Missing assignment_id".to_string()))?;
    let student_id =
        student_id.ok_or_else(|| ApiError::BadRequest("Missing student_id".to_string()))?;
    let file_bytes =
        file_bytes.ok_or_else(|| ApiError::BadRequest("Missing file field".to_string()))?;

    if file_bytes.is_empty() {
        return Err(ApiError::BadRequest("Uploaded audio is empty".to_string()));
    }
    if file_bytes.len() > media::MAX_UPLOAD_BYTES {
        return Err(ApiError::BadRequest(format!(
            "Uploaded audio is {} bytes; the limit is {} bytes",
            file_bytes.len(),
            media::MAX_UPLOAD_BYTES
        )));
    }

    // Declared content type wins; fall back to sniffing the bytes when the
    // client sent nothing usable.
    let content_type = declared_type
        .as_deref()
        .and_then(media::canonical_mime)
        .or_else(|| infer::get(&file_bytes).and_then(|kind| media::canonical_mime(kind.mime_type())))
        .ok_or_else(|| {
            ApiError::BadRequest(format!(
                "Unsupported audio type: {}",
                declared_type.as_deref().unwrap_or("unknown")
            ))
        })?;
    let extension = media::extension_for_mime(content_type);

    let assignment = db::assignments::load_assignment(&state.db, assignment_id).await?;
    let due_date = assignment.as_ref().and_then(|a| a.due_date);

    let audio_path = state
        .artifacts
        .store(student_id, assignment_id, extension, &file_bytes)
        .await?;

    let mut submission = Submission::new(
        assignment_id,
        student_id,
        audio_path,
        content_type.to_string(),
        false,
    );
    submission.is_late = deadline::is_late(submission.submitted_at, due_date);

    db::submissions::insert_submission(&state.db, &submission).await?;

    info!(
        submission_id = %submission.id,
        assignment_id = %assignment_id,
        student_id = %student_id,
        bytes = file_bytes.len(),
        content_type = content_type,
        is_late = submission.is_late,
        "Accepted recitation submission"
    );

    state.event_bus.emit_lossy(RecitationEvent::SubmissionReceived {
        submission_id: submission.id,
        assignment_id,
        student_id,
        is_late: submission.is_late,
        timestamp: Utc::now(),
    });

    // Transcription and scoring continue without the client
    let task_state = state.clone();
    let submission_id = submission.id;
    tokio::spawn(services::orchestrator::run_transcription(
        task_state,
        submission_id,
    ));

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitResponse {
            submission_id: submission.id,
            audio_url: format!("/media/{}", submission.audio_path),
        }),
    ))
}

fn parse_uuid_field(field: &str, value: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(value.trim())
        .map_err(|_| ApiError::BadRequest(format!("{} is not a valid UUID: {}", field, value)))
}

/// GET /api/recitations/:id - submission status with latest feedback
pub async fn get_recitation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SubmissionResponse>> {
    let submission = db::submissions::load_submission(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Submission not found: {}", id)))?;

    let feedback = db::feedback::load_feedback_for_submission(&state.db, id).await?;

    Ok(Json(SubmissionResponse::from_parts(submission, feedback)))
}

/// Query parameters for the assignment submission listing
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub student_id: Option<Uuid>,
}

/// GET /api/assignments/:id/recitations - submissions for an assignment
///
/// Newest first, optionally filtered to one student.
pub async fn list_recitations(
    State(state): State<AppState>,
    Path(assignment_id): Path<Uuid>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<SubmissionResponse>>> {
    let submissions =
        db::submissions::load_submissions_for_assignment(&state.db, assignment_id, query.student_id)
            .await?;

    let mut responses = Vec::with_capacity(submissions.len());
    for submission in submissions {
        let feedback = db::feedback::load_feedback_for_submission(&state.db, submission.id).await?;
        responses.push(SubmissionResponse::from_parts(submission, feedback));
    }

    Ok(Json(responses))
}

/// Request body for a manual rescore
#[derive(Debug, Deserialize)]
pub struct RescoreRequest {
    pub accuracy: f64,
    #[serde(default)]
    pub notes: Option<String>,
}

/// POST /api/recitations/:id/rescore - teacher override of the accuracy
///
/// Only completed submissions can be rescored; a pending one is still in
/// flight and a failed one has no transcript to score against.
pub async fn rescore_recitation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<RescoreRequest>,
) -> ApiResult<Json<FeedbackResponse>> {
    if !(0.0..=1.0).contains(&request.accuracy) {
        return Err(ApiError::BadRequest(format!(
            "accuracy must be within [0, 1], got {}",
            request.accuracy
        )));
    }

    let submission = db::submissions::load_submission(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Submission not found: {}", id)))?;

    if submission.transcription_status != TranscriptionStatus::Completed {
        return Err(ApiError::Conflict(format!(
            "Cannot rescore a submission in status '{}'",
            submission.transcription_status
        )));
    }

    let notes = request
        .notes
        .unwrap_or_else(|| text::accuracy_band(request.accuracy).to_string());

    let feedback = db::feedback::upsert_feedback(&state.db, id, request.accuracy, &notes).await?;

    state.event_bus.emit_lossy(RecitationEvent::FeedbackReady {
        submission_id: id,
        accuracy: feedback.accuracy,
        notes: feedback.notes.clone(),
        timestamp: Utc::now(),
    });

    info!(submission_id = %id, accuracy = request.accuracy, "Rescored submission");

    Ok(Json(FeedbackResponse::from(feedback)))
}

/// Build submission routes
pub fn submission_routes() -> Router<AppState> {
    Router::new()
        .route("/api/recitations", post(submit_recitation))
        .route("/api/recitations/:id", get(get_recitation))
        .route("/api/recitations/:id/rescore", post(rescore_recitation))
        .route("/api/assignments/:id/recitations", get(list_recitations))
}
