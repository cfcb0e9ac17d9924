//! Transcription orchestration.
//!
//! One background task per accepted submission: read the stored audio,
//! call the transcription service once, persist the outcome, then score.
//! There are no retries at this layer; the student resubmits instead.

use chrono::Utc;
use qari_common::events::RecitationEvent;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::db;
use crate::services::scoring;
use crate::AppState;

const PROGRESS_READING: &str = "reading stored audio";
const PROGRESS_TRANSCRIBING: &str = "calling transcription service";
const PROGRESS_SCORING: &str = "scoring transcript";

/// Run the transcription pipeline for one submission.
///
/// Spawned from the upload handler. Every failure path lands in the
/// submission row, so nothing propagates back out of the task.
pub async fn run_transcription(state: AppState, submission_id: Uuid) {
    if let Err(e) = transcribe_and_score(&state, submission_id).await {
        error!(
            submission_id = %submission_id,
            error = %e,
            "Transcription pipeline error"
        );
    }
}

async fn transcribe_and_score(state: &AppState, submission_id: Uuid) -> anyhow::Result<()> {
    let Some(submission) = db::submissions::load_submission(&state.db, submission_id).await? else {
        warn!(submission_id = %submission_id, "Submission vanished before transcription");
        return Ok(());
    };

    state
        .event_bus
        .emit_lossy(RecitationEvent::TranscriptionStarted {
            submission_id,
            timestamp: Utc::now(),
        });

    db::submissions::update_progress(&state.db, submission_id, PROGRESS_READING).await?;
    let audio = match state.artifacts.read(&submission.audio_path).await {
        Ok(audio) => audio,
        Err(e) => {
            return fail(state, submission_id, &format!("stored audio unreadable: {}", e)).await;
        }
    };

    db::submissions::update_progress(&state.db, submission_id, PROGRESS_TRANSCRIBING).await?;
    let transcript = match state
        .transcriber
        .transcribe(audio, &submission.content_type)
        .await
    {
        Ok(transcript) => transcript,
        Err(e) => return fail(state, submission_id, &e.to_string()).await,
    };

    db::submissions::update_progress(&state.db, submission_id, PROGRESS_SCORING).await?;
    db::submissions::complete_transcription(&state.db, submission_id, &transcript).await?;

    state
        .event_bus
        .emit_lossy(RecitationEvent::TranscriptionCompleted {
            submission_id,
            timestamp: Utc::now(),
        });

    scoring::score_submission(
        &state.db,
        &state.event_bus,
        submission_id,
        submission.assignment_id,
        &transcript,
    )
    .await?;

    info!(submission_id = %submission_id, "Transcription pipeline finished");
    Ok(())
}

/// Record a terminal failure and emit the matching event.
async fn fail(state: &AppState, submission_id: Uuid, error: &str) -> anyhow::Result<()> {
    warn!(submission_id = %submission_id, error = error, "Transcription failed");

    db::submissions::fail_transcription(&state.db, submission_id, error).await?;

    state
        .event_bus
        .emit_lossy(RecitationEvent::TranscriptionFailed {
            submission_id,
            error: error.to_string(),
            timestamp: Utc::now(),
        });

    Ok(())
}
