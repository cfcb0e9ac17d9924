//! Accuracy scoring against assignment reference text.
//!
//! Runs after a transcript is persisted. Normalization plus similarity
//! live in `qari_common::text`; this module wires them to the database
//! and the event bus.

use anyhow::Result;
use chrono::Utc;
use qari_common::events::{EventBus, RecitationEvent};
use qari_common::models::Feedback;
use qari_common::text;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::db;

/// Note recorded when the assignment carries no reference text
pub const SCORING_SKIPPED_NOTE: &str = "Scoring skipped: no reference text for this assignment";

/// Score a transcript against its assignment's reference text.
///
/// Writes (or replaces) the feedback row and emits `FeedbackReady`.
/// Without reference text the submission still gets a feedback row, at
/// accuracy 0.0 with an explanatory note, so clients never distinguish
/// "unscored" from "not yet scored" by absence.
pub async fn score_submission(
    pool: &SqlitePool,
    event_bus: &EventBus,
    submission_id: Uuid,
    assignment_id: Uuid,
    transcript: &str,
) -> Result<Feedback> {
    let assignment = db::assignments::load_assignment(pool, assignment_id).await?;
    let target_text = assignment.and_then(|a| a.target_text);

    let (accuracy, notes) = match target_text {
        Some(reference) if !reference.trim().is_empty() => {
            let accuracy = text::score_transcript(transcript, &reference);
            (accuracy, text::accuracy_band(accuracy).to_string())
        }
        _ => {
            info!(
                submission_id = %submission_id,
                "No reference text for assignment, recording unscored feedback"
            );
            (0.0, SCORING_SKIPPED_NOTE.to_string())
        }
    };

    let feedback = db::feedback::upsert_feedback(pool, submission_id, accuracy, &notes).await?;

    event_bus.emit_lossy(RecitationEvent::FeedbackReady {
        submission_id,
        accuracy,
        notes: notes.clone(),
        timestamp: Utc::now(),
    });

    info!(submission_id = %submission_id, accuracy = accuracy, "Feedback recorded");
    Ok(feedback)
}
