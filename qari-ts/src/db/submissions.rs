//! Submission database operations.
//!
//! A submission row is the durable record of one uploaded recitation.
//! The newest row for an (assignment, student) pair carries
//! `is_latest = 1`; older rows are kept for history but flagged 0.
//! The flip and the insert happen in one transaction so the pair never
//! has two latest rows, even under concurrent uploads.

use anyhow::Result;
use chrono::{DateTime, Utc};
use qari_common::models::{Submission, TranscriptionStatus};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

fn submission_from_row(row: &SqliteRow) -> Result<Submission> {
    let id_str: String = row.get("id");
    let assignment_str: String = row.get("assignment_id");
    let student_str: String = row.get("student_id");
    let submitted_str: String = row.get("submitted_at");
    let status_str: String = row.get("transcription_status");

    let transcription_status = TranscriptionStatus::parse(&status_str)
        .ok_or_else(|| anyhow::anyhow!("invalid transcription_status: {}", status_str))?;

    Ok(Submission {
        id: Uuid::parse_str(&id_str)?,
        assignment_id: Uuid::parse_str(&assignment_str)?,
        student_id: Uuid::parse_str(&student_str)?,
        audio_path: row.get("audio_path"),
        content_type: row.get("content_type"),
        submitted_at: DateTime::parse_from_rfc3339(&submitted_str)?.with_timezone(&Utc),
        is_latest: row.get::<i64, _>("is_latest") != 0,
        is_late: row.get::<i64, _>("is_late") != 0,
        transcription: row.get("transcription"),
        transcription_status,
        transcription_error: row.get("transcription_error"),
        progress: row.get("progress"),
    })
}

/// Insert a new submission and make it the latest for its pair.
///
/// Clears `is_latest` on any previous row for the same
/// (assignment_id, student_id) in the same transaction as the insert.
pub async fn insert_submission(pool: &SqlitePool, submission: &Submission) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        UPDATE submissions
        SET is_latest = 0, updated_at = CURRENT_TIMESTAMP
        WHERE assignment_id = ? AND student_id = ? AND is_latest = 1
        "#,
    )
    .bind(submission.assignment_id.to_string())
    .bind(submission.student_id.to_string())
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO submissions (
            id, assignment_id, student_id, audio_path, content_type,
            submitted_at, is_latest, is_late,
            transcription, transcription_status, transcription_error, progress
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(submission.id.to_string())
    .bind(submission.assignment_id.to_string())
    .bind(submission.student_id.to_string())
    .bind(&submission.audio_path)
    .bind(&submission.content_type)
    .bind(submission.submitted_at.to_rfc3339())
    .bind(submission.is_latest as i64)
    .bind(submission.is_late as i64)
    .bind(&submission.transcription)
    .bind(submission.transcription_status.as_str())
    .bind(&submission.transcription_error)
    .bind(&submission.progress)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

/// Load a submission by id
pub async fn load_submission(pool: &SqlitePool, id: Uuid) -> Result<Option<Submission>> {
    let row = sqlx::query("SELECT * FROM submissions WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => Ok(Some(submission_from_row(&row)?)),
        None => Ok(None),
    }
}

/// Load submissions for an assignment, newest first.
///
/// Optionally restricted to a single student.
pub async fn load_submissions_for_assignment(
    pool: &SqlitePool,
    assignment_id: Uuid,
    student_id: Option<Uuid>,
) -> Result<Vec<Submission>> {
    let rows = match student_id {
        Some(student_id) => {
            sqlx::query(
                r#"
                SELECT * FROM submissions
                WHERE assignment_id = ? AND student_id = ?
                ORDER BY submitted_at DESC
                "#,
            )
            .bind(assignment_id.to_string())
            .bind(student_id.to_string())
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query(
                r#"
                SELECT * FROM submissions
                WHERE assignment_id = ?
                ORDER BY submitted_at DESC
                "#,
            )
            .bind(assignment_id.to_string())
            .fetch_all(pool)
            .await?
        }
    };

    let mut submissions = Vec::new();
    for row in rows {
        submissions.push(submission_from_row(&row)?);
    }
    Ok(submissions)
}

/// Record a progress checkpoint while transcription is running.
///
/// Only touches rows still in `pending` so a late checkpoint can never
/// overwrite a terminal outcome.
pub async fn update_progress(pool: &SqlitePool, id: Uuid, progress: &str) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE submissions
        SET progress = ?, updated_at = CURRENT_TIMESTAMP
        WHERE id = ? AND transcription_status = 'pending'
        "#,
    )
    .bind(progress)
    .bind(id.to_string())
    .execute(pool)
    .await?;

    Ok(())
}

/// Persist a successful transcript and mark the submission completed.
///
/// The pending guard makes terminal states final: a second terminal
/// write is a no-op.
pub async fn complete_transcription(pool: &SqlitePool, id: Uuid, transcript: &str) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE submissions
        SET transcription = ?,
            transcription_status = 'completed',
            progress = NULL,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = ? AND transcription_status = 'pending'
        "#,
    )
    .bind(transcript)
    .bind(id.to_string())
    .execute(pool)
    .await?;

    Ok(())
}

/// Record a terminal transcription failure.
pub async fn fail_transcription(pool: &SqlitePool, id: Uuid, error: &str) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE submissions
        SET transcription_error = ?,
            transcription_status = 'error',
            progress = NULL,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = ? AND transcription_status = 'pending'
        "#,
    )
    .bind(error)
    .bind(id.to_string())
    .execute(pool)
    .await?;

    Ok(())
}

/// Fail pending submissions older than the cutoff.
///
/// Run at startup: a submission still pending from before the last
/// shutdown will never get its transcription task back, so it is moved
/// to a terminal error instead of hanging forever. Returns the number
/// of rows swept.
pub async fn sweep_stale_pending(pool: &SqlitePool, cutoff: DateTime<Utc>) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE submissions
        SET transcription_status = 'error',
            transcription_error = 'transcription interrupted by service restart',
            progress = NULL,
            updated_at = CURRENT_TIMESTAMP
        WHERE transcription_status = 'pending' AND submitted_at < ?
        "#,
    )
    .bind(cutoff.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
