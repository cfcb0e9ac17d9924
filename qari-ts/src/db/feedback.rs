//! Feedback database operations.
//!
//! One feedback row per submission. Rescoring replaces the values in
//! place rather than stacking rows, and reads take the newest row by
//! `generated_at` as authoritative either way.

use anyhow::Result;
use chrono::{DateTime, Utc};
use qari_common::models::Feedback;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Write feedback for a submission, replacing any previous values.
pub async fn upsert_feedback(
    pool: &SqlitePool,
    submission_id: Uuid,
    accuracy: f64,
    notes: &str,
) -> Result<Feedback> {
    let feedback = Feedback::new(submission_id, accuracy, notes.to_string());

    let updated = sqlx::query(
        r#"
        UPDATE feedback
        SET accuracy = ?, notes = ?, generated_at = ?
        WHERE submission_id = ?
        "#,
    )
    .bind(feedback.accuracy)
    .bind(&feedback.notes)
    .bind(feedback.generated_at.to_rfc3339())
    .bind(submission_id.to_string())
    .execute(pool)
    .await?;

    if updated.rows_affected() == 0 {
        sqlx::query(
            r#"
            INSERT INTO feedback (id, submission_id, accuracy, notes, generated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(feedback.id.to_string())
        .bind(submission_id.to_string())
        .bind(feedback.accuracy)
        .bind(&feedback.notes)
        .bind(feedback.generated_at.to_rfc3339())
        .execute(pool)
        .await?;
    }

    Ok(feedback)
}

/// Load the newest feedback for a submission, if any.
pub async fn load_feedback_for_submission(
    pool: &SqlitePool,
    submission_id: Uuid,
) -> Result<Option<Feedback>> {
    let row = sqlx::query(
        r#"
        SELECT id, submission_id, accuracy, notes, generated_at
        FROM feedback
        WHERE submission_id = ?
        ORDER BY generated_at DESC
        LIMIT 1
        "#,
    )
    .bind(submission_id.to_string())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => {
            let id_str: String = row.get("id");
            let submission_str: String = row.get("submission_id");
            let generated_str: String = row.get("generated_at");

            Ok(Some(Feedback {
                id: Uuid::parse_str(&id_str)?,
                submission_id: Uuid::parse_str(&submission_str)?,
                accuracy: row.get("accuracy"),
                notes: row.get("notes"),
                generated_at: DateTime::parse_from_rfc3339(&generated_str)?.with_timezone(&Utc),
            }))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qari_common::models::Submission;

    async fn test_pool_with_submission() -> (SqlitePool, Uuid) {
        let pool = SqlitePool::connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");
        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&pool)
            .await
            .unwrap();
        qari_common::db::create_all_tables(&pool).await.unwrap();

        let submission = Submission::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "recitations/s/a/1.wav".to_string(),
            "audio/wav".to_string(),
            false,
        );
        crate::db::submissions::insert_submission(&pool, &submission)
            .await
            .unwrap();
        (pool, submission.id)
    }

    #[tokio::test]
    async fn test_upsert_inserts_then_replaces() {
        let (pool, submission_id) = test_pool_with_submission().await;

        upsert_feedback(&pool, submission_id, 0.91, "Very good")
            .await
            .unwrap();
        upsert_feedback(&pool, submission_id, 0.97, "Excellent")
            .await
            .unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM feedback WHERE submission_id = ?")
            .bind(submission_id.to_string())
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);

        let loaded = load_feedback_for_submission(&pool, submission_id)
            .await
            .unwrap()
            .expect("Feedback not found");
        assert!((loaded.accuracy - 0.97).abs() < 1e-9);
        assert_eq!(loaded.notes, "Excellent");
    }

    #[tokio::test]
    async fn test_load_missing_feedback() {
        let (pool, _submission_id) = test_pool_with_submission().await;

        let loaded = load_feedback_for_submission(&pool, Uuid::new_v4())
            .await
            .unwrap();
        assert!(loaded.is_none());
    }
}
