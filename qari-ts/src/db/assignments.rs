//! Assignment database operations.
//!
//! Assignments are owned by an external gradebook; this service stores
//! the subset it needs (title, reference text, due date) and upserts
//! whatever the collaborator pushes.

use anyhow::Result;
use chrono::{DateTime, Utc};
use qari_common::models::Assignment;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Insert or update an assignment.
///
/// Timestamps are bound explicitly as RFC 3339 so reads can parse them.
pub async fn upsert_assignment(pool: &SqlitePool, assignment: &Assignment) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO assignments (id, title, target_text, due_date, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            title = excluded.title,
            target_text = excluded.target_text,
            due_date = excluded.due_date,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(assignment.id.to_string())
    .bind(&assignment.title)
    .bind(&assignment.target_text)
    .bind(assignment.due_date.map(|d| d.to_rfc3339()))
    .bind(assignment.created_at.to_rfc3339())
    .bind(assignment.updated_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Load an assignment by id
pub async fn load_assignment(pool: &SqlitePool, id: Uuid) -> Result<Option<Assignment>> {
    let row = sqlx::query(
        r#"
        SELECT id, title, target_text, due_date, created_at, updated_at
        FROM assignments
        WHERE id = ?
        "#,
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => {
            let id_str: String = row.get("id");
            let due_date_str: Option<String> = row.get("due_date");
            let created_str: String = row.get("created_at");
            let updated_str: String = row.get("updated_at");

            let due_date = match due_date_str {
                Some(s) => Some(DateTime::parse_from_rfc3339(&s)?.with_timezone(&Utc)),
                None => None,
            };

            Ok(Some(Assignment {
                id: Uuid::parse_str(&id_str)?,
                title: row.get("title"),
                target_text: row.get("target_text"),
                due_date,
                created_at: DateTime::parse_from_rfc3339(&created_str)?.with_timezone(&Utc),
                updated_at: DateTime::parse_from_rfc3339(&updated_str)?.with_timezone(&Utc),
            }))
        }
        None => Ok(None),
    }
}
