//! Database initialization
//!
//! Creates the database on first run and brings the schema up idempotently
//! on every startup. All table creation is CREATE TABLE IF NOT EXISTS, safe
//! to call repeatedly.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Schema version stamped into new databases
pub const SCHEMA_VERSION: i64 = 1;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    configure_connection(&pool).await?;
    create_all_tables(&pool).await?;

    Ok(pool)
}

/// Apply connection pragmas: foreign keys, WAL for concurrent readers
/// during orchestrator writes, and a busy timeout so handler and
/// orchestrator writes queue instead of failing.
async fn configure_connection(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;
    sqlx::query("PRAGMA journal_mode = WAL").execute(pool).await?;
    sqlx::query("PRAGMA busy_timeout = 5000").execute(pool).await?;
    Ok(())
}

/// Create all tables (idempotent)
pub async fn create_all_tables(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    create_assignments_table(pool).await?;
    create_submissions_table(pool).await?;
    create_feedback_table(pool).await?;

    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(SCHEMA_VERSION)
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the assignments table
///
/// Minimal collaborator surface: the pipeline reads `target_text` for
/// scoring and `due_date` for the late-submission rule.
pub async fn create_assignments_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS assignments (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            target_text TEXT,
            due_date TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the submissions table
///
/// One row per recording attempt. `is_latest` is maintained by the insert
/// transaction; `progress` holds orchestrator checkpoints and is distinct
/// from the terminal `transcription_error`.
pub async fn create_submissions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS submissions (
            id TEXT PRIMARY KEY,
            assignment_id TEXT NOT NULL,
            student_id TEXT NOT NULL,
            audio_path TEXT NOT NULL,
            content_type TEXT NOT NULL,
            submitted_at TEXT NOT NULL,
            is_latest INTEGER NOT NULL DEFAULT 1,
            is_late INTEGER NOT NULL DEFAULT 0,
            transcription TEXT,
            transcription_status TEXT NOT NULL DEFAULT 'pending'
                CHECK (transcription_status IN ('pending', 'completed', 'error')),
            transcription_error TEXT,
            progress TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_submissions_pair ON submissions(assignment_id, student_id)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_submissions_latest ON submissions(assignment_id, student_id, is_latest)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_submissions_status ON submissions(transcription_status)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the feedback table
///
/// Schema allows multiple rows per submission; the newest `generated_at`
/// is authoritative.
pub async fn create_feedback_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS feedback (
            id TEXT PRIMARY KEY,
            submission_id TEXT NOT NULL REFERENCES submissions(id) ON DELETE CASCADE,
            accuracy REAL NOT NULL,
            notes TEXT NOT NULL,
            generated_at TEXT NOT NULL,
            CHECK (accuracy >= 0.0 AND accuracy <= 1.0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_feedback_submission ON feedback(submission_id)")
        .execute(pool)
        .await?;

    Ok(())
}
