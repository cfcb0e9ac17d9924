//! Submission lifecycle models
//!
//! A submission moves PENDING → COMPLETED or PENDING → ERROR, driven by the
//! transcription orchestrator. Both outcomes are terminal; a resubmission
//! creates a new row rather than reviving an old one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Persisted transcription lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptionStatus {
    /// Artifact stored, transcription not yet resolved
    Pending,
    /// Transcript persisted, scoring done (or skipped without reference text)
    Completed,
    /// Transcription failed; diagnostic in `transcription_error`
    Error,
}

impl TranscriptionStatus {
    /// Stable string form matching the persisted column values
    pub fn as_str(&self) -> &'static str {
        match self {
            TranscriptionStatus::Pending => "pending",
            TranscriptionStatus::Completed => "completed",
            TranscriptionStatus::Error => "error",
        }
    }

    /// Parse the persisted column value
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TranscriptionStatus::Pending),
            "completed" => Some(TranscriptionStatus::Completed),
            "error" => Some(TranscriptionStatus::Error),
            _ => None,
        }
    }

    /// Terminal states never transition again
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TranscriptionStatus::Completed | TranscriptionStatus::Error
        )
    }
}

impl std::fmt::Display for TranscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One recorded/uploaded recitation attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: Uuid,
    pub assignment_id: Uuid,
    pub student_id: Uuid,
    /// Artifact location relative to the service root folder
    pub audio_path: String,
    /// MIME type of the stored artifact
    pub content_type: String,
    pub submitted_at: DateTime<Utc>,
    /// Exactly one true row per (assignment_id, student_id) pair
    pub is_latest: bool,
    /// Computed once at submission time against the assignment due date
    pub is_late: bool,
    pub transcription: Option<String>,
    pub transcription_status: TranscriptionStatus,
    /// Terminal diagnostic, set only when status is `error`
    pub transcription_error: Option<String>,
    /// Observability checkpoint while the orchestrator is running;
    /// cleared on terminal writes, never a final state
    pub progress: Option<String>,
}

impl Submission {
    /// New pending submission for a stored artifact
    pub fn new(
        assignment_id: Uuid,
        student_id: Uuid,
        audio_path: String,
        content_type: String,
        is_late: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            assignment_id,
            student_id,
            audio_path,
            content_type,
            submitted_at: Utc::now(),
            is_latest: true,
            is_late,
            transcription: None,
            transcription_status: TranscriptionStatus::Pending,
            transcription_error: None,
            progress: None,
        }
    }
}

/// Accuracy result for one scored submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    pub id: Uuid,
    pub submission_id: Uuid,
    /// Normalized similarity in [0, 1]
    pub accuracy: f64,
    /// Band label derived from accuracy
    pub notes: String,
    pub generated_at: DateTime<Utc>,
}

impl Feedback {
    pub fn new(submission_id: Uuid, accuracy: f64, notes: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            submission_id,
            accuracy,
            notes,
            generated_at: Utc::now(),
        }
    }
}

/// Assignment attributes the pipeline consumes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub id: Uuid,
    pub title: String,
    /// Reference text for scoring; absence skips scoring
    pub target_text: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
