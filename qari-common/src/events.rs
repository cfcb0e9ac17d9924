//! Event types and broadcast bus for the Qari pipeline
//!
//! Events are broadcast via EventBus and can be serialized for SSE
//! transmission to UI collaborators.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Submission lifecycle events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RecitationEvent {
    /// Artifact stored and submission row created
    SubmissionReceived {
        submission_id: Uuid,
        assignment_id: Uuid,
        student_id: Uuid,
        is_late: bool,
        timestamp: DateTime<Utc>,
    },

    /// Orchestrator picked up the submission
    TranscriptionStarted {
        submission_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// Transcript persisted, status now completed
    TranscriptionCompleted {
        submission_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// Terminal failure, status now error
    TranscriptionFailed {
        submission_id: Uuid,
        error: String,
        timestamp: DateTime<Utc>,
    },

    /// Feedback row written (or updated by a rescore)
    FeedbackReady {
        submission_id: Uuid,
        accuracy: f64,
        notes: String,
        timestamp: DateTime<Utc>,
    },
}

impl RecitationEvent {
    /// Get event type as string for SSE event names and filtering
    pub fn event_type(&self) -> &str {
        match self {
            RecitationEvent::SubmissionReceived { .. } => "SubmissionReceived",
            RecitationEvent::TranscriptionStarted { .. } => "TranscriptionStarted",
            RecitationEvent::TranscriptionCompleted { .. } => "TranscriptionCompleted",
            RecitationEvent::TranscriptionFailed { .. } => "TranscriptionFailed",
            RecitationEvent::FeedbackReady { .. } => "FeedbackReady",
        }
    }
}

/// Central event distribution bus
///
/// Wraps tokio::broadcast: non-blocking publish, multiple concurrent
/// subscribers, automatic cleanup when receivers drop, lag detection for
/// slow subscribers.
///
/// # Examples
///
/// ```
/// use qari_common::events::EventBus;
///
/// let event_bus = EventBus::new(100);
/// assert_eq!(event_bus.subscriber_count(), 0);
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<RecitationEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with the given channel capacity.
    ///
    /// Capacity is the number of events buffered before slow subscribers
    /// start seeing lag errors. 100-1000 is plenty for this pipeline;
    /// tests use 10-100.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events.
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<RecitationEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers.
    ///
    /// Returns `Ok(subscriber_count)` when at least one subscriber exists,
    /// `Err` when none are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: RecitationEvent,
    ) -> Result<usize, broadcast::error::SendError<RecitationEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring whether anyone is listening.
    ///
    /// Used for events where a missing listener is acceptable.
    pub fn emit_lossy(&self, event: RecitationEvent) {
        let _ = self.tx.send(event);
    }

    /// Current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
