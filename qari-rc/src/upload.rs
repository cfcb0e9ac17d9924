//! Submission upload with retries.
//!
//! Uploads go to the transcription service as multipart POSTs. Connect
//! failures and 5xx responses are retried on a fixed delay up to the
//! configured attempt limit; 4xx responses mean the service looked at
//! the submission and said no, so they surface immediately. The caller
//! keeps the local copy either way, so a failed upload never loses a
//! recording.

use crate::error::{RcError, Result};
use qari_common::media;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

const USER_AGENT: &str = concat!("qari-rc/", env!("CARGO_PKG_VERSION"));

/// Retry behavior for a single upload.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, first try included
    pub max_attempts: u32,
    /// Pause between consecutive attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(2),
        }
    }
}

/// Acceptance body returned by the service for a stored submission.
#[derive(Debug, Deserialize)]
pub struct UploadReceipt {
    pub submission_id: Uuid,
    pub audio_url: String,
}

/// HTTP client for the recitation submission endpoint.
pub struct Uploader {
    http_client: reqwest::Client,
    base_url: String,
    policy: RetryPolicy,
}

impl Uploader {
    pub fn new(base_url: impl Into<String>, policy: RetryPolicy) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| RcError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: base_url.into(),
            policy,
        })
    }

    /// Upload one recitation, retrying transient failures.
    ///
    /// Returns the service's receipt on acceptance. A 4xx rejection is
    /// returned as [`RcError::Rejected`] without further attempts; when
    /// every attempt fails the last error is carried in
    /// [`RcError::UploadFailed`].
    pub async fn upload(
        &self,
        assignment_id: Uuid,
        student_id: Uuid,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<UploadReceipt> {
        let url = format!("{}/api/recitations", self.base_url.trim_end_matches('/'));
        let file_name = format!("recitation.{}", media::extension_for_mime(content_type));
        let mut last_error = String::from("no attempts made");

        for attempt in 1..=self.policy.max_attempts {
            if attempt > 1 {
                debug!(
                    "Retrying upload in {:?} (attempt {}/{})",
                    self.policy.delay, attempt, self.policy.max_attempts
                );
                tokio::time::sleep(self.policy.delay).await;
            }

            // Multipart forms are consumed by send, so each attempt
            // builds a fresh one from the retained bytes
            let part = Part::bytes(bytes.clone())
                .file_name(file_name.clone())
                .mime_str(content_type)
                .map_err(|e| {
                    RcError::Config(format!("Invalid content type {}: {}", content_type, e))
                })?;
            let form = Form::new()
                .text("assignment_id", assignment_id.to_string())
                .text("student_id", student_id.to_string())
                .part("file", part);

            let response = match self.http_client.post(&url).multipart(form).send().await {
                Ok(response) => response,
                Err(e) => {
                    warn!("Upload attempt {} failed: {}", attempt, e);
                    last_error = e.to_string();
                    continue;
                }
            };

            let status = response.status();
            if status.is_success() {
                return response.json::<UploadReceipt>().await.map_err(|e| {
                    RcError::BadResponse(format!("Malformed acceptance body: {}", e))
                });
            }

            let body = response.text().await.unwrap_or_default();
            if status.is_client_error() {
                return Err(RcError::Rejected {
                    status: status.as_u16(),
                    message: rejection_message(&body),
                });
            }

            warn!("Upload attempt {} failed: HTTP {}", attempt, status);
            last_error = format!("HTTP {}: {}", status, rejection_message(&body));
        }

        Err(RcError::UploadFailed {
            attempts: self.policy.max_attempts,
            last_error,
        })
    }
}

/// Pull the human-readable message out of a service error body.
///
/// The service wraps errors as `{"error": {"code", "message"}}`; anything
/// else (proxy error pages, empty bodies) falls back to the raw text.
fn rejection_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(message) = value["error"]["message"].as_str() {
            return message.to_string();
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        "no detail provided".to_string()
    } else {
        trimmed.chars().take(200).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::Router;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    async fn spawn_upload_stub<F>(hits: Arc<AtomicUsize>, respond: F) -> String
    where
        F: Fn(usize) -> (StatusCode, String) + Clone + Send + Sync + 'static,
    {
        let app = Router::new().route(
            "/api/recitations",
            post(move |_body: Bytes| {
                let hits = Arc::clone(&hits);
                let respond = respond.clone();
                async move {
                    let attempt = hits.fetch_add(1, Ordering::SeqCst);
                    respond(attempt)
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{}", addr)
    }

    fn quick_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            delay: Duration::from_millis(5),
        }
    }

    #[tokio::test]
    async fn test_upload_retries_transient_failures() {
        let submission_id = Uuid::new_v4();
        let receipt = json!({
            "submission_id": submission_id,
            "audio_url": "/media/recitations/a/b/c.wav"
        })
        .to_string();

        let hits = Arc::new(AtomicUsize::new(0));
        let base_url = spawn_upload_stub(
            Arc::clone(&hits),
            move |attempt| {
                if attempt < 2 {
                    (StatusCode::INTERNAL_SERVER_ERROR, "boom".to_string())
                } else {
                    (StatusCode::OK, receipt.clone())
                }
            },
        )
        .await;

        let uploader = Uploader::new(base_url, quick_policy(3)).unwrap();
        let result = uploader
            .upload(Uuid::new_v4(), Uuid::new_v4(), b"RIFF audio".to_vec(), "audio/wav")
            .await
            .unwrap();

        assert_eq!(result.submission_id, submission_id);
        assert_eq!(result.audio_url, "/media/recitations/a/b/c.wav");
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_upload_rejection_not_retried() {
        let body = json!({
            "error": {"code": "bad_request", "message": "audio file is empty"}
        })
        .to_string();

        let hits = Arc::new(AtomicUsize::new(0));
        let base_url = spawn_upload_stub(Arc::clone(&hits), move |_| {
            (StatusCode::BAD_REQUEST, body.clone())
        })
        .await;

        let uploader = Uploader::new(base_url, quick_policy(3)).unwrap();
        let err = uploader
            .upload(Uuid::new_v4(), Uuid::new_v4(), b"x".to_vec(), "audio/wav")
            .await
            .unwrap_err();

        match err {
            RcError::Rejected { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "audio file is empty");
            }
            other => panic!("Expected Rejected, got {:?}", other),
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_upload_exhausts_attempts_when_unreachable() {
        // Discard port, nothing listens there
        let uploader = Uploader::new("http://127.0.0.1:9", quick_policy(2)).unwrap();
        let err = uploader
            .upload(Uuid::new_v4(), Uuid::new_v4(), b"x".to_vec(), "audio/wav")
            .await
            .unwrap_err();

        match err {
            RcError::UploadFailed {
                attempts,
                last_error,
            } => {
                assert_eq!(attempts, 2);
                assert!(!last_error.is_empty());
            }
            other => panic!("Expected UploadFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_upload_malformed_acceptance_body() {
        let hits = Arc::new(AtomicUsize::new(0));
        let base_url = spawn_upload_stub(Arc::clone(&hits), |_| {
            (StatusCode::OK, "not json".to_string())
        })
        .await;

        let uploader = Uploader::new(base_url, quick_policy(1)).unwrap();
        let err = uploader
            .upload(Uuid::new_v4(), Uuid::new_v4(), b"x".to_vec(), "audio/wav")
            .await
            .unwrap_err();

        assert!(matches!(err, RcError::BadResponse(_)));
    }

    #[test]
    fn test_rejection_message_parses_envelope() {
        let envelope = r#"{"error": {"code": "too_large", "message": "File exceeds limit"}}"#;
        assert_eq!(rejection_message(envelope), "File exceeds limit");

        assert_eq!(rejection_message("plain text error"), "plain text error");
        assert_eq!(rejection_message("   "), "no detail provided");
    }
}
