//! HTTP client for the external speech recognition service.
//!
//! The service takes raw audio bytes and returns a JSON body with the
//! transcript. Exactly one attempt is made per submission: a failure
//! here is a terminal outcome, not something to retry, because the
//! student can simply resubmit.

use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("qari-ts/", env!("CARGO_PKG_VERSION"));

/// Transcription client errors
#[derive(Debug, Error)]
pub enum AsrError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Transcription service returned an empty transcript")]
    EmptyTranscript,
}

/// Response body from the transcription endpoint
#[derive(Debug, Deserialize)]
struct AsrResponse {
    /// Transcript text; some deployments name this field "transcription"
    #[serde(alias = "transcription")]
    text: Option<String>,
}

/// Client for the speech recognition endpoint
#[derive(Debug, Clone)]
pub struct TranscriberClient {
    http_client: reqwest::Client,
    endpoint: String,
}

impl TranscriberClient {
    pub fn new(endpoint: String, timeout: Duration) -> Result<Self, AsrError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| AsrError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint,
        })
    }

    /// Send audio for transcription and return the trimmed transcript.
    ///
    /// A whitespace-only transcript counts as a failure: downstream
    /// scoring against an empty string would report nonsense accuracy.
    pub async fn transcribe(&self, audio: Vec<u8>, content_type: &str) -> Result<String, AsrError> {
        debug!(
            endpoint = %self.endpoint,
            bytes = audio.len(),
            "Sending audio for transcription"
        );

        let response = self
            .http_client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(audio)
            .send()
            .await
            .map_err(|e| AsrError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = %status, "Transcription service returned an error");
            return Err(AsrError::ApiError(status.as_u16(), error_text));
        }

        let parsed: AsrResponse = response
            .json()
            .await
            .map_err(|e| AsrError::ParseError(e.to_string()))?;

        let transcript = parsed
            .text
            .map(|t| t.trim().to_string())
            .unwrap_or_default();

        if transcript.is_empty() {
            return Err(AsrError::EmptyTranscript);
        }

        Ok(transcript)
    }
}
