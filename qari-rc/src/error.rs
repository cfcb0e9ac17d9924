//! Error types for qari-rc
//!
//! Capture and validation errors are recoverable locally (the user retakes
//! or picks a different file); upload errors keep the audio on disk so the
//! user can resubmit without re-recording.

use thiserror::Error;

/// Main error type for the capture client
#[derive(Error, Debug)]
pub enum RcError {
    /// Configuration loading or HTTP client setup errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// No usable input device, or the capture stream could not be built
    #[error("Audio device unavailable: {0}")]
    DeviceUnavailable(String),

    /// The capture collected no samples
    #[error("Nothing was recorded")]
    EmptyCapture,

    /// Intrinsic duration below the minimum
    #[error("Recording too short: {duration:.2}s (minimum {minimum:.1}s)")]
    TooShort { duration: f64, minimum: f64 },

    /// Intrinsic duration above the ceiling
    #[error("Recording too long: {duration:.1}s (maximum {maximum:.0}s)")]
    TooLong { duration: f64, maximum: f64 },

    /// Import file exceeds the upload size cap
    #[error("File too large: {size} bytes (limit {limit} bytes)")]
    FileTooLarge { size: u64, limit: u64 },

    /// Import file type is not in the accepted set
    #[error("Unsupported audio type: {0}")]
    UnsupportedType(String),

    /// Audio decoding errors
    #[error("Audio decode error: {0}")]
    Decode(String),

    /// Every upload attempt failed
    #[error("Upload failed after {attempts} attempts: {last_error}")]
    UploadFailed { attempts: u32, last_error: String },

    /// The service rejected the submission; retrying will not help
    #[error("Service rejected the upload ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// A 2xx response whose body did not match the expected shape
    #[error("Unexpected service response: {0}")]
    BadResponse(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type using the qari-rc Error
pub type Result<T> = std::result::Result<T, RcError>;
