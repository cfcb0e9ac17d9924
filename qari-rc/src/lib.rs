//! Recitation capture client library (qari-rc)
//!
//! Records or imports a student recitation, validates and re-encodes it
//! locally, then uploads it to the transcription service.
//!
//! Pipeline: capture/import -> validate (decode + duration bounds) ->
//! re-encode to 16 kHz mono WAV -> multipart upload with retries.

pub mod capture;
pub mod config;
pub mod encode;
pub mod error;
pub mod upload;
pub mod validate;

pub use error::{RcError, Result};
