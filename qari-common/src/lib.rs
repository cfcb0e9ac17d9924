//! # Qari Common Library
//!
//! Shared code for the Qari recitation pipeline:
//! - Submission/feedback/assignment models
//! - Event types (RecitationEvent enum) and broadcast bus
//! - Text normalization and similarity scoring
//! - Upload limits and accepted audio types
//! - Database schema initialization
//! - Configuration loading
//! - Late-submission rule

pub mod config;
pub mod db;
pub mod deadline;
pub mod error;
pub mod events;
pub mod media;
pub mod models;
pub mod text;

pub use error::{Error, Result};
pub use models::TranscriptionStatus;
