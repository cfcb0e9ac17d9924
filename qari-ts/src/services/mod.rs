//! Service layer: artifact storage, transcription, and scoring

pub mod orchestrator;
pub mod scoring;
pub mod storage;
pub mod transcriber;
