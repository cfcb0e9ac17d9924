//! Artifact storage for uploaded recitation audio.
//!
//! Audio lands under the service root folder at
//! `recitations/{student_id}/{assignment_id}/{epoch_millis}.{ext}`.
//! Rows store that relative key, so the root folder can move without
//! rewriting the table, and `/media` serves the same tree.

use anyhow::Result;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// Filesystem store rooted at the service root folder
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Relative storage key for a new upload
    fn storage_key(student_id: Uuid, assignment_id: Uuid, extension: &str) -> String {
        format!(
            "recitations/{}/{}/{}.{}",
            student_id,
            assignment_id,
            Utc::now().timestamp_millis(),
            extension
        )
    }

    /// Write audio bytes for a new submission, returning the relative key.
    pub async fn store(
        &self,
        student_id: Uuid,
        assignment_id: Uuid,
        extension: &str,
        bytes: &[u8],
    ) -> Result<String> {
        let key = Self::storage_key(student_id, assignment_id, extension);
        let path = self.root.join(&key);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;

        debug!(key = %key, bytes = bytes.len(), "Stored recitation audio");
        Ok(key)
    }

    /// Read a stored artifact back by its relative key
    pub async fn read(&self, key: &str) -> Result<Vec<u8>> {
        Ok(tokio::fs::read(self.root.join(key)).await?)
    }

    /// Absolute filesystem path for a relative key
    pub fn absolute_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}
