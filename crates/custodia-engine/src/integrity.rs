//! Integrity checking for archived file content.
//!
//! Resolves a record's physical content (managed-file ID preferred, the
//! recorded path as fallback), recomputes its SHA-256 digest, and
//! distinguishes "changed" from "missing" so the lifecycle engine can set
//! `flag_modified` and `flag_missing` independently.

use std::sync::Arc;

use tracing::debug;

use custodia_core::{sha256_hex, FileStore, Result};

/// Outcome of comparing stored content against its recorded checksum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityStatus {
    /// Content resolves and matches the stored checksum.
    Intact,
    /// Content resolves but hashes differently.
    Modified { actual: String },
    /// Content can no longer be resolved at all.
    Missing,
}

/// Computes and verifies content checksums through a [`FileStore`].
#[derive(Clone)]
pub struct IntegrityChecker {
    files: Arc<dyn FileStore>,
}

impl IntegrityChecker {
    pub fn new(files: Arc<dyn FileStore>) -> Self {
        Self { files }
    }

    /// Resolve the effective content path: the managed-file store mapping
    /// when one exists, otherwise the recorded path.
    pub async fn resolve_path(
        &self,
        managed_file_id: Option<i64>,
        recorded_path: &str,
    ) -> Result<String> {
        if let Some(fid) = managed_file_id {
            if let Some(path) = self.files.path_for_managed(fid).await? {
                return Ok(path);
            }
        }
        Ok(recorded_path.to_string())
    }

    /// Whether the content is currently resolvable.
    pub async fn exists(&self, managed_file_id: Option<i64>, recorded_path: &str) -> Result<bool> {
        let path = self.resolve_path(managed_file_id, recorded_path).await?;
        self.files.exists(&path).await
    }

    /// Compute the SHA-256 hex digest of the resolved content.
    pub async fn compute(
        &self,
        managed_file_id: Option<i64>,
        recorded_path: &str,
    ) -> Result<String> {
        let path = self.resolve_path(managed_file_id, recorded_path).await?;
        let data = self.files.read(&path).await?;
        let digest = sha256_hex(&data);
        debug!(
            subsystem = "archive",
            component = "integrity",
            op = "compute",
            path,
            size = data.len(),
            "Computed content checksum"
        );
        Ok(digest)
    }

    /// Verify resolved content against a stored checksum.
    pub async fn verify(
        &self,
        managed_file_id: Option<i64>,
        recorded_path: &str,
        expected: &str,
    ) -> Result<IntegrityStatus> {
        let path = self.resolve_path(managed_file_id, recorded_path).await?;
        if !self.files.exists(&path).await? {
            return Ok(IntegrityStatus::Missing);
        }
        let actual = sha256_hex(&self.files.read(&path).await?);
        if actual == expected {
            Ok(IntegrityStatus::Intact)
        } else {
            Ok(IntegrityStatus::Modified { actual })
        }
    }

    /// Delete the resolved content.
    pub async fn delete(&self, managed_file_id: Option<i64>, recorded_path: &str) -> Result<()> {
        let path = self.resolve_path(managed_file_id, recorded_path).await?;
        self.files.delete(&path).await
    }
}
