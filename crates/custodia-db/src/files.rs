//! Filesystem-backed file store.
//!
//! Resolves the scheme-prefixed paths recorded in the inventory
//! (`public://...`, `private://...`) against a base directory and serves
//! file content for checksum computation and integrity checks.

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::debug;

use custodia_core::{Error, FileStore, Result};

/// Filesystem implementation of FileStore.
///
/// Managed-file IDs are resolved by the CMS, not the filesystem, so
/// `path_for_managed` always reports no mapping here; callers fall back
/// to the recorded path of the record.
pub struct FilesystemStore {
    base_path: PathBuf,
}

impl FilesystemStore {
    /// Create a new filesystem store rooted at the given base directory.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Map a recorded asset path onto the local filesystem.
    ///
    /// Strips the `public://` / `private://` scheme prefixes and rejects
    /// parent-directory components so a crafted inventory path cannot
    /// escape the base directory.
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = path
            .strip_prefix("public://")
            .or_else(|| path.strip_prefix("private://"))
            .unwrap_or(path)
            .trim_start_matches('/');

        if Path::new(relative)
            .components()
            .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(Error::InvalidInput(format!(
                "Path escapes the file store: {}",
                path
            )));
        }
        Ok(self.base_path.join(relative))
    }

    /// Validate that the store can write, read, and delete files.
    ///
    /// Performs a full round-trip at startup to catch filesystem issues
    /// (permission errors, missing directories) early.
    pub async fn validate(&self) -> std::result::Result<(), String> {
        let test_dir = self.base_path.join(".health-check");
        let test_file = test_dir.join("test.bin");

        fs::create_dir_all(&test_dir)
            .await
            .map_err(|e| format!("create_dir_all({:?}): {}", test_dir, e))?;

        let data = b"storage-health-check";
        fs::write(&test_file, data)
            .await
            .map_err(|e| format!("write({:?}): {}", test_file, e))?;

        let read_data = fs::read(&test_file)
            .await
            .map_err(|e| format!("read({:?}): {}", test_file, e))?;
        if read_data != data {
            return Err("read-back mismatch".to_string());
        }

        fs::remove_file(&test_file)
            .await
            .map_err(|e| format!("remove_file({:?}): {}", test_file, e))?;
        let _ = fs::remove_dir(&test_dir).await;

        Ok(())
    }
}

#[async_trait]
impl FileStore for FilesystemStore {
    async fn path_for_managed(&self, _managed_file_id: i64) -> Result<Option<String>> {
        Ok(None)
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = self.resolve(path)?;
        debug!(
            subsystem = "db",
            component = "file_store",
            op = "read",
            path,
            "Reading file content"
        );
        Ok(fs::read(&full_path).await?)
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let full_path = self.resolve(path)?;
        Ok(fs::try_exists(&full_path).await?)
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let full_path = self.resolve(path)?;
        debug!(
            subsystem = "db",
            component = "file_store",
            op = "delete",
            path,
            "Deleting file"
        );
        Ok(fs::remove_file(&full_path).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_round_trip_with_scheme_prefix() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("docs")).unwrap();
        std::fs::write(dir.path().join("docs/report.pdf"), b"pdf bytes").unwrap();

        let store = FilesystemStore::new(dir.path());
        assert!(store.exists("public://docs/report.pdf").await.unwrap());
        assert_eq!(
            store.read("public://docs/report.pdf").await.unwrap(),
            b"pdf bytes"
        );

        store.delete("public://docs/report.pdf").await.unwrap();
        assert!(!store.exists("public://docs/report.pdf").await.unwrap());
    }

    #[tokio::test]
    async fn test_rejects_parent_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemStore::new(dir.path());
        let err = store.read("public://../etc/passwd").await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_validate_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemStore::new(dir.path());
        store.validate().await.unwrap();
    }

    #[tokio::test]
    async fn test_no_managed_mapping() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemStore::new(dir.path());
        assert_eq!(store.path_for_managed(42).await.unwrap(), None);
    }
}
