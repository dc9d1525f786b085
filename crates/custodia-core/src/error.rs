//! Error types for custodia.

use thiserror::Error;

use crate::models::{ArchiveStatus, GateReport};

/// Result type alias using custodia's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for custodia operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Asset not found
    #[error("Asset not found: {0}")]
    AssetNotFound(uuid::Uuid),

    /// Archive record not found
    #[error("Archive record not found: {0}")]
    ArchiveNotFound(uuid::Uuid),

    /// Operation attempted against a record in the wrong lifecycle state.
    /// Precondition violations are always surfaced, never silently ignored.
    #[error("Operation '{operation}' not permitted in status '{status}'")]
    InvalidState {
        operation: &'static str,
        status: ArchiveStatus,
    },

    /// Attempt to change a write-once field after it was set.
    /// A programming-contract violation: fails before any persistence.
    #[error("Immutable field '{0}' cannot be changed once set")]
    ImmutableField(&'static str),

    /// Asset category is not eligible for archival
    #[error("Not archivable: {0}")]
    NotArchivable(String),

    /// An active (non-terminal) archive record already exists for the asset
    #[error("Duplicate archive: {0}")]
    DuplicateArchive(String),

    /// Execution gates reported blocking issues. The report is structured
    /// so callers can present remediation steps instead of a bare failure.
    #[error("Execution blocked: {0}")]
    ExecutionBlocked(GateReport),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Inventory scan failed
    #[error("Scan error: {0}")]
    Scan(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_invalid_state() {
        let err = Error::InvalidState {
            operation: "execute_archive",
            status: ArchiveStatus::ExemptionVoid,
        };
        assert_eq!(
            err.to_string(),
            "Operation 'execute_archive' not permitted in status 'exemption_void'"
        );
    }

    #[test]
    fn test_error_display_immutable_field() {
        let err = Error::ImmutableField("checksum");
        assert_eq!(
            err.to_string(),
            "Immutable field 'checksum' cannot be changed once set"
        );
    }

    #[test]
    fn test_error_display_not_archivable() {
        let err = Error::NotArchivable("category Images".to_string());
        assert_eq!(err.to_string(), "Not archivable: category Images");
    }

    #[test]
    fn test_error_display_archive_not_found() {
        let id = uuid::Uuid::nil();
        let err = Error::ArchiveNotFound(id);
        assert!(err.to_string().contains(&id.to_string()));
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();
        match err {
            Error::Serialization(msg) => assert!(!msg.is_empty()),
            _ => panic!("Expected Serialization error"),
        }
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
