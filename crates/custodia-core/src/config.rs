//! Archive configuration surface.
//!
//! The engines never read ambient global state: callers construct an
//! [`ArchiveConfig`] (from the environment, a settings form, or fixed test
//! inputs) and pass it in explicitly, so classification decisions are
//! reproducible.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;

use crate::defaults;
use crate::error::{Error, Result};

static DEFAULT_DEADLINE: Lazy<DateTime<Utc>> = Lazy::new(|| {
    defaults::COMPLIANCE_DEADLINE
        .parse()
        .expect("default compliance deadline is valid RFC 3339")
});

/// Configuration consumed by the archive and reconciliation engines.
#[derive(Debug, Clone)]
pub struct ArchiveConfig {
    /// Master switch for the archive feature (link rewriting included).
    pub enabled: bool,
    /// Permit archiving assets still actively referenced by content.
    pub allow_archive_in_use: bool,
    /// Legacy/General classification cutoff. Consulted once per record,
    /// at execution time; later changes never reclassify.
    pub compliance_deadline: DateTime<Utc>,
    /// Presentation only: show a label next to archived-content links.
    pub show_archived_label: bool,
    /// Presentation only: the label text.
    pub archived_label: String,
    /// Defer checksum computation to the background queue for files
    /// larger than this many bytes. `None` computes inline always.
    pub deferred_checksum_bytes: Option<i64>,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allow_archive_in_use: false,
            compliance_deadline: *DEFAULT_DEADLINE,
            show_archived_label: true,
            archived_label: defaults::ARCHIVED_LABEL.to_string(),
            deferred_checksum_bytes: None,
        }
    }
}

impl ArchiveConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `ARCHIVE_ENABLED` | `true` | Master archive feature switch |
    /// | `ARCHIVE_ALLOW_IN_USE` | `false` | Permit archiving in-use assets |
    /// | `ARCHIVE_COMPLIANCE_DEADLINE` | `2026-04-24T00:00:00Z` | Classification cutoff (RFC 3339) |
    /// | `ARCHIVE_SHOW_LABEL` | `true` | Show the archived label |
    /// | `ARCHIVE_LABEL` | `Archived` | Label text |
    /// | `ARCHIVE_DEFERRED_CHECKSUM_BYTES` | unset | Inline-checksum size ceiling |
    ///
    /// Unset variables fall back to defaults; a variable that is set but
    /// malformed is a configuration error, never a silent fallback.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let enabled = std::env::var("ARCHIVE_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(defaults.enabled);

        let allow_archive_in_use = std::env::var("ARCHIVE_ALLOW_IN_USE")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(defaults.allow_archive_in_use);

        let compliance_deadline = match std::env::var("ARCHIVE_COMPLIANCE_DEADLINE") {
            Ok(raw) => raw.parse::<DateTime<Utc>>().map_err(|e| {
                Error::Config(format!(
                    "ARCHIVE_COMPLIANCE_DEADLINE {:?} is not RFC 3339: {}",
                    raw, e
                ))
            })?,
            Err(_) => defaults.compliance_deadline,
        };

        let show_archived_label = std::env::var("ARCHIVE_SHOW_LABEL")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(defaults.show_archived_label);

        let archived_label =
            std::env::var("ARCHIVE_LABEL").unwrap_or(defaults.archived_label);

        let deferred_checksum_bytes = match std::env::var("ARCHIVE_DEFERRED_CHECKSUM_BYTES") {
            Ok(raw) => Some(raw.parse::<i64>().map_err(|e| {
                Error::Config(format!(
                    "ARCHIVE_DEFERRED_CHECKSUM_BYTES {:?} is not a byte count: {}",
                    raw, e
                ))
            })?),
            Err(_) => None,
        };

        Ok(Self {
            enabled,
            allow_archive_in_use,
            compliance_deadline,
            show_archived_label,
            archived_label,
            deferred_checksum_bytes,
        })
    }

    /// Enable or disable the archive feature.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Permit or forbid archiving in-use assets.
    pub fn with_allow_archive_in_use(mut self, allow: bool) -> Self {
        self.allow_archive_in_use = allow;
        self
    }

    /// Set the classification cutoff.
    pub fn with_compliance_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.compliance_deadline = deadline;
        self
    }

    /// Set the deferred-checksum size ceiling.
    pub fn with_deferred_checksum_bytes(mut self, bytes: Option<i64>) -> Self {
        self.deferred_checksum_bytes = bytes;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_deadline() {
        let cfg = ArchiveConfig::default();
        assert_eq!(
            cfg.compliance_deadline.to_rfc3339(),
            "2026-04-24T00:00:00+00:00"
        );
        assert!(cfg.enabled);
        assert!(!cfg.allow_archive_in_use);
        assert_eq!(cfg.archived_label, "Archived");
    }

    #[test]
    fn test_builder_setters() {
        let deadline = "2027-04-26T00:00:00Z".parse().unwrap();
        let cfg = ArchiveConfig::default()
            .with_enabled(false)
            .with_allow_archive_in_use(true)
            .with_compliance_deadline(deadline)
            .with_deferred_checksum_bytes(Some(1 << 30));
        assert!(!cfg.enabled);
        assert!(cfg.allow_archive_in_use);
        assert_eq!(cfg.compliance_deadline, deadline);
        assert_eq!(cfg.deferred_checksum_bytes, Some(1 << 30));
    }

    // Single test for all env-var handling: the process environment is
    // shared, so splitting these across tests would race.
    #[test]
    fn test_from_env_parsing() {
        std::env::set_var("ARCHIVE_ENABLED", "false");
        std::env::set_var("ARCHIVE_COMPLIANCE_DEADLINE", "2027-01-01T00:00:00Z");
        std::env::set_var("ARCHIVE_DEFERRED_CHECKSUM_BYTES", "1048576");
        let cfg = ArchiveConfig::from_env().unwrap();
        assert!(!cfg.enabled);
        assert_eq!(
            cfg.compliance_deadline.to_rfc3339(),
            "2027-01-01T00:00:00+00:00"
        );
        assert_eq!(cfg.deferred_checksum_bytes, Some(1_048_576));

        std::env::set_var("ARCHIVE_COMPLIANCE_DEADLINE", "sometime next spring");
        let err = ArchiveConfig::from_env().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        std::env::remove_var("ARCHIVE_COMPLIANCE_DEADLINE");

        std::env::set_var("ARCHIVE_DEFERRED_CHECKSUM_BYTES", "one gigabyte");
        let err = ArchiveConfig::from_env().unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        std::env::remove_var("ARCHIVE_ENABLED");
        std::env::remove_var("ARCHIVE_DEFERRED_CHECKSUM_BYTES");
        let cfg = ArchiveConfig::from_env().unwrap();
        assert!(cfg.enabled);
        assert_eq!(cfg.deferred_checksum_bytes, None);
    }
}
