//! Site content sources feeding the inventory scanner.
//!
//! The scanner itself is storage-agnostic: each scan phase pulls batches
//! of [`SourceRecord`]s from an [`InventorySource`], which adapts
//! whatever CMS backend actually holds the managed files, content
//! bodies, remote media entities, and menu trees.

use std::collections::HashMap;

use async_trait::async_trait;

use custodia_core::{Error, Result, ScanPhase};

/// One reference to a managed file recorded by the CMS usage tracker.
#[derive(Debug, Clone)]
pub struct UsageRef {
    pub entity_type: String,
    pub entity_id: String,
    pub field_name: Option<String>,
    pub count: i64,
}

/// A raw record pulled from the site, before it becomes inventory rows.
///
/// Variants correspond one-to-one with the scan phases; `fetch` for a
/// phase yields only that phase's variant.
#[derive(Debug, Clone)]
pub enum SourceRecord {
    /// A file in the CMS managed-file store.
    ManagedFile {
        file_id: i64,
        uri: String,
        file_name: String,
        mime_type: Option<String>,
        file_size: Option<i64>,
        is_private: bool,
        /// Tracked as a media entity rather than a bare file.
        media_managed: bool,
        usages: Vec<UsageRef>,
    },
    /// A file on disk under the public tree with no managed-file row.
    OrphanFile {
        uri: String,
        file_name: String,
        file_size: Option<i64>,
    },
    /// One rendered HTML field body to mine for embedded links.
    ContentField {
        entity_type: String,
        entity_id: String,
        field_name: String,
        html: String,
    },
    /// A remote media entity (video platforms and similar).
    RemoteMedia {
        entity_type: String,
        entity_id: String,
        field_name: Option<String>,
        /// Provider token, e.g. `youtube` or `vimeo`.
        provider: String,
        url: String,
        title: String,
    },
    /// One menu item whose link targets a file or external URL.
    MenuLink {
        link_id: String,
        url: String,
        title: String,
    },
}

/// Paged access to site content for one scan phase.
#[async_trait]
pub trait InventorySource: Send + Sync {
    /// Total records available for a phase, for progress accounting.
    async fn count(&self, phase: ScanPhase) -> Result<u64>;

    /// Fetch one page of records for a phase. An offset at or past the
    /// end yields an empty page, never an error.
    async fn fetch(&self, phase: ScanPhase, offset: u64, limit: u64) -> Result<Vec<SourceRecord>>;
}

/// In-memory source over pre-built phase data. The backing source for
/// tests and for replaying a captured site snapshot.
#[derive(Debug, Default)]
pub struct StaticSource {
    phases: HashMap<ScanPhase, Vec<SourceRecord>>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the records for one phase.
    pub fn set_phase(&mut self, phase: ScanPhase, records: Vec<SourceRecord>) {
        self.phases.insert(phase, records);
    }

    pub fn with_phase(mut self, phase: ScanPhase, records: Vec<SourceRecord>) -> Self {
        self.set_phase(phase, records);
        self
    }
}

#[async_trait]
impl InventorySource for StaticSource {
    async fn count(&self, phase: ScanPhase) -> Result<u64> {
        Ok(self.phases.get(&phase).map_or(0, |r| r.len() as u64))
    }

    async fn fetch(&self, phase: ScanPhase, offset: u64, limit: u64) -> Result<Vec<SourceRecord>> {
        let records = match self.phases.get(&phase) {
            Some(records) => records,
            None => return Ok(Vec::new()),
        };
        let start = usize::try_from(offset)
            .map_err(|_| Error::Scan(format!("offset {offset} out of range")))?;
        if start >= records.len() {
            return Ok(Vec::new());
        }
        let end = start.saturating_add(limit as usize).min(records.len());
        Ok(records[start..end].to_vec())
    }
}

/// A source that fails every call, for exercising abort paths.
#[derive(Debug, Default)]
pub struct FailingSource;

#[async_trait]
impl InventorySource for FailingSource {
    async fn count(&self, phase: ScanPhase) -> Result<u64> {
        Err(Error::Scan(format!("source unavailable during {phase}")))
    }

    async fn fetch(&self, phase: ScanPhase, _offset: u64, _limit: u64) -> Result<Vec<SourceRecord>> {
        Err(Error::Scan(format!("source unavailable during {phase}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn menu(url: &str) -> SourceRecord {
        SourceRecord::MenuLink {
            link_id: url.to_string(),
            url: url.to_string(),
            title: url.to_string(),
        }
    }

    #[tokio::test]
    async fn test_static_source_paging() {
        let source = StaticSource::new().with_phase(
            ScanPhase::MenuLinks,
            vec![menu("/a"), menu("/b"), menu("/c")],
        );

        assert_eq!(source.count(ScanPhase::MenuLinks).await.unwrap(), 3);
        let page = source.fetch(ScanPhase::MenuLinks, 0, 2).await.unwrap();
        assert_eq!(page.len(), 2);
        let page = source.fetch(ScanPhase::MenuLinks, 2, 2).await.unwrap();
        assert_eq!(page.len(), 1);
        let page = source.fetch(ScanPhase::MenuLinks, 3, 2).await.unwrap();
        assert!(page.is_empty());
    }

    #[tokio::test]
    async fn test_static_source_empty_phase() {
        let source = StaticSource::new();
        assert_eq!(source.count(ScanPhase::ManagedFiles).await.unwrap(), 0);
        assert!(source
            .fetch(ScanPhase::ManagedFiles, 0, 50)
            .await
            .unwrap()
            .is_empty());
    }
}
