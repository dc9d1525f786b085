//! Core traits for custodia abstractions.
//!
//! These traits define the interfaces that concrete implementations must
//! satisfy, enabling pluggable backends and testability. The Postgres
//! implementations live in `custodia-db`; deterministic in-memory
//! implementations for tests and embedded use live in
//! `custodia_db::memory`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// ASSET & USAGE REPOSITORY TRAITS
// =============================================================================

/// Request for creating an asset row.
#[derive(Debug, Clone)]
pub struct NewAsset {
    pub file_name: String,
    pub file_path: String,
    pub asset_type: String,
    pub category: AssetCategory,
    pub mime_type: Option<String>,
    pub source_type: AssetSourceType,
    pub managed_file_id: Option<i64>,
    pub file_size: Option<i64>,
    pub is_private: bool,
    pub is_temporary: bool,
}

/// Request for creating a usage row.
#[derive(Debug, Clone)]
pub struct NewUsageRecord {
    pub asset_id: Uuid,
    pub entity_type: String,
    pub entity_id: String,
    pub field_name: Option<String>,
    pub embed_method: EmbedMethod,
    pub count: i64,
}

/// Repository for asset rows. Owned by the reconciliation engine, read by
/// the archive lifecycle engine.
#[async_trait]
pub trait AssetRepository: Send + Sync {
    /// Insert a new asset row.
    async fn insert(&self, asset: NewAsset) -> Result<Asset>;

    /// Fetch an asset by ID.
    async fn fetch(&self, id: Uuid) -> Result<Asset>;

    /// Look up one asset by exact path, constrained to the temporary or
    /// permanent partition.
    async fn find_by_path(&self, path: &str, temporary: bool) -> Result<Option<Asset>>;

    /// Look up one asset by managed-file ID, constrained to the temporary
    /// or permanent partition.
    async fn find_by_managed_file(
        &self,
        managed_file_id: i64,
        temporary: bool,
    ) -> Result<Option<Asset>>;

    /// List assets in one partition, ordered by path, with pagination.
    async fn list(&self, temporary: bool, limit: i64, offset: i64) -> Result<Vec<Asset>>;

    /// Count assets in one partition.
    async fn count(&self, temporary: bool) -> Result<i64>;
}

/// Repository for usage rows.
#[async_trait]
pub trait UsageRepository: Send + Sync {
    /// Insert a new usage row.
    async fn insert(&self, usage: NewUsageRecord) -> Result<UsageRecord>;

    /// List usage rows for an asset.
    async fn list_for_asset(&self, asset_id: Uuid) -> Result<Vec<UsageRecord>>;

    /// Sum of usage counts for an asset. A missing asset sums to zero.
    async fn usage_count(&self, asset_id: Uuid) -> Result<i64>;
}

/// Bulk staging maintenance shared by both inventory tables.
///
/// The swap and discard operations span `usage_record` and `asset` and
/// must observe the deletion-ordering invariant: usage rows are deleted
/// before the asset rows they reference.
#[async_trait]
pub trait InventoryMaintenance: Send + Sync {
    /// Atomically replace the permanent inventory with the temporary one:
    /// delete permanent usage, delete permanent assets, then flip every
    /// temporary asset permanent. Called only on overall scan success.
    async fn promote_temporary_items(&self) -> Result<()>;

    /// Discard all temporary staging, leaving the prior permanent
    /// inventory intact. Called on scan failure or cancellation.
    async fn clear_temporary_items(&self) -> Result<()>;

    /// Delete all usage rows in one partition (used when rebuilding usage
    /// independent of the asset rebuild).
    async fn clear_usage_records(&self, temporary: bool) -> Result<()>;
}

// =============================================================================
// ARCHIVE REPOSITORY TRAITS
// =============================================================================

/// Request for creating a queued archive record.
#[derive(Debug, Clone)]
pub struct NewArchiveRecord {
    pub managed_file_id: Option<i64>,
    pub original_path: String,
    pub file_name: String,
    pub asset_type: String,
    pub mime_type: Option<String>,
    pub file_size: Option<i64>,
    pub is_private: bool,
    pub reason: ArchiveReason,
    pub reason_other: Option<String>,
    pub public_description: Option<String>,
    pub internal_notes: Option<String>,
}

/// Filter for listing archive records.
#[derive(Debug, Clone, Default)]
pub struct ListArchivesRequest {
    /// Restrict to these statuses; empty means all.
    pub statuses: Vec<ArchiveStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Repository for archive records.
///
/// Implementations enforce the write-once contract on `checksum` and
/// `classified_at`: an update carrying a different value for an
/// already-set field fails with `Error::ImmutableField` before anything
/// is persisted.
#[async_trait]
pub trait ArchiveRecordRepository: Send + Sync {
    /// Insert a new record in `Queued` status.
    async fn insert(&self, record: NewArchiveRecord) -> Result<ArchiveRecord>;

    /// Fetch a record by ID.
    async fn fetch(&self, id: Uuid) -> Result<ArchiveRecord>;

    /// Persist the mutable portion of a record. The record's `updated_at`
    /// is stamped by the implementation.
    async fn update(&self, record: &ArchiveRecord) -> Result<()>;

    /// Hard-delete a record. Only valid from `Queued`; callers go through
    /// the lifecycle engine which enforces that precondition.
    async fn delete(&self, id: Uuid) -> Result<()>;

    /// Find the active (non-terminal) record for a file identity:
    /// managed-file ID when present, exact original path otherwise.
    async fn find_active(
        &self,
        managed_file_id: Option<i64>,
        path: &str,
    ) -> Result<Option<ArchiveRecord>>;

    /// Whether any record for this managed file ended in `ExemptionVoid`.
    async fn has_prior_void(&self, managed_file_id: Option<i64>, path: &str) -> Result<bool>;

    /// List records, optionally filtered by status, newest first.
    async fn list(&self, req: ListArchivesRequest) -> Result<Vec<ArchiveRecord>>;
}

/// Append-only repository for archive audit notes.
#[async_trait]
pub trait ArchiveNoteRepository: Send + Sync {
    /// Append a note. Notes are never updated or deleted.
    async fn append(&self, archive_id: Uuid, text: &str, author: &str) -> Result<ArchiveNote>;

    /// List notes for a record, oldest first.
    async fn list(&self, archive_id: Uuid) -> Result<Vec<ArchiveNote>>;
}

// =============================================================================
// FILE STORE
// =============================================================================

/// Abstraction over the physical file store backing archived content.
///
/// Allows abstracting over a CMS-managed filesystem, object storage, or
/// an in-memory store in tests.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Resolve a managed-file ID to its stored path, if the store tracks
    /// managed IDs at all.
    async fn path_for_managed(&self, managed_file_id: i64) -> Result<Option<String>>;

    /// Read full file content at the given path.
    async fn read(&self, path: &str) -> Result<Vec<u8>>;

    /// Check whether content exists at the given path.
    async fn exists(&self, path: &str) -> Result<bool>;

    /// Delete the content at the given path.
    async fn delete(&self, path: &str) -> Result<()>;
}

/// A timestamp source, injectable so classification decisions are
/// reproducible in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock implementation of [`Clock`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
