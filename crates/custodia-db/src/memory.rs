//! Deterministic in-memory repositories for tests and embedded use.
//!
//! These implement the same traits as the PostgreSQL repositories with
//! identical contracts (staging partitions, deletion ordering, write-once
//! fields, active-archive uniqueness), so the engines can be exercised
//! without a database.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use custodia_core::{
    new_v7, ArchiveNote, ArchiveNoteRepository, ArchiveRecord, ArchiveRecordRepository,
    ArchiveStatus, Asset, AssetRepository, Clock, Error, FileStore, InventoryMaintenance,
    ListArchivesRequest, NewArchiveRecord, NewAsset, NewUsageRecord, Result, UsageRecord,
    UsageRepository,
};

// =============================================================================
// INVENTORY
// =============================================================================

#[derive(Default)]
struct InventoryState {
    assets: Vec<Asset>,
    usage: Vec<UsageRecord>,
}

/// In-memory asset + usage inventory.
///
/// A single lock guards both tables so the promote/clear swap is atomic,
/// mirroring the single-transaction Postgres implementation.
#[derive(Clone, Default)]
pub struct InMemoryInventory {
    state: Arc<Mutex<InventoryState>>,
}

impl InMemoryInventory {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, InventoryState> {
        // Lock poisoning only happens if a holder panicked mid-update;
        // tests want to see that as a panic here too.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl AssetRepository for InMemoryInventory {
    async fn insert(&self, asset: NewAsset) -> Result<Asset> {
        let mut state = self.lock();
        if state
            .assets
            .iter()
            .any(|a| a.file_path == asset.file_path && a.is_temporary == asset.is_temporary)
        {
            return Err(Error::InvalidInput(format!(
                "Duplicate asset path in partition: {}",
                asset.file_path
            )));
        }
        let row = Asset {
            id: new_v7(),
            file_name: asset.file_name,
            file_path: asset.file_path,
            asset_type: asset.asset_type,
            category: asset.category,
            mime_type: asset.mime_type,
            source_type: asset.source_type,
            managed_file_id: asset.managed_file_id,
            file_size: asset.file_size,
            is_private: asset.is_private,
            is_temporary: asset.is_temporary,
            created_at: Utc::now(),
        };
        state.assets.push(row.clone());
        Ok(row)
    }

    async fn fetch(&self, id: Uuid) -> Result<Asset> {
        self.lock()
            .assets
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or(Error::AssetNotFound(id))
    }

    async fn find_by_path(&self, path: &str, temporary: bool) -> Result<Option<Asset>> {
        Ok(self
            .lock()
            .assets
            .iter()
            .find(|a| a.file_path == path && a.is_temporary == temporary)
            .cloned())
    }

    async fn find_by_managed_file(
        &self,
        managed_file_id: i64,
        temporary: bool,
    ) -> Result<Option<Asset>> {
        Ok(self
            .lock()
            .assets
            .iter()
            .find(|a| a.managed_file_id == Some(managed_file_id) && a.is_temporary == temporary)
            .cloned())
    }

    async fn list(&self, temporary: bool, limit: i64, offset: i64) -> Result<Vec<Asset>> {
        let mut assets: Vec<Asset> = self
            .lock()
            .assets
            .iter()
            .filter(|a| a.is_temporary == temporary)
            .cloned()
            .collect();
        assets.sort_by(|a, b| a.file_path.cmp(&b.file_path));
        Ok(assets
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn count(&self, temporary: bool) -> Result<i64> {
        Ok(self
            .lock()
            .assets
            .iter()
            .filter(|a| a.is_temporary == temporary)
            .count() as i64)
    }
}

#[async_trait]
impl UsageRepository for InMemoryInventory {
    async fn insert(&self, usage: NewUsageRecord) -> Result<UsageRecord> {
        let row = UsageRecord {
            id: new_v7(),
            asset_id: usage.asset_id,
            entity_type: usage.entity_type,
            entity_id: usage.entity_id,
            field_name: usage.field_name,
            embed_method: usage.embed_method,
            count: usage.count,
        };
        self.lock().usage.push(row.clone());
        Ok(row)
    }

    async fn list_for_asset(&self, asset_id: Uuid) -> Result<Vec<UsageRecord>> {
        Ok(self
            .lock()
            .usage
            .iter()
            .filter(|u| u.asset_id == asset_id)
            .cloned()
            .collect())
    }

    async fn usage_count(&self, asset_id: Uuid) -> Result<i64> {
        Ok(self
            .lock()
            .usage
            .iter()
            .filter(|u| u.asset_id == asset_id)
            .map(|u| u.count)
            .sum())
    }
}

#[async_trait]
impl InventoryMaintenance for InMemoryInventory {
    async fn promote_temporary_items(&self) -> Result<()> {
        let mut state = self.lock();
        let permanent_ids: Vec<Uuid> = state
            .assets
            .iter()
            .filter(|a| !a.is_temporary)
            .map(|a| a.id)
            .collect();
        // Usage before assets, same ordering contract as Postgres.
        state.usage.retain(|u| !permanent_ids.contains(&u.asset_id));
        state.assets.retain(|a| a.is_temporary);
        for asset in &mut state.assets {
            asset.is_temporary = false;
        }
        Ok(())
    }

    async fn clear_temporary_items(&self) -> Result<()> {
        let mut state = self.lock();
        let temp_ids: Vec<Uuid> = state
            .assets
            .iter()
            .filter(|a| a.is_temporary)
            .map(|a| a.id)
            .collect();
        state.usage.retain(|u| !temp_ids.contains(&u.asset_id));
        state.assets.retain(|a| !a.is_temporary);
        Ok(())
    }

    async fn clear_usage_records(&self, temporary: bool) -> Result<()> {
        let mut state = self.lock();
        let ids: Vec<Uuid> = state
            .assets
            .iter()
            .filter(|a| a.is_temporary == temporary)
            .map(|a| a.id)
            .collect();
        state.usage.retain(|u| !ids.contains(&u.asset_id));
        Ok(())
    }
}

// =============================================================================
// ARCHIVE
// =============================================================================

#[derive(Default)]
struct ArchiveState {
    records: Vec<ArchiveRecord>,
    notes: Vec<ArchiveNote>,
}

/// In-memory archive record + note store.
#[derive(Clone, Default)]
pub struct InMemoryArchive {
    state: Arc<Mutex<ArchiveState>>,
}

impl InMemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ArchiveState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ArchiveRecordRepository for InMemoryArchive {
    async fn insert(&self, record: NewArchiveRecord) -> Result<ArchiveRecord> {
        let mut state = self.lock();
        // Mirrors the partial unique index on active archive identity.
        let duplicate = state.records.iter().any(|r| {
            !r.status.is_terminal()
                && match record.managed_file_id {
                    Some(fid) => r.managed_file_id == Some(fid),
                    None => r.managed_file_id.is_none() && r.original_path == record.original_path,
                }
        });
        if duplicate {
            return Err(Error::DuplicateArchive(record.original_path));
        }
        let now = Utc::now();
        let row = ArchiveRecord {
            id: new_v7(),
            status: ArchiveStatus::Queued,
            managed_file_id: record.managed_file_id,
            original_path: record.original_path,
            file_name: record.file_name,
            asset_type: record.asset_type,
            mime_type: record.mime_type,
            file_size: record.file_size,
            is_private: record.is_private,
            reason: record.reason,
            reason_other: record.reason_other,
            public_description: record.public_description,
            internal_notes: record.internal_notes,
            checksum: None,
            classified_at: None,
            flag_usage: false,
            flag_missing: false,
            flag_integrity: false,
            flag_modified: false,
            flag_late_archive: false,
            flag_prior_void: false,
            archived_while_in_use: false,
            usage_at_archive: 0,
            archived_by: None,
            deleted_at: None,
            deleted_by: None,
            created_at: now,
            updated_at: now,
        };
        state.records.push(row.clone());
        Ok(row)
    }

    async fn fetch(&self, id: Uuid) -> Result<ArchiveRecord> {
        self.lock()
            .records
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or(Error::ArchiveNotFound(id))
    }

    async fn update(&self, record: &ArchiveRecord) -> Result<()> {
        let mut state = self.lock();
        let existing = state
            .records
            .iter_mut()
            .find(|r| r.id == record.id)
            .ok_or(Error::ArchiveNotFound(record.id))?;

        // Write-once guard, checked before anything is stored.
        if existing.checksum.is_some() && existing.checksum != record.checksum {
            return Err(Error::ImmutableField("checksum"));
        }
        if existing.classified_at.is_some() && existing.classified_at != record.classified_at {
            return Err(Error::ImmutableField("classified_at"));
        }

        let mut updated = record.clone();
        updated.updated_at = Utc::now();
        *existing = updated;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut state = self.lock();
        let before = state.records.len();
        state.records.retain(|r| r.id != id);
        if state.records.len() == before {
            return Err(Error::ArchiveNotFound(id));
        }
        state.notes.retain(|n| n.archive_id != id);
        Ok(())
    }

    async fn find_active(
        &self,
        managed_file_id: Option<i64>,
        path: &str,
    ) -> Result<Option<ArchiveRecord>> {
        Ok(self
            .lock()
            .records
            .iter()
            .find(|r| {
                !r.status.is_terminal()
                    && match managed_file_id {
                        Some(fid) => r.managed_file_id == Some(fid),
                        None => r.managed_file_id.is_none() && r.original_path == path,
                    }
            })
            .cloned())
    }

    async fn has_prior_void(&self, managed_file_id: Option<i64>, path: &str) -> Result<bool> {
        Ok(self.lock().records.iter().any(|r| {
            r.status == ArchiveStatus::ExemptionVoid
                && match managed_file_id {
                    Some(fid) => r.managed_file_id == Some(fid),
                    None => r.original_path == path,
                }
        }))
    }

    async fn list(&self, req: ListArchivesRequest) -> Result<Vec<ArchiveRecord>> {
        let limit = req.limit.unwrap_or(custodia_core::defaults::PAGE_LIMIT);
        let offset = req.offset.unwrap_or(custodia_core::defaults::PAGE_OFFSET);
        let mut records: Vec<ArchiveRecord> = self
            .lock()
            .records
            .iter()
            .filter(|r| req.statuses.is_empty() || req.statuses.contains(&r.status))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }
}

#[async_trait]
impl ArchiveNoteRepository for InMemoryArchive {
    async fn append(&self, archive_id: Uuid, text: &str, author: &str) -> Result<ArchiveNote> {
        let note = ArchiveNote {
            id: new_v7(),
            archive_id,
            text: text.to_string(),
            author: author.to_string(),
            created_at: Utc::now(),
        };
        self.lock().notes.push(note.clone());
        Ok(note)
    }

    async fn list(&self, archive_id: Uuid) -> Result<Vec<ArchiveNote>> {
        Ok(self
            .lock()
            .notes
            .iter()
            .filter(|n| n.archive_id == archive_id)
            .cloned()
            .collect())
    }
}

// =============================================================================
// FILE STORE
// =============================================================================

#[derive(Default)]
struct FileState {
    files: HashMap<String, Vec<u8>>,
    managed: HashMap<i64, String>,
}

/// In-memory file store with mutators for simulating content drift.
#[derive(Clone, Default)]
pub struct InMemoryFileStore {
    state: Arc<Mutex<FileState>>,
}

impl InMemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FileState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Store (or overwrite) content at a path. Overwriting is how tests
    /// simulate post-archive modification.
    pub fn put(&self, path: &str, data: impl Into<Vec<u8>>) {
        self.lock().files.insert(path.to_string(), data.into());
    }

    /// Register a managed-file ID for a stored path.
    pub fn map_managed(&self, managed_file_id: i64, path: &str) {
        self.lock().managed.insert(managed_file_id, path.to_string());
    }

    /// Remove content at a path (simulates a missing file).
    pub fn remove(&self, path: &str) {
        self.lock().files.remove(path);
    }
}

#[async_trait]
impl FileStore for InMemoryFileStore {
    async fn path_for_managed(&self, managed_file_id: i64) -> Result<Option<String>> {
        Ok(self.lock().managed.get(&managed_file_id).cloned())
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        self.lock()
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("File not found: {}", path)))
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.lock().files.contains_key(path))
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.lock()
            .files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(format!("File not found: {}", path)))
    }
}

// =============================================================================
// CLOCK
// =============================================================================

/// Fixed clock for reproducing classification decisions in tests.
#[derive(Debug, Clone)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
