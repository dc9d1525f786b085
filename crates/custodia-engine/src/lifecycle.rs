//! Archive lifecycle engine.
//!
//! The finite-state machine governing archive records:
//! `Queued → ArchivedPublic ⇄ ArchivedAdmin`, with the terminals
//! `ArchivedDeleted` and `ExemptionVoid` and the single corrective
//! transition `ExemptionVoid → ArchivedDeleted` via [`ArchiveLifecycleEngine::unarchive`].
//! Every mutating operation re-checks its `can_*` precondition against
//! the freshly fetched record and appends an audit note on success.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use custodia_core::{
    ArchiveConfig, ArchiveNoteRepository, ArchiveReason, ArchiveRecord, ArchiveRecordRepository,
    ArchiveStatus, ArchiveVisibility, Asset, AssetRepository, Clock, Error, FileStore, GateIssue,
    GateReport, NewArchiveRecord, Result, SystemClock, UsageRepository,
};

use crate::integrity::{IntegrityChecker, IntegrityStatus};

/// Author recorded on audit notes for automatic transitions.
const SYSTEM_ACTOR: &str = "system";

/// Request to queue an asset for archival.
#[derive(Debug, Clone)]
pub struct ArchiveRequest {
    pub reason: ArchiveReason,
    pub reason_other: Option<String>,
    pub public_description: Option<String>,
    pub internal_notes: Option<String>,
    pub requested_by: String,
}

/// Request to queue a manual (page/external) archive entry.
#[derive(Debug, Clone)]
pub struct ManualEntryRequest {
    /// Fully resolved URL or site path of the resource.
    pub url: String,
    pub title: String,
    /// `page` or `external`.
    pub asset_type: String,
    pub reason: ArchiveReason,
    pub reason_other: Option<String>,
    pub public_description: Option<String>,
    pub internal_notes: Option<String>,
    pub requested_by: String,
}

/// Editable fields of a manual entry.
#[derive(Debug, Clone, Default)]
pub struct ManualEntryEdit {
    pub title: Option<String>,
    pub reason: Option<ArchiveReason>,
    pub reason_other: Option<Option<String>>,
    pub public_description: Option<Option<String>>,
    pub internal_notes: Option<Option<String>>,
}

/// Outcome of a successful execution.
#[derive(Debug, Clone)]
pub struct ExecuteOutcome {
    pub record: ArchiveRecord,
    /// Checksum computation was handed to the background queue; the
    /// record stays valid with a null checksum until it completes.
    pub checksum_deferred: bool,
}

/// The archive lifecycle engine.
pub struct ArchiveLifecycleEngine {
    records: Arc<dyn ArchiveRecordRepository>,
    notes: Arc<dyn ArchiveNoteRepository>,
    assets: Arc<dyn AssetRepository>,
    usage: Arc<dyn UsageRepository>,
    integrity: IntegrityChecker,
    clock: Arc<dyn Clock>,
}

impl ArchiveLifecycleEngine {
    pub fn new(
        records: Arc<dyn ArchiveRecordRepository>,
        notes: Arc<dyn ArchiveNoteRepository>,
        assets: Arc<dyn AssetRepository>,
        usage: Arc<dyn UsageRepository>,
        files: Arc<dyn FileStore>,
    ) -> Self {
        Self {
            records,
            notes,
            assets,
            usage,
            integrity: IntegrityChecker::new(files),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the wall clock (classification tests use a fixed clock).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    // =========================================================================
    // QUEUEING
    // =========================================================================

    /// Queue an asset for archival.
    ///
    /// Fails unless the asset's category is Documents or Videos, or when
    /// an active (non-terminal) record already exists for the same file.
    /// The duplicate check is optimistic; the storage layer backs it with
    /// a partial unique index on active archive identity.
    pub async fn mark_for_archive(
        &self,
        asset: &Asset,
        req: ArchiveRequest,
    ) -> Result<ArchiveRecord> {
        if !asset.category.is_archivable() {
            return Err(Error::NotArchivable(format!(
                "category {} is not eligible for archival",
                asset.category
            )));
        }
        if let Some(existing) = self
            .records
            .find_active(asset.managed_file_id, &asset.file_path)
            .await?
        {
            return Err(Error::DuplicateArchive(format!(
                "active archive record {} already exists for {}",
                existing.id, asset.file_path
            )));
        }

        let record = self
            .records
            .insert(NewArchiveRecord {
                managed_file_id: asset.managed_file_id,
                original_path: asset.file_path.clone(),
                file_name: asset.file_name.clone(),
                asset_type: asset.asset_type.clone(),
                mime_type: asset.mime_type.clone(),
                file_size: asset.file_size,
                is_private: asset.is_private,
                reason: req.reason,
                reason_other: req.reason_other,
                public_description: req.public_description,
                internal_notes: req.internal_notes,
            })
            .await?;

        self.notes
            .append(record.id, "Queued for archival", &req.requested_by)
            .await?;

        info!(
            subsystem = "archive",
            component = "lifecycle",
            op = "mark_for_archive",
            archive_id = %record.id,
            asset_id = %asset.id,
            "Asset queued for archival"
        );
        Ok(record)
    }

    /// Queue a manual entry for a page or external resource.
    pub async fn mark_manual_entry(&self, req: ManualEntryRequest) -> Result<ArchiveRecord> {
        if !matches!(req.asset_type.as_str(), "page" | "external") {
            return Err(Error::InvalidInput(format!(
                "manual entries must be of type 'page' or 'external', got '{}'",
                req.asset_type
            )));
        }
        if let Some(existing) = self.records.find_active(None, &req.url).await? {
            return Err(Error::DuplicateArchive(format!(
                "active archive record {} already exists for {}",
                existing.id, req.url
            )));
        }

        let record = self
            .records
            .insert(NewArchiveRecord {
                managed_file_id: None,
                original_path: req.url,
                file_name: req.title,
                asset_type: req.asset_type,
                mime_type: None,
                file_size: None,
                is_private: false,
                reason: req.reason,
                reason_other: req.reason_other,
                public_description: req.public_description,
                internal_notes: req.internal_notes,
            })
            .await?;

        self.notes
            .append(record.id, "Manual entry queued for archival", &req.requested_by)
            .await?;
        Ok(record)
    }

    /// Edit the descriptive fields of a manual entry. File-based archives
    /// are never editable; terminal records are never editable.
    pub async fn update_manual_entry(
        &self,
        id: Uuid,
        edit: ManualEntryEdit,
        actor: &str,
    ) -> Result<ArchiveRecord> {
        let mut record = self.records.fetch(id).await?;
        if !record.can_edit() {
            return Err(Error::InvalidState {
                operation: "update_manual_entry",
                status: record.status,
            });
        }

        if let Some(title) = edit.title {
            record.file_name = title;
        }
        if let Some(reason) = edit.reason {
            record.reason = reason;
        }
        if let Some(reason_other) = edit.reason_other {
            record.reason_other = reason_other;
        }
        if let Some(public_description) = edit.public_description {
            record.public_description = public_description;
        }
        if let Some(internal_notes) = edit.internal_notes {
            record.internal_notes = internal_notes;
        }

        self.records.update(&record).await?;
        self.notes.append(record.id, "Manual entry updated", actor).await?;
        self.records.fetch(id).await
    }

    // =========================================================================
    // EXECUTION
    // =========================================================================

    /// Run the execution gates without mutating anything.
    ///
    /// Returns a structured report, empty when execution is clear. A
    /// positive usage count with the archive-in-use policy disabled is a
    /// distinguished `usage_policy_blocked` entry, not a hard error.
    pub async fn validate_execution_gates(
        &self,
        cfg: &ArchiveConfig,
        record: &ArchiveRecord,
    ) -> Result<GateReport> {
        let mut report = GateReport::default();

        if record.is_file_based()
            && !self
                .integrity
                .exists(record.managed_file_id, &record.original_path)
                .await?
        {
            report.push(GateIssue::FileMissing {
                path: record.original_path.clone(),
            });
        }

        let usage_count = self.usage_count_for_record(record).await?;
        if usage_count > 0 && !cfg.allow_archive_in_use {
            report.push(GateIssue::UsagePolicyBlocked { usage_count });
        }

        Ok(report)
    }

    /// Execute a queued archive: checksum the content, classify Legacy
    /// vs. General against the compliance deadline, and move the record
    /// into the requested archived visibility.
    ///
    /// Classification happens exactly once, here; later deadline changes
    /// never reclassify. A prior voided exemption for the same file
    /// forces General classification regardless of date.
    pub async fn execute_archive(
        &self,
        cfg: &ArchiveConfig,
        id: Uuid,
        visibility: ArchiveVisibility,
        actor: &str,
    ) -> Result<ExecuteOutcome> {
        let mut record = self.records.fetch(id).await?;
        if !record.can_execute_archive() {
            return Err(Error::InvalidState {
                operation: "execute_archive",
                status: record.status,
            });
        }

        let report = self.validate_execution_gates(cfg, &record).await?;
        if !report.is_empty() {
            return Err(Error::ExecutionBlocked(report));
        }

        let usage_count = self.usage_count_for_record(&record).await?;

        let mut checksum_deferred = false;
        if record.is_file_based() {
            let defer = matches!(
                (cfg.deferred_checksum_bytes, record.file_size),
                (Some(threshold), Some(size)) if size > threshold
            );
            if defer {
                checksum_deferred = true;
            } else {
                record.checksum = Some(
                    self.integrity
                        .compute(record.managed_file_id, &record.original_path)
                        .await?,
                );
            }
        }

        let now = self.clock.now();
        let prior_void = self
            .records
            .has_prior_void(record.managed_file_id, &record.original_path)
            .await?;
        let legacy = now < cfg.compliance_deadline && !prior_void;

        record.status = visibility.status();
        record.classified_at = Some(now);
        record.flag_late_archive = !legacy;
        record.flag_prior_void = prior_void;
        record.flag_usage = usage_count > 0;
        record.archived_while_in_use = usage_count > 0;
        record.usage_at_archive = usage_count;
        record.archived_by = Some(actor.to_string());

        self.records.update(&record).await?;

        let classification = if legacy { "Legacy Archive" } else { "General Archive" };
        let mut note = format!("Archived ({}) as {}", record.status, classification);
        if prior_void {
            note.push_str("; prior voided exemption forced General classification");
        }
        if checksum_deferred {
            note.push_str("; checksum deferred to background queue");
        }
        self.notes.append(record.id, &note, actor).await?;

        info!(
            subsystem = "archive",
            component = "lifecycle",
            op = "execute_archive",
            archive_id = %record.id,
            status = %record.status,
            legacy,
            prior_void,
            usage_count,
            checksum_deferred,
            "Archive executed"
        );
        Ok(ExecuteOutcome {
            record,
            checksum_deferred,
        })
    }

    /// Complete a deferred checksum computation.
    ///
    /// Called by the background queue consumer. A no-op error if the
    /// record left its active archived state or already has a checksum.
    pub async fn complete_deferred_checksum(&self, id: Uuid) -> Result<ArchiveRecord> {
        let mut record = self.records.fetch(id).await?;
        if !record.status.is_active_archive() {
            return Err(Error::InvalidState {
                operation: "complete_deferred_checksum",
                status: record.status,
            });
        }
        if record.checksum.is_some() {
            return Ok(record);
        }
        if !record.is_file_based() {
            return Err(Error::InvalidInput(
                "manual entries carry no file to checksum".to_string(),
            ));
        }

        record.checksum = Some(
            self.integrity
                .compute(record.managed_file_id, &record.original_path)
                .await?,
        );
        self.records.update(&record).await?;
        self.notes
            .append(record.id, "Deferred checksum computed", SYSTEM_ACTOR)
            .await?;
        Ok(record)
    }

    // =========================================================================
    // VISIBILITY / TERMINATION
    // =========================================================================

    /// Whether toggling would be refused because the target is public
    /// visibility while the asset is in use and the policy forbids it.
    pub async fn is_visibility_toggle_blocked(
        &self,
        cfg: &ArchiveConfig,
        record: &ArchiveRecord,
    ) -> Result<bool> {
        if record.status != ArchiveStatus::ArchivedAdmin {
            return Ok(false);
        }
        if cfg.allow_archive_in_use {
            return Ok(false);
        }
        Ok(self.usage_count_for_record(record).await? > 0)
    }

    /// Flip an active record between public and admin visibility.
    /// Warning flags and the classification date are untouched.
    pub async fn toggle_visibility(
        &self,
        cfg: &ArchiveConfig,
        id: Uuid,
        actor: &str,
    ) -> Result<ArchiveRecord> {
        let mut record = self.records.fetch(id).await?;
        if !record.can_toggle_visibility() {
            return Err(Error::InvalidState {
                operation: "toggle_visibility",
                status: record.status,
            });
        }
        if self.is_visibility_toggle_blocked(cfg, &record).await? {
            let usage_count = self.usage_count_for_record(&record).await?;
            let mut report = GateReport::default();
            report.push(GateIssue::UsagePolicyBlocked { usage_count });
            return Err(Error::ExecutionBlocked(report));
        }

        record.status = match record.status {
            ArchiveStatus::ArchivedPublic => {
                ArchiveStatus::ArchivedAdmin
            }
            _ => ArchiveStatus::ArchivedPublic,
        };
        self.records.update(&record).await?;
        self.notes
            .append(
                record.id,
                &format!("Visibility changed to {}", record.status),
                actor,
            )
            .await?;
        Ok(record)
    }

    /// Unarchive a record: the designated, unconditional undo path.
    ///
    /// Allowed from any active archived status and, as the sole
    /// corrective action out of a terminal state, from `ExemptionVoid`.
    /// Never blocked by usage policy. Clears every warning flag and
    /// stamps deletion metadata.
    pub async fn unarchive(&self, id: Uuid, actor: &str) -> Result<ArchiveRecord> {
        let mut record = self.records.fetch(id).await?;
        if !record.can_unarchive() {
            return Err(Error::InvalidState {
                operation: "unarchive",
                status: record.status,
            });
        }

        let was_void = record.status == ArchiveStatus::ExemptionVoid;
        record.status = ArchiveStatus::ArchivedDeleted;
        record.clear_warning_flags();
        record.deleted_at = Some(self.clock.now());
        record.deleted_by = Some(actor.to_string());

        self.records.update(&record).await?;
        let note = if was_void {
            "Unarchived (corrective transition from voided exemption)"
        } else {
            "Unarchived"
        };
        self.notes.append(record.id, note, actor).await?;

        info!(
            subsystem = "archive",
            component = "lifecycle",
            op = "unarchive",
            archive_id = %record.id,
            corrective = was_void,
            "Record unarchived"
        );
        Ok(record)
    }

    /// Remove a still-queued record entirely. The only hard delete in the
    /// archive record lifecycle.
    pub async fn remove_from_queue(&self, id: Uuid) -> Result<()> {
        let record = self.records.fetch(id).await?;
        if !record.can_remove_from_queue() {
            return Err(Error::InvalidState {
                operation: "remove_from_queue",
                status: record.status,
            });
        }
        self.records.delete(id).await
    }

    /// Delete the physical file behind an active, file-based archive.
    /// The record itself is retained in `ArchivedDeleted` for audit.
    pub async fn delete_file(&self, id: Uuid, actor: &str) -> Result<ArchiveRecord> {
        let mut record = self.records.fetch(id).await?;
        if !record.can_delete_file() {
            return Err(Error::InvalidState {
                operation: "delete_file",
                status: record.status,
            });
        }

        self.integrity
            .delete(record.managed_file_id, &record.original_path)
            .await?;

        record.status = ArchiveStatus::ArchivedDeleted;
        record.deleted_at = Some(self.clock.now());
        record.deleted_by = Some(actor.to_string());
        self.records.update(&record).await?;
        self.notes
            .append(record.id, "Archived file deleted from storage", actor)
            .await?;
        Ok(record)
    }

    // =========================================================================
    // RECONCILIATION
    // =========================================================================

    /// Idempotent health check over one record, safe to run on a
    /// schedule or on demand.
    ///
    /// Recomputes the live usage flag (advisory, never a status change)
    /// and re-verifies content integrity. An integrity violation on a
    /// Legacy archive voids the exemption permanently; on a General
    /// archive it retires the record to `ArchivedDeleted`.
    pub async fn reconcile_status(&self, id: Uuid) -> Result<ArchiveRecord> {
        let mut record = self.records.fetch(id).await?;
        if record.status.is_terminal() {
            return Ok(record);
        }

        let usage_count = self.usage_count_for_record(&record).await?;
        record.flag_usage = usage_count > 0;

        if record.is_file_based() {
            let verdict = match &record.checksum {
                Some(expected) => {
                    self.integrity
                        .verify(record.managed_file_id, &record.original_path, expected)
                        .await?
                }
                // Pending deferred checksum: only existence can be checked.
                None => {
                    if self
                        .integrity
                        .exists(record.managed_file_id, &record.original_path)
                        .await?
                    {
                        IntegrityStatus::Intact
                    } else {
                        IntegrityStatus::Missing
                    }
                }
            };

            match verdict {
                IntegrityStatus::Intact => {}
                IntegrityStatus::Missing if !record.status.is_active_archive() => {
                    // Queued records just carry the advisory flag; the
                    // execution gates will refuse them anyway.
                    record.flag_missing = true;
                }
                IntegrityStatus::Missing if record.checksum.is_none() => {
                    // Content gone before the deferred checksum landed:
                    // nothing to prove a modification against.
                    record.flag_missing = true;
                }
                verdict => {
                    if let IntegrityStatus::Modified { .. } = verdict {
                        record.flag_modified = true;
                    } else {
                        record.flag_missing = true;
                    }
                    record.flag_integrity = true;
                    self.apply_integrity_violation(&mut record).await?;
                }
            }
        }

        self.records.update(&record).await?;
        Ok(record)
    }

    /// Apply the automatic transition for a confirmed integrity
    /// violation on an active archive.
    async fn apply_integrity_violation(&self, record: &mut ArchiveRecord) -> Result<()> {
        if record.is_legacy_archive() {
            record.status = ArchiveStatus::ExemptionVoid;
            warn!(
                subsystem = "archive",
                component = "lifecycle",
                op = "reconcile_status",
                archive_id = %record.id,
                "Integrity violation on Legacy archive: exemption voided"
            );
            self.notes
                .append(
                    record.id,
                    "Integrity violation detected; accessibility exemption voided",
                    SYSTEM_ACTOR,
                )
                .await?;
        } else {
            record.status = ArchiveStatus::ArchivedDeleted;
            record.deleted_at = Some(self.clock.now());
            record.deleted_by = Some(SYSTEM_ACTOR.to_string());
            warn!(
                subsystem = "archive",
                component = "lifecycle",
                op = "reconcile_status",
                archive_id = %record.id,
                "Integrity violation on General archive: record retired"
            );
            self.notes
                .append(
                    record.id,
                    "Integrity violation detected; General archive retired",
                    SYSTEM_ACTOR,
                )
                .await?;
        }
        Ok(())
    }

    // =========================================================================
    // COLLABORATOR QUERIES
    // =========================================================================

    /// Canonical archive-detail URL for a file identity, if a publicly
    /// archived record exists and the feature is enabled. Consumed by the
    /// link-rewriting collaborator to redirect outbound links site-wide.
    pub async fn archive_detail_url(
        &self,
        cfg: &ArchiveConfig,
        managed_file_id: Option<i64>,
        url: &str,
    ) -> Result<Option<String>> {
        if !cfg.enabled {
            return Ok(None);
        }
        let record = self.records.find_active(managed_file_id, url).await?;
        Ok(record
            .filter(|r| r.status == ArchiveStatus::ArchivedPublic)
            .map(|r| format!("/archive/{}", r.id)))
    }

    /// Live usage count for a record's file identity.
    ///
    /// Locates the inventory asset by managed-file ID when present, by
    /// exact path otherwise; the sum of its usage rows. Absence of a
    /// matching asset means zero usage, not an error.
    pub async fn usage_count_for_record(&self, record: &ArchiveRecord) -> Result<i64> {
        let asset = match record.managed_file_id {
            Some(fid) => self.assets.find_by_managed_file(fid, false).await?,
            None => self.assets.find_by_path(&record.original_path, false).await?,
        };
        match asset {
            Some(asset) => self.usage.usage_count(asset.id).await,
            None => Ok(0),
        }
    }
}
