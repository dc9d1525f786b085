//! Archive lifecycle engine tests against the in-memory repositories.

use std::sync::Arc;

use chrono::{TimeZone, Utc};

use custodia_core::{
    ArchiveConfig, ArchiveNoteRepository, ArchiveReason, ArchiveRecordRepository, ArchiveStatus,
    ArchiveVisibility, Asset, AssetCategory, AssetRepository, AssetSourceType, Error, GateIssue,
    NewAsset, NewUsageRecord, UsageRepository,
};
use custodia_db::memory::{FixedClock, InMemoryArchive, InMemoryFileStore, InMemoryInventory};
use custodia_engine::lifecycle::{ArchiveLifecycleEngine, ArchiveRequest, ManualEntryEdit,
    ManualEntryRequest};

struct Harness {
    engine: ArchiveLifecycleEngine,
    archive: Arc<InMemoryArchive>,
    inventory: Arc<InMemoryInventory>,
    files: Arc<InMemoryFileStore>,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Engine wired to in-memory stores with a fixed clock.
fn harness(now: chrono::DateTime<Utc>) -> Harness {
    init_tracing();
    let archive = Arc::new(InMemoryArchive::new());
    let inventory = Arc::new(InMemoryInventory::new());
    let files = Arc::new(InMemoryFileStore::new());
    let engine = ArchiveLifecycleEngine::new(
        archive.clone(),
        archive.clone(),
        inventory.clone(),
        inventory.clone(),
        files.clone(),
    )
    .with_clock(Arc::new(FixedClock(now)));
    Harness {
        engine,
        archive,
        inventory,
        files,
    }
}

/// A moment well before the default compliance deadline (2026-04-24).
fn before_deadline() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap()
}

fn after_deadline() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap()
}

async fn insert_pdf(h: &Harness, path: &str, managed_file_id: i64) -> Asset {
    AssetRepository::insert(
        h.inventory.as_ref(),
        NewAsset {
            file_name: "report.pdf".to_string(),
            file_path: path.to_string(),
            asset_type: "pdf".to_string(),
            category: AssetCategory::Documents,
            mime_type: Some("application/pdf".to_string()),
            source_type: AssetSourceType::FileManaged,
            managed_file_id: Some(managed_file_id),
            file_size: Some(4),
            is_private: false,
            is_temporary: false,
        },
    )
    .await
    .unwrap()
}

fn request() -> ArchiveRequest {
    ArchiveRequest {
        reason: ArchiveReason::Recordkeeping,
        reason_other: None,
        public_description: Some("Annual report".to_string()),
        internal_notes: None,
        requested_by: "editor".to_string(),
    }
}

async fn add_usage(h: &Harness, asset: &Asset) {
    UsageRepository::insert(
        h.inventory.as_ref(),
        NewUsageRecord {
            asset_id: asset.id,
            entity_type: "node".to_string(),
            entity_id: "42".to_string(),
            field_name: Some("body".to_string()),
            embed_method: custodia_core::EmbedMethod::TextLink,
            count: 1,
        },
    )
    .await
    .unwrap();
}

// =============================================================================
// QUEUEING
// =============================================================================

#[tokio::test]
async fn test_mark_for_archive_queues_and_notes() {
    let h = harness(before_deadline());
    let asset = insert_pdf(&h, "public://report.pdf", 1).await;

    let record = h.engine.mark_for_archive(&asset, request()).await.unwrap();
    assert_eq!(record.status, ArchiveStatus::Queued);
    assert_eq!(record.managed_file_id, Some(1));
    assert!(record.checksum.is_none());
    assert!(record.classified_at.is_none());

    let notes = ArchiveNoteRepository::list(h.archive.as_ref(), record.id)
        .await
        .unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].author, "editor");
}

#[tokio::test]
async fn test_mark_for_archive_rejects_non_archivable_category() {
    let h = harness(before_deadline());
    let mut asset = insert_pdf(&h, "public://photo.jpg", 2).await;
    asset.category = AssetCategory::Images;

    let err = h.engine.mark_for_archive(&asset, request()).await.unwrap_err();
    assert!(matches!(err, Error::NotArchivable(_)));
}

#[tokio::test]
async fn test_mark_for_archive_rejects_duplicate_active() {
    let h = harness(before_deadline());
    let asset = insert_pdf(&h, "public://report.pdf", 1).await;

    h.engine.mark_for_archive(&asset, request()).await.unwrap();
    let err = h.engine.mark_for_archive(&asset, request()).await.unwrap_err();
    assert!(matches!(err, Error::DuplicateArchive(_)));
}

#[tokio::test]
async fn test_manual_entry_requires_page_or_external() {
    let h = harness(before_deadline());
    let err = h
        .engine
        .mark_manual_entry(ManualEntryRequest {
            url: "/files/x.pdf".to_string(),
            title: "X".to_string(),
            asset_type: "pdf".to_string(),
            reason: ArchiveReason::Reference,
            reason_other: None,
            public_description: None,
            internal_notes: None,
            requested_by: "editor".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
}

#[tokio::test]
async fn test_manual_entry_queue_and_edit() {
    let h = harness(before_deadline());
    let record = h
        .engine
        .mark_manual_entry(ManualEntryRequest {
            url: "https://example.org/old-catalog".to_string(),
            title: "Old catalog".to_string(),
            asset_type: "external".to_string(),
            reason: ArchiveReason::Reference,
            reason_other: None,
            public_description: None,
            internal_notes: None,
            requested_by: "editor".to_string(),
        })
        .await
        .unwrap();
    assert!(record.is_manual_entry());
    assert_eq!(record.status, ArchiveStatus::Queued);

    let edited = h
        .engine
        .update_manual_entry(
            record.id,
            ManualEntryEdit {
                title: Some("Catalog (2019)".to_string()),
                public_description: Some(Some("Kept for reference".to_string())),
                ..Default::default()
            },
            "editor",
        )
        .await
        .unwrap();
    assert_eq!(edited.file_name, "Catalog (2019)");
    assert_eq!(edited.public_description.as_deref(), Some("Kept for reference"));
}

// =============================================================================
// EXECUTION AND CLASSIFICATION
// =============================================================================

#[tokio::test]
async fn test_execute_before_deadline_is_legacy() {
    let h = harness(before_deadline());
    h.files.put("public://report.pdf", b"data".to_vec());
    let asset = insert_pdf(&h, "public://report.pdf", 1).await;
    let record = h.engine.mark_for_archive(&asset, request()).await.unwrap();

    let cfg = ArchiveConfig::default();
    let out = h
        .engine
        .execute_archive(&cfg, record.id, ArchiveVisibility::Public, "admin")
        .await
        .unwrap();

    assert_eq!(out.record.status, ArchiveStatus::ArchivedPublic);
    assert!(!out.record.flag_late_archive);
    assert!(out.record.is_legacy_archive());
    assert_eq!(out.record.classified_at, Some(before_deadline()));
    assert!(out.record.checksum.is_some());
    assert!(!out.checksum_deferred);
    assert_eq!(out.record.archived_by.as_deref(), Some("admin"));
}

#[tokio::test]
async fn test_execute_after_deadline_is_general() {
    let h = harness(after_deadline());
    h.files.put("public://report.pdf", b"data".to_vec());
    let asset = insert_pdf(&h, "public://report.pdf", 1).await;
    let record = h.engine.mark_for_archive(&asset, request()).await.unwrap();

    let cfg = ArchiveConfig::default();
    let out = h
        .engine
        .execute_archive(&cfg, record.id, ArchiveVisibility::Admin, "admin")
        .await
        .unwrap();

    assert_eq!(out.record.status, ArchiveStatus::ArchivedAdmin);
    assert!(out.record.flag_late_archive);
    assert!(!out.record.is_legacy_archive());
}

#[tokio::test]
async fn test_prior_void_forces_general_before_deadline() {
    let h = harness(before_deadline());
    h.files.put("public://report.pdf", b"data".to_vec());
    let asset = insert_pdf(&h, "public://report.pdf", 1).await;

    // First archive attempt ends in a voided exemption.
    let first = h.engine.mark_for_archive(&asset, request()).await.unwrap();
    let cfg = ArchiveConfig::default();
    h.engine
        .execute_archive(&cfg, first.id, ArchiveVisibility::Public, "admin")
        .await
        .unwrap();
    h.files.put("public://report.pdf", b"tampered".to_vec());
    let voided = h.engine.reconcile_status(first.id).await.unwrap();
    assert_eq!(voided.status, ArchiveStatus::ExemptionVoid);

    // Re-queue the same file; despite being before the deadline the
    // prior void forces General classification.
    h.files.put("public://report.pdf", b"data".to_vec());
    let second = h.engine.mark_for_archive(&asset, request()).await.unwrap();
    let out = h
        .engine
        .execute_archive(&cfg, second.id, ArchiveVisibility::Public, "admin")
        .await
        .unwrap();
    assert!(out.record.flag_prior_void);
    assert!(out.record.flag_late_archive);
    assert!(!out.record.is_legacy_archive());
}

#[tokio::test]
async fn test_execute_blocked_by_missing_file() {
    let h = harness(before_deadline());
    let asset = insert_pdf(&h, "public://report.pdf", 1).await;
    let record = h.engine.mark_for_archive(&asset, request()).await.unwrap();

    let cfg = ArchiveConfig::default();
    let err = h
        .engine
        .execute_archive(&cfg, record.id, ArchiveVisibility::Public, "admin")
        .await
        .unwrap_err();
    match err {
        Error::ExecutionBlocked(report) => {
            assert!(report
                .issues
                .iter()
                .any(|i| matches!(i, GateIssue::FileMissing { .. })));
        }
        other => panic!("expected ExecutionBlocked, got {other}"),
    }
    // Still queued after the refusal.
    let record = ArchiveRecordRepository::fetch(h.archive.as_ref(), record.id)
        .await
        .unwrap();
    assert_eq!(record.status, ArchiveStatus::Queued);
}

#[tokio::test]
async fn test_usage_gating_and_archive_in_use_policy() {
    let h = harness(before_deadline());
    h.files.put("public://report.pdf", b"data".to_vec());
    let asset = insert_pdf(&h, "public://report.pdf", 1).await;
    add_usage(&h, &asset).await;
    let record = h.engine.mark_for_archive(&asset, request()).await.unwrap();

    // Default policy refuses archiving in-use content.
    let cfg = ArchiveConfig::default();
    let err = h
        .engine
        .execute_archive(&cfg, record.id, ArchiveVisibility::Public, "admin")
        .await
        .unwrap_err();
    match err {
        Error::ExecutionBlocked(report) => {
            assert_eq!(report.blocked_usage_count(), Some(1));
        }
        other => panic!("expected ExecutionBlocked, got {other}"),
    }

    // With the policy enabled the same execution succeeds and records
    // the in-use condition.
    let cfg = ArchiveConfig::default().with_allow_archive_in_use(true);
    let out = h
        .engine
        .execute_archive(&cfg, record.id, ArchiveVisibility::Public, "admin")
        .await
        .unwrap();
    assert!(out.record.archived_while_in_use);
    assert!(out.record.flag_usage);
    assert_eq!(out.record.usage_at_archive, 1);
}

#[tokio::test]
async fn test_execute_rejected_outside_queued() {
    let h = harness(before_deadline());
    h.files.put("public://report.pdf", b"data".to_vec());
    let asset = insert_pdf(&h, "public://report.pdf", 1).await;
    let record = h.engine.mark_for_archive(&asset, request()).await.unwrap();

    let cfg = ArchiveConfig::default();
    h.engine
        .execute_archive(&cfg, record.id, ArchiveVisibility::Public, "admin")
        .await
        .unwrap();
    let err = h
        .engine
        .execute_archive(&cfg, record.id, ArchiveVisibility::Public, "admin")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidState {
            operation: "execute_archive",
            status: ArchiveStatus::ArchivedPublic
        }
    ));
}

// =============================================================================
// DEFERRED CHECKSUM
// =============================================================================

#[tokio::test]
async fn test_deferred_checksum_for_large_files() {
    let h = harness(before_deadline());
    h.files.put("public://report.pdf", b"data".to_vec());
    let asset = insert_pdf(&h, "public://report.pdf", 1).await;
    let record = h.engine.mark_for_archive(&asset, request()).await.unwrap();

    // file_size is 4 bytes; threshold of 2 forces deferral.
    let cfg = ArchiveConfig::default().with_deferred_checksum_bytes(Some(2));
    let out = h
        .engine
        .execute_archive(&cfg, record.id, ArchiveVisibility::Public, "admin")
        .await
        .unwrap();
    assert!(out.checksum_deferred);
    assert!(out.record.checksum.is_none());
    assert_eq!(out.record.status, ArchiveStatus::ArchivedPublic);

    // Pending-checksum records reconcile on existence alone.
    let reconciled = h.engine.reconcile_status(record.id).await.unwrap();
    assert_eq!(reconciled.status, ArchiveStatus::ArchivedPublic);
    assert!(!reconciled.flag_integrity);

    // The background completion lands the checksum once.
    let completed = h.engine.complete_deferred_checksum(record.id).await.unwrap();
    assert!(completed.checksum.is_some());
    // Re-running is a no-op, not an immutability violation.
    let again = h.engine.complete_deferred_checksum(record.id).await.unwrap();
    assert_eq!(again.checksum, completed.checksum);
}

// =============================================================================
// VISIBILITY
// =============================================================================

#[tokio::test]
async fn test_toggle_round_trip_preserves_classification() {
    let h = harness(before_deadline());
    h.files.put("public://report.pdf", b"data".to_vec());
    let asset = insert_pdf(&h, "public://report.pdf", 1).await;
    let record = h.engine.mark_for_archive(&asset, request()).await.unwrap();

    let cfg = ArchiveConfig::default();
    let out = h
        .engine
        .execute_archive(&cfg, record.id, ArchiveVisibility::Public, "admin")
        .await
        .unwrap();
    let classified_at = out.record.classified_at;

    let admin = h.engine.toggle_visibility(&cfg, record.id, "admin").await.unwrap();
    assert_eq!(admin.status, ArchiveStatus::ArchivedAdmin);
    let public = h.engine.toggle_visibility(&cfg, record.id, "admin").await.unwrap();
    assert_eq!(public.status, ArchiveStatus::ArchivedPublic);
    assert_eq!(public.classified_at, classified_at);
    assert!(!public.flag_late_archive);
}

#[tokio::test]
async fn test_toggle_to_public_blocked_when_in_use() {
    let h = harness(before_deadline());
    h.files.put("public://report.pdf", b"data".to_vec());
    let asset = insert_pdf(&h, "public://report.pdf", 1).await;
    let record = h.engine.mark_for_archive(&asset, request()).await.unwrap();

    let permissive = ArchiveConfig::default().with_allow_archive_in_use(true);
    h.engine
        .execute_archive(&permissive, record.id, ArchiveVisibility::Admin, "admin")
        .await
        .unwrap();
    add_usage(&h, &asset).await;

    // Restrictive policy blocks surfacing an in-use asset publicly.
    let strict = ArchiveConfig::default();
    let err = h
        .engine
        .toggle_visibility(&strict, record.id, "admin")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ExecutionBlocked(_)));

    // The permissive policy lets it through.
    let done = h
        .engine
        .toggle_visibility(&permissive, record.id, "admin")
        .await
        .unwrap();
    assert_eq!(done.status, ArchiveStatus::ArchivedPublic);

    // Toggling away from public is never usage-gated, even under the
    // strict policy.
    let back = h
        .engine
        .toggle_visibility(&strict, record.id, "admin")
        .await
        .unwrap();
    assert_eq!(back.status, ArchiveStatus::ArchivedAdmin);
}

// =============================================================================
// TERMINATION
// =============================================================================

#[tokio::test]
async fn test_unarchive_clears_warnings_preserves_late_flag() {
    let h = harness(after_deadline());
    h.files.put("public://report.pdf", b"data".to_vec());
    let asset = insert_pdf(&h, "public://report.pdf", 1).await;
    add_usage(&h, &asset).await;
    let record = h.engine.mark_for_archive(&asset, request()).await.unwrap();

    let cfg = ArchiveConfig::default().with_allow_archive_in_use(true);
    h.engine
        .execute_archive(&cfg, record.id, ArchiveVisibility::Public, "admin")
        .await
        .unwrap();

    let done = h.engine.unarchive(record.id, "admin").await.unwrap();
    assert_eq!(done.status, ArchiveStatus::ArchivedDeleted);
    assert!(!done.flag_usage);
    assert!(done.flag_late_archive); // classification outcome, not a warning
    assert_eq!(done.deleted_by.as_deref(), Some("admin"));
    assert_eq!(done.deleted_at, Some(after_deadline()));
}

#[tokio::test]
async fn test_unarchive_is_sole_exit_from_exemption_void() {
    let h = harness(before_deadline());
    h.files.put("public://report.pdf", b"data".to_vec());
    let asset = insert_pdf(&h, "public://report.pdf", 1).await;
    let record = h.engine.mark_for_archive(&asset, request()).await.unwrap();

    let cfg = ArchiveConfig::default();
    h.engine
        .execute_archive(&cfg, record.id, ArchiveVisibility::Public, "admin")
        .await
        .unwrap();
    h.files.put("public://report.pdf", b"tampered".to_vec());
    let voided = h.engine.reconcile_status(record.id).await.unwrap();
    assert_eq!(voided.status, ArchiveStatus::ExemptionVoid);

    // Every other operation refuses the terminal state.
    assert!(h.engine.toggle_visibility(&cfg, record.id, "admin").await.is_err());
    assert!(h.engine.remove_from_queue(record.id).await.is_err());
    assert!(h.engine.delete_file(record.id, "admin").await.is_err());

    // The corrective transition works exactly once.
    let done = h.engine.unarchive(record.id, "admin").await.unwrap();
    assert_eq!(done.status, ArchiveStatus::ArchivedDeleted);
    let err = h.engine.unarchive(record.id, "admin").await.unwrap_err();
    assert!(matches!(err, Error::InvalidState { .. }));
}

#[tokio::test]
async fn test_remove_from_queue_only_while_queued() {
    let h = harness(before_deadline());
    h.files.put("public://report.pdf", b"data".to_vec());
    let asset = insert_pdf(&h, "public://report.pdf", 1).await;
    let record = h.engine.mark_for_archive(&asset, request()).await.unwrap();

    h.engine.remove_from_queue(record.id).await.unwrap();
    let err = ArchiveRecordRepository::fetch(h.archive.as_ref(), record.id)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ArchiveNotFound(_)));
}

#[tokio::test]
async fn test_delete_file_removes_content_and_retires_record() {
    let h = harness(before_deadline());
    h.files.put("public://report.pdf", b"data".to_vec());
    let asset = insert_pdf(&h, "public://report.pdf", 1).await;
    let record = h.engine.mark_for_archive(&asset, request()).await.unwrap();

    let cfg = ArchiveConfig::default();
    h.engine
        .execute_archive(&cfg, record.id, ArchiveVisibility::Admin, "admin")
        .await
        .unwrap();

    let done = h.engine.delete_file(record.id, "admin").await.unwrap();
    assert_eq!(done.status, ArchiveStatus::ArchivedDeleted);
    assert!(!custodia_core::FileStore::exists(h.files.as_ref(), "public://report.pdf")
        .await
        .unwrap());
}

// =============================================================================
// RECONCILIATION
// =============================================================================

#[tokio::test]
async fn test_reconcile_intact_is_idempotent() {
    let h = harness(before_deadline());
    h.files.put("public://report.pdf", b"data".to_vec());
    let asset = insert_pdf(&h, "public://report.pdf", 1).await;
    let record = h.engine.mark_for_archive(&asset, request()).await.unwrap();

    let cfg = ArchiveConfig::default();
    h.engine
        .execute_archive(&cfg, record.id, ArchiveVisibility::Public, "admin")
        .await
        .unwrap();

    let first = h.engine.reconcile_status(record.id).await.unwrap();
    let second = h.engine.reconcile_status(record.id).await.unwrap();
    assert_eq!(first.status, ArchiveStatus::ArchivedPublic);
    assert_eq!(second.status, ArchiveStatus::ArchivedPublic);
    assert!(!second.flag_integrity);
    assert!(!second.flag_missing);
    assert!(!second.flag_modified);
}

#[tokio::test]
async fn test_reconcile_modified_legacy_voids_exemption() {
    let h = harness(before_deadline());
    h.files.put("public://report.pdf", b"data".to_vec());
    let asset = insert_pdf(&h, "public://report.pdf", 1).await;
    let record = h.engine.mark_for_archive(&asset, request()).await.unwrap();

    let cfg = ArchiveConfig::default();
    h.engine
        .execute_archive(&cfg, record.id, ArchiveVisibility::Public, "admin")
        .await
        .unwrap();

    h.files.put("public://report.pdf", b"tampered".to_vec());
    let voided = h.engine.reconcile_status(record.id).await.unwrap();
    assert_eq!(voided.status, ArchiveStatus::ExemptionVoid);
    assert!(voided.flag_modified);
    assert!(voided.flag_integrity);

    // Terminal: a second reconcile is a pure no-op.
    let again = h.engine.reconcile_status(record.id).await.unwrap();
    assert_eq!(again.status, ArchiveStatus::ExemptionVoid);

    // The automatic transition leaves a system audit note.
    let notes = ArchiveNoteRepository::list(h.archive.as_ref(), record.id)
        .await
        .unwrap();
    assert!(notes.iter().any(|n| n.author == "system"));
}

#[tokio::test]
async fn test_reconcile_missing_general_retires_record() {
    let h = harness(after_deadline());
    h.files.put("public://report.pdf", b"data".to_vec());
    let asset = insert_pdf(&h, "public://report.pdf", 1).await;
    let record = h.engine.mark_for_archive(&asset, request()).await.unwrap();

    let cfg = ArchiveConfig::default();
    h.engine
        .execute_archive(&cfg, record.id, ArchiveVisibility::Public, "admin")
        .await
        .unwrap();

    h.files.remove("public://report.pdf");
    let retired = h.engine.reconcile_status(record.id).await.unwrap();
    assert_eq!(retired.status, ArchiveStatus::ArchivedDeleted);
    assert!(retired.flag_missing);
    assert!(retired.flag_integrity);
    assert_eq!(retired.deleted_by.as_deref(), Some("system"));
}

#[tokio::test]
async fn test_reconcile_queued_flags_missing_without_transition() {
    let h = harness(before_deadline());
    let asset = insert_pdf(&h, "public://report.pdf", 1).await;
    let record = h.engine.mark_for_archive(&asset, request()).await.unwrap();

    let reconciled = h.engine.reconcile_status(record.id).await.unwrap();
    assert_eq!(reconciled.status, ArchiveStatus::Queued);
    assert!(reconciled.flag_missing);
    assert!(!reconciled.flag_integrity);
}

#[tokio::test]
async fn test_reconcile_refreshes_usage_flag() {
    let h = harness(before_deadline());
    h.files.put("public://report.pdf", b"data".to_vec());
    let asset = insert_pdf(&h, "public://report.pdf", 1).await;
    let record = h.engine.mark_for_archive(&asset, request()).await.unwrap();

    let cfg = ArchiveConfig::default();
    let out = h
        .engine
        .execute_archive(&cfg, record.id, ArchiveVisibility::Public, "admin")
        .await
        .unwrap();
    assert!(!out.record.flag_usage);

    add_usage(&h, &asset).await;
    let reconciled = h.engine.reconcile_status(record.id).await.unwrap();
    assert!(reconciled.flag_usage);
    // Advisory only: the record stays archived.
    assert_eq!(reconciled.status, ArchiveStatus::ArchivedPublic);
}

// =============================================================================
// ARCHIVE DETAIL URL
// =============================================================================

#[tokio::test]
async fn test_archive_detail_url_only_for_public_archives() {
    let h = harness(before_deadline());
    h.files.put("public://report.pdf", b"data".to_vec());
    let asset = insert_pdf(&h, "public://report.pdf", 1).await;
    let record = h.engine.mark_for_archive(&asset, request()).await.unwrap();
    let cfg = ArchiveConfig::default();

    // Queued records do not redirect.
    assert!(h
        .engine
        .archive_detail_url(&cfg, Some(1), "public://report.pdf")
        .await
        .unwrap()
        .is_none());

    h.engine
        .execute_archive(&cfg, record.id, ArchiveVisibility::Public, "admin")
        .await
        .unwrap();
    let url = h
        .engine
        .archive_detail_url(&cfg, Some(1), "public://report.pdf")
        .await
        .unwrap();
    assert_eq!(url, Some(format!("/archive/{}", record.id)));

    // Admin-only visibility hides the detail page.
    h.engine.toggle_visibility(&cfg, record.id, "admin").await.unwrap();
    assert!(h
        .engine
        .archive_detail_url(&cfg, Some(1), "public://report.pdf")
        .await
        .unwrap()
        .is_none());

    // Feature disabled: never a redirect.
    let disabled = ArchiveConfig::default().with_enabled(false);
    assert!(h
        .engine
        .archive_detail_url(&disabled, Some(1), "public://report.pdf")
        .await
        .unwrap()
        .is_none());
}
