//! Inventory reconciliation scanner.
//!
//! Rebuilds the asset/usage inventory from the live site in five fixed
//! phases, writing every row into the temporary staging partition. On
//! overall success the staging partition atomically replaces the
//! permanent inventory; on any failure staging is discarded and the
//! prior inventory stays intact. Readers never observe a half-built
//! inventory.
//!
//! Phase order matters: the managed-file phase runs first so later
//! phases find and reuse the managed asset rows by path instead of
//! minting duplicates.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use custodia_core::{
    defaults, Asset, AssetCategory, AssetRepository, AssetSourceType, EmbedMethod, Error,
    InventoryMaintenance, NewAsset, NewUsageRecord, Result, ScanPhase, UsageRepository,
};

use crate::extract::extract_links;
use crate::source::{InventorySource, SourceRecord, UsageRef};

/// Resumable scan cursor, serializable so a host can checkpoint it
/// between chunks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanProgress {
    pub started_at: DateTime<Utc>,
    /// Index into [`ScanPhase::ALL`].
    pub phase_index: usize,
    /// Offset into the current phase's source records.
    pub offset: u64,
    /// Records processed per phase, aligned with [`ScanPhase::ALL`].
    pub processed: [u64; 5],
    pub complete: bool,
}

impl ScanProgress {
    pub fn start() -> Self {
        Self {
            started_at: Utc::now(),
            phase_index: 0,
            offset: 0,
            processed: [0; 5],
            complete: false,
        }
    }

    /// The phase the next chunk will draw from, `None` once complete.
    pub fn current_phase(&self) -> Option<ScanPhase> {
        if self.complete {
            None
        } else {
            ScanPhase::ALL.get(self.phase_index).copied()
        }
    }

    pub fn total_processed(&self) -> u64 {
        self.processed.iter().sum()
    }
}

/// Outcome of one scanner chunk.
#[derive(Debug, Clone)]
pub struct ScanTick {
    /// Phase the chunk drew from, `None` when nothing was left to do.
    pub phase: Option<ScanPhase>,
    pub records_processed: u64,
    /// All phases exhausted; staging is ready to finalize.
    pub complete: bool,
}

/// Summary of a completed scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub processed: [u64; 5],
    /// Size of the promoted permanent inventory.
    pub assets_total: i64,
}

/// The inventory scanner.
///
/// Drives [`InventorySource`] phases into the staging partition in
/// bounded chunks, sized so a host can interleave scanning with other
/// work and checkpoint [`ScanProgress`] between calls.
pub struct InventoryScanner {
    assets: Arc<dyn AssetRepository>,
    usage: Arc<dyn UsageRepository>,
    maintenance: Arc<dyn InventoryMaintenance>,
    source: Arc<dyn InventorySource>,
    batch_size: u64,
}

impl InventoryScanner {
    pub fn new(
        assets: Arc<dyn AssetRepository>,
        usage: Arc<dyn UsageRepository>,
        maintenance: Arc<dyn InventoryMaintenance>,
        source: Arc<dyn InventorySource>,
    ) -> Self {
        Self {
            assets,
            usage,
            maintenance,
            source,
            batch_size: defaults::SCAN_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: u64) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Process one bounded chunk of the current phase.
    ///
    /// An exhausted phase advances the cursor to the next phase; the tick
    /// for that call reports zero records. Never finalizes staging.
    pub async fn run_chunk(&self, progress: &mut ScanProgress) -> Result<ScanTick> {
        let phase = match progress.current_phase() {
            Some(phase) => phase,
            None => {
                return Ok(ScanTick {
                    phase: None,
                    records_processed: 0,
                    complete: true,
                })
            }
        };

        let batch = self
            .source
            .fetch(phase, progress.offset, self.batch_size)
            .await?;
        if batch.is_empty() {
            progress.phase_index += 1;
            progress.offset = 0;
            if progress.phase_index >= ScanPhase::ALL.len() {
                progress.complete = true;
            }
            return Ok(ScanTick {
                phase: Some(phase),
                records_processed: 0,
                complete: progress.complete,
            });
        }

        let n = batch.len() as u64;
        for record in batch {
            self.ingest(record).await?;
        }
        progress.offset += n;
        progress.processed[progress.phase_index] += n;

        info!(
            subsystem = "inventory",
            component = "scanner",
            op = "run_chunk",
            scan_phase = %phase,
            records = n,
            offset = progress.offset,
            "Scan chunk processed"
        );
        Ok(ScanTick {
            phase: Some(phase),
            records_processed: n,
            complete: false,
        })
    }

    /// Drive a scan from start to finish.
    ///
    /// On success the staging partition replaces the permanent inventory
    /// in one swap. On any error staging is discarded first and the error
    /// propagated; the previous inventory remains untouched.
    pub async fn run_to_completion(&self) -> Result<ScanReport> {
        let mut progress = ScanProgress::start();
        loop {
            match self.run_chunk(&mut progress).await {
                Ok(tick) if tick.complete => break,
                Ok(_) => {}
                Err(err) => {
                    warn!(
                        subsystem = "inventory",
                        component = "scanner",
                        op = "run_to_completion",
                        error = %err,
                        "Scan failed; discarding staging partition"
                    );
                    // The scan error is what the operator needs to see; a
                    // cleanup failure must not replace it.
                    if let Err(cleanup_err) = self.maintenance.clear_temporary_items().await {
                        warn!(
                            subsystem = "inventory",
                            component = "scanner",
                            op = "run_to_completion",
                            error = %cleanup_err,
                            "Staging cleanup failed after scan error"
                        );
                    }
                    return Err(err);
                }
            }
        }
        self.finalize(&progress).await
    }

    /// Promote the completed staging partition into the permanent
    /// inventory. The caller must have driven [`Self::run_chunk`] until
    /// complete.
    pub async fn finalize(&self, progress: &ScanProgress) -> Result<ScanReport> {
        if !progress.complete {
            return Err(Error::Scan(
                "cannot finalize a scan before all phases complete".to_string(),
            ));
        }
        self.maintenance.promote_temporary_items().await?;
        let assets_total = self.assets.count(false).await?;
        let report = ScanReport {
            started_at: progress.started_at,
            finished_at: Utc::now(),
            processed: progress.processed,
            assets_total,
        };
        info!(
            subsystem = "inventory",
            component = "scanner",
            op = "finalize",
            records = progress.total_processed(),
            assets_total,
            "Inventory promoted"
        );
        Ok(report)
    }

    /// Abandon an in-flight scan, discarding all staged rows.
    pub async fn abort(&self) -> Result<()> {
        self.maintenance.clear_temporary_items().await
    }

    // =========================================================================
    // INGESTION
    // =========================================================================

    async fn ingest(&self, record: SourceRecord) -> Result<()> {
        match record {
            SourceRecord::ManagedFile {
                file_id,
                uri,
                file_name,
                mime_type,
                file_size,
                is_private,
                media_managed,
                usages,
            } => {
                self.ingest_managed_file(
                    file_id,
                    uri,
                    file_name,
                    mime_type,
                    file_size,
                    is_private,
                    media_managed,
                    usages,
                )
                .await
            }
            SourceRecord::OrphanFile {
                uri,
                file_name,
                file_size,
            } => {
                let asset_type = asset_type_for_url(&uri);
                self.find_or_create_asset(NewAsset {
                    file_name,
                    file_path: uri,
                    category: AssetCategory::for_asset_type(&asset_type),
                    asset_type,
                    mime_type: None,
                    source_type: AssetSourceType::FilesystemOnly,
                    managed_file_id: None,
                    file_size,
                    is_private: false,
                    is_temporary: true,
                })
                .await?;
                Ok(())
            }
            SourceRecord::ContentField {
                entity_type,
                entity_id,
                field_name,
                html,
            } => {
                self.ingest_content_field(entity_type, entity_id, field_name, &html)
                    .await
            }
            SourceRecord::RemoteMedia {
                entity_type,
                entity_id,
                field_name,
                provider,
                url,
                title,
            } => {
                let asset = self
                    .find_or_create_asset(NewAsset {
                        file_name: title,
                        file_path: url,
                        category: AssetCategory::for_asset_type(&provider),
                        asset_type: provider,
                        mime_type: None,
                        source_type: AssetSourceType::External,
                        managed_file_id: None,
                        file_size: None,
                        is_private: false,
                        is_temporary: true,
                    })
                    .await?;
                self.usage
                    .insert(NewUsageRecord {
                        asset_id: asset.id,
                        entity_type,
                        entity_id,
                        field_name,
                        embed_method: EmbedMethod::FieldReference,
                        count: 1,
                    })
                    .await?;
                Ok(())
            }
            SourceRecord::MenuLink {
                link_id,
                url,
                title,
            } => {
                let asset_type = asset_type_for_url(&url);
                let source_type = if url.starts_with("http://") || url.starts_with("https://") {
                    AssetSourceType::External
                } else {
                    AssetSourceType::FilesystemOnly
                };
                let asset = self
                    .find_or_create_asset(NewAsset {
                        file_name: title,
                        file_path: url,
                        category: AssetCategory::for_asset_type(&asset_type),
                        asset_type,
                        mime_type: None,
                        source_type,
                        managed_file_id: None,
                        file_size: None,
                        is_private: false,
                        is_temporary: true,
                    })
                    .await?;
                self.usage
                    .insert(NewUsageRecord {
                        asset_id: asset.id,
                        entity_type: "menu_link".to_string(),
                        entity_id: link_id,
                        field_name: None,
                        embed_method: EmbedMethod::MenuLink,
                        count: 1,
                    })
                    .await?;
                Ok(())
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn ingest_managed_file(
        &self,
        file_id: i64,
        uri: String,
        file_name: String,
        mime_type: Option<String>,
        file_size: Option<i64>,
        is_private: bool,
        media_managed: bool,
        usages: Vec<UsageRef>,
    ) -> Result<()> {
        let asset_type = asset_type_for_url(&uri);
        let source_type = if media_managed {
            AssetSourceType::MediaManaged
        } else {
            AssetSourceType::FileManaged
        };
        let asset = match self.assets.find_by_managed_file(file_id, true).await? {
            Some(asset) => asset,
            None => {
                self.assets
                    .insert(NewAsset {
                        file_name,
                        file_path: uri,
                        category: AssetCategory::for_asset_type(&asset_type),
                        asset_type,
                        mime_type,
                        source_type,
                        managed_file_id: Some(file_id),
                        file_size,
                        is_private,
                        is_temporary: true,
                    })
                    .await?
            }
        };
        for usage in usages {
            self.usage
                .insert(NewUsageRecord {
                    asset_id: asset.id,
                    entity_type: usage.entity_type,
                    entity_id: usage.entity_id,
                    field_name: usage.field_name,
                    embed_method: EmbedMethod::FieldReference,
                    count: usage.count,
                })
                .await?;
        }
        Ok(())
    }

    async fn ingest_content_field(
        &self,
        entity_type: String,
        entity_id: String,
        field_name: String,
        html: &str,
    ) -> Result<()> {
        for link in extract_links(html) {
            // Media embed tokens reference media entities, not paths; the
            // managed-file phase already carries their tracked usage.
            if link.url.starts_with("media:") {
                continue;
            }
            let asset_type = asset_type_for_url(&link.url);
            let source_type = if link.url.starts_with("http://") || link.url.starts_with("https://")
            {
                AssetSourceType::External
            } else {
                AssetSourceType::FilesystemOnly
            };
            let asset = self
                .find_or_create_asset(NewAsset {
                    file_name: file_name_for_url(&link.url),
                    file_path: link.url.clone(),
                    category: AssetCategory::for_asset_type(&asset_type),
                    asset_type,
                    mime_type: None,
                    source_type,
                    managed_file_id: None,
                    file_size: None,
                    is_private: false,
                    is_temporary: true,
                })
                .await?;
            self.usage
                .insert(NewUsageRecord {
                    asset_id: asset.id,
                    entity_type: entity_type.clone(),
                    entity_id: entity_id.clone(),
                    field_name: Some(field_name.clone()),
                    embed_method: link.embed_method,
                    count: link.count,
                })
                .await?;
        }
        Ok(())
    }

    /// Find a staged asset by exact path, creating it if absent. Reuses
    /// rows minted by earlier phases under the same path.
    async fn find_or_create_asset(&self, new: NewAsset) -> Result<Asset> {
        if let Some(existing) = self.assets.find_by_path(&new.file_path, true).await? {
            return Ok(existing);
        }
        self.assets.insert(new).await
    }
}

/// Derive the asset type token for a URL: a known video provider, the
/// file extension when one is present, `page` for local extensionless
/// paths, `external` otherwise.
pub fn asset_type_for_url(url: &str) -> String {
    let lower = url.to_lowercase();
    if lower.contains("youtube.com/") || lower.contains("youtu.be/") {
        return "youtube".to_string();
    }
    if lower.contains("vimeo.com/") {
        return "vimeo".to_string();
    }

    // Extension of the path component, ignoring scheme, host, query and
    // fragment so hostname dots are never mistaken for extensions.
    let without_scheme = lower
        .strip_prefix("http://")
        .or_else(|| lower.strip_prefix("https://"))
        .map(|rest| rest.split_once('/').map_or("", |(_, p)| p))
        .unwrap_or(&lower);
    let path = without_scheme
        .split(['?', '#'])
        .next()
        .unwrap_or(without_scheme)
        .trim_end_matches('/');
    let last = path.rsplit('/').next().unwrap_or(path);
    if let Some((_, ext)) = last.rsplit_once('.') {
        if !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()) {
            return ext.to_string();
        }
    }

    if lower.starts_with("http://") || lower.starts_with("https://") {
        "external".to_string()
    } else {
        "page".to_string()
    }
}

/// Last path segment, for labeling assets discovered by URL alone.
fn file_name_for_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url).trim_end_matches('/');
    match path.rsplit('/').next() {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => url.to_string(),
    }
}
