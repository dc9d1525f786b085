//! Core data models for custodia.
//!
//! These types are shared across all custodia crates and represent the
//! asset inventory and archive lifecycle domain entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// ASSET TYPES
// =============================================================================

/// Coarse category of a discovered asset.
///
/// Only `Documents` and `Videos` are eligible for the archive queue; the
/// remaining categories exist so the inventory covers everything a content
/// site references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetCategory {
    Documents,
    Videos,
    Images,
    Audio,
    /// External pages and other off-site resources.
    External,
    Other,
}

impl AssetCategory {
    /// Whether assets of this category may enter the archive queue.
    pub fn is_archivable(self) -> bool {
        matches!(self, Self::Documents | Self::Videos)
    }

    /// Classify an asset type token (usually a file extension or provider
    /// name) into a category.
    pub fn for_asset_type(asset_type: &str) -> Self {
        match asset_type.to_lowercase().as_str() {
            "pdf" | "doc" | "docx" | "ppt" | "pptx" | "xls" | "xlsx" | "odt" | "ods" | "odp"
            | "rtf" => Self::Documents,
            "mp4" | "m4v" | "webm" | "mov" | "avi" | "mpeg" | "mpg" | "wmv" => Self::Videos,
            // Remote video providers count as Videos for archive eligibility.
            "youtube" | "vimeo" => Self::Videos,
            "jpg" | "jpeg" | "png" | "gif" | "webp" | "svg" | "bmp" | "tiff" => Self::Images,
            "mp3" | "wav" | "ogg" | "oga" | "m4a" | "aac" | "flac" => Self::Audio,
            "page" | "external" => Self::External,
            _ => Self::Other,
        }
    }
}

impl std::fmt::Display for AssetCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Documents => write!(f, "documents"),
            Self::Videos => write!(f, "videos"),
            Self::Images => write!(f, "images"),
            Self::Audio => write!(f, "audio"),
            Self::External => write!(f, "external"),
            Self::Other => write!(f, "other"),
        }
    }
}

impl std::str::FromStr for AssetCategory {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "documents" => Ok(Self::Documents),
            "videos" => Ok(Self::Videos),
            "images" => Ok(Self::Images),
            "audio" => Ok(Self::Audio),
            "external" => Ok(Self::External),
            "other" => Ok(Self::Other),
            _ => Err(format!("Invalid asset category: {}", s)),
        }
    }
}

/// Where an asset row came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetSourceType {
    /// Tracked by the CMS managed-file store.
    FileManaged,
    /// Wrapped in a CMS media entity.
    MediaManaged,
    /// Present on disk but unknown to the CMS (orphan).
    FilesystemOnly,
    /// Off-site URL (remote video, external page, ...).
    External,
}

impl std::fmt::Display for AssetSourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FileManaged => write!(f, "file_managed"),
            Self::MediaManaged => write!(f, "media_managed"),
            Self::FilesystemOnly => write!(f, "filesystem_only"),
            Self::External => write!(f, "external"),
        }
    }
}

impl std::str::FromStr for AssetSourceType {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "file_managed" => Ok(Self::FileManaged),
            "media_managed" => Ok(Self::MediaManaged),
            "filesystem_only" => Ok(Self::FilesystemOnly),
            "external" => Ok(Self::External),
            _ => Err(format!("Invalid asset source type: {}", s)),
        }
    }
}

/// How a usage site embeds the asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmbedMethod {
    /// CMS media embed token in rich text.
    MediaEmbed,
    /// Entity field referencing a managed file.
    FieldReference,
    Html5Video,
    Html5Audio,
    /// Anchor element pointing at a file.
    TextLink,
    /// Inline `<img>` element in rich text.
    InlineImage,
    ObjectEmbed,
    EmbedElement,
    /// Bare URL pasted into text.
    TextUrl,
    /// Dedicated link field.
    LinkField,
    MenuLink,
}

impl std::fmt::Display for EmbedMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MediaEmbed => write!(f, "media-embed"),
            Self::FieldReference => write!(f, "field-reference"),
            Self::Html5Video => write!(f, "html5-video"),
            Self::Html5Audio => write!(f, "html5-audio"),
            Self::TextLink => write!(f, "text-link"),
            Self::InlineImage => write!(f, "inline-image"),
            Self::ObjectEmbed => write!(f, "object-embed"),
            Self::EmbedElement => write!(f, "embed-element"),
            Self::TextUrl => write!(f, "text-url"),
            Self::LinkField => write!(f, "link-field"),
            Self::MenuLink => write!(f, "menu-link"),
        }
    }
}

impl std::str::FromStr for EmbedMethod {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "media-embed" => Ok(Self::MediaEmbed),
            "field-reference" => Ok(Self::FieldReference),
            "html5-video" => Ok(Self::Html5Video),
            "html5-audio" => Ok(Self::Html5Audio),
            "text-link" => Ok(Self::TextLink),
            "inline-image" => Ok(Self::InlineImage),
            "object-embed" => Ok(Self::ObjectEmbed),
            "embed-element" => Ok(Self::EmbedElement),
            "text-url" => Ok(Self::TextUrl),
            "link-field" => Ok(Self::LinkField),
            "menu-link" => Ok(Self::MenuLink),
            _ => Err(format!("Invalid embed method: {}", s)),
        }
    }
}

/// One row per discovered file or external URL.
///
/// Exactly one non-temporary row exists per resolved physical file/URL at
/// any time. During a scan, temporary and non-temporary rows for the same
/// logical asset coexist until the scan promotes or discards its staging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub id: Uuid,
    pub file_name: String,
    /// URI/URL exactly as discovered.
    pub file_path: String,
    /// Type token: file extension or remote provider name.
    pub asset_type: String,
    pub category: AssetCategory,
    pub mime_type: Option<String>,
    pub source_type: AssetSourceType,
    /// Foreign key into the CMS managed-file store, when tracked there.
    pub managed_file_id: Option<i64>,
    pub file_size: Option<i64>,
    pub is_private: bool,
    /// Staging flag: rows written during a scan start temporary and are
    /// promoted in bulk on scan success.
    pub is_temporary: bool,
    pub created_at: DateTime<Utc>,
}

/// One row per place an asset is referenced.
///
/// Usage rows are always deleted before the asset rows they reference;
/// storage-level referential integrity cannot be assumed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRecord {
    pub id: Uuid,
    pub asset_id: Uuid,
    pub entity_type: String,
    pub entity_id: String,
    pub field_name: Option<String>,
    pub embed_method: EmbedMethod,
    /// Reference count at this usage site.
    pub count: i64,
}

// =============================================================================
// ARCHIVE TYPES
// =============================================================================

/// Archive lifecycle state machine.
///
/// `Queued → ArchivedPublic ⇄ ArchivedAdmin`; either archived state may
/// reach the terminals `ArchivedDeleted` or (automatically, on integrity
/// violation of a Legacy archive) `ExemptionVoid`. The single corrective
/// transition out of a terminal state is `ExemptionVoid → ArchivedDeleted`
/// via unarchive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveStatus {
    Queued,
    ArchivedPublic,
    ArchivedAdmin,
    /// Terminal: unarchived, file-deleted, or modified General archive.
    ArchivedDeleted,
    /// Terminal: a Legacy archive was found modified after archiving.
    /// A permanent compliance-violation record.
    ExemptionVoid,
}

impl ArchiveStatus {
    /// Whether this is one of the two retained terminal states.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::ArchivedDeleted | Self::ExemptionVoid)
    }

    /// Whether the record is actively archived (publicly or admin-only).
    pub fn is_active_archive(self) -> bool {
        matches!(self, Self::ArchivedPublic | Self::ArchivedAdmin)
    }
}

impl std::fmt::Display for ArchiveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Queued => write!(f, "queued"),
            Self::ArchivedPublic => write!(f, "archived_public"),
            Self::ArchivedAdmin => write!(f, "archived_admin"),
            Self::ArchivedDeleted => write!(f, "archived_deleted"),
            Self::ExemptionVoid => write!(f, "exemption_void"),
        }
    }
}

impl std::str::FromStr for ArchiveStatus {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "queued" => Ok(Self::Queued),
            "archived_public" => Ok(Self::ArchivedPublic),
            "archived_admin" => Ok(Self::ArchivedAdmin),
            "archived_deleted" => Ok(Self::ArchivedDeleted),
            "exemption_void" => Ok(Self::ExemptionVoid),
            _ => Err(format!("Invalid archive status: {}", s)),
        }
    }
}

/// Stated reason for retaining an asset in the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveReason {
    Reference,
    Research,
    Recordkeeping,
    Other,
}

impl std::fmt::Display for ArchiveReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reference => write!(f, "reference"),
            Self::Research => write!(f, "research"),
            Self::Recordkeeping => write!(f, "recordkeeping"),
            Self::Other => write!(f, "other"),
        }
    }
}

impl std::str::FromStr for ArchiveReason {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reference" => Ok(Self::Reference),
            "research" => Ok(Self::Research),
            "recordkeeping" => Ok(Self::Recordkeeping),
            "other" => Ok(Self::Other),
            _ => Err(format!("Invalid archive reason: {}", s)),
        }
    }
}

/// Requested visibility when executing an archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveVisibility {
    Public,
    Admin,
}

impl ArchiveVisibility {
    /// The active archived status this visibility maps to.
    pub fn status(self) -> ArchiveStatus {
        match self {
            Self::Public => ArchiveStatus::ArchivedPublic,
            Self::Admin => ArchiveStatus::ArchivedAdmin,
        }
    }
}

/// One row per asset or external resource ever queued for archival.
///
/// Never physically deleted once executed; terminal states are retained
/// for audit. `checksum` and `classified_at` are write-once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveRecord {
    pub id: Uuid,
    pub status: ArchiveStatus,
    /// Null for manual/external entries.
    pub managed_file_id: Option<i64>,
    pub original_path: String,
    pub file_name: String,
    pub asset_type: String,
    pub mime_type: Option<String>,
    pub file_size: Option<i64>,
    pub is_private: bool,
    pub reason: ArchiveReason,
    /// Free text accompanying `ArchiveReason::Other`.
    pub reason_other: Option<String>,
    pub public_description: Option<String>,
    pub internal_notes: Option<String>,
    /// SHA-256 hex digest of file content, set at execution time.
    /// Immutable thereafter. Null until a deferred computation completes,
    /// and always null for manual/external entries.
    pub checksum: Option<String>,
    /// Moment of Legacy/General classification, set at execution time.
    /// Immutable thereafter; never recomputed when the deadline changes.
    pub classified_at: Option<DateTime<Utc>>,
    /// Advisory: the asset is currently referenced by content.
    pub flag_usage: bool,
    /// The underlying file could not be resolved.
    pub flag_missing: bool,
    /// An integrity violation (modified or missing content) was recorded.
    pub flag_integrity: bool,
    /// Checksum recomputation found different content.
    pub flag_modified: bool,
    /// Classified as General archive (on/after deadline or prior void).
    pub flag_late_archive: bool,
    /// A prior record for the same file ended in `ExemptionVoid`.
    pub flag_prior_void: bool,
    pub archived_while_in_use: bool,
    pub usage_at_archive: i64,
    pub archived_by: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ArchiveRecord {
    /// Manual entries have no managed file and an external asset type.
    /// They are the only editable records.
    pub fn is_manual_entry(&self) -> bool {
        self.managed_file_id.is_none()
            && matches!(self.asset_type.as_str(), "page" | "external")
    }

    /// Whether the record carries a physical file custodia must guard.
    pub fn is_file_based(&self) -> bool {
        !self.is_manual_entry()
    }

    /// Legacy archives were classified before the compliance deadline and
    /// claim the accessibility exemption while unmodified.
    pub fn is_legacy_archive(&self) -> bool {
        self.classified_at.is_some() && !self.flag_late_archive
    }

    pub fn can_execute_archive(&self) -> bool {
        self.status == ArchiveStatus::Queued
    }

    pub fn can_toggle_visibility(&self) -> bool {
        self.status.is_active_archive()
    }

    /// Unarchive is the designated undo path: allowed from any active
    /// archived status and, as the sole corrective action, from
    /// `ExemptionVoid`.
    pub fn can_unarchive(&self) -> bool {
        self.status.is_active_archive() || self.status == ArchiveStatus::ExemptionVoid
    }

    pub fn can_remove_from_queue(&self) -> bool {
        self.status == ArchiveStatus::Queued
    }

    pub fn can_delete_file(&self) -> bool {
        self.status.is_active_archive() && self.is_file_based()
    }

    pub fn can_edit(&self) -> bool {
        self.is_manual_entry() && !self.status.is_terminal()
    }

    /// Clear every warning flag (used by unarchive).
    pub fn clear_warning_flags(&mut self) {
        self.flag_usage = false;
        self.flag_missing = false;
        self.flag_integrity = false;
        self.flag_modified = false;
        self.flag_prior_void = false;
    }
}

/// Append-only audit log entry attached to an archive record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveNote {
    pub id: Uuid,
    pub archive_id: Uuid,
    pub text: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// EXECUTION GATES
// =============================================================================

/// One blocking issue found by the execution gates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum GateIssue {
    /// The physical file/URL could no longer be resolved.
    FileMissing { path: String },
    /// The asset is in use and the archive-in-use policy is disabled.
    /// Carries the live usage count so callers can present remediation.
    UsagePolicyBlocked { usage_count: i64 },
}

/// Structured result of gate validation; empty means clear to execute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateReport {
    pub issues: Vec<GateIssue>,
}

impl GateReport {
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn push(&mut self, issue: GateIssue) {
        self.issues.push(issue);
    }

    /// The live usage count, when usage policy is among the issues.
    pub fn blocked_usage_count(&self) -> Option<i64> {
        self.issues.iter().find_map(|i| match i {
            GateIssue::UsagePolicyBlocked { usage_count } => Some(*usage_count),
            _ => None,
        })
    }
}

impl std::fmt::Display for GateReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for issue in &self.issues {
            if !first {
                write!(f, ", ")?;
            }
            first = false;
            match issue {
                GateIssue::FileMissing { path } => write!(f, "file_missing({})", path)?,
                GateIssue::UsagePolicyBlocked { usage_count } => {
                    write!(f, "usage_policy_blocked(count={})", usage_count)?
                }
            }
        }
        if first {
            write!(f, "clear")?;
        }
        Ok(())
    }
}

// =============================================================================
// SCAN TYPES
// =============================================================================

/// Inventory scan phase. Phases run in the fixed order of [`ScanPhase::ALL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanPhase {
    /// CMS managed-file store rows (with their recorded usage).
    ManagedFiles,
    /// Files on disk unknown to the CMS.
    OrphanFiles,
    /// Links extracted from rich-text content fields.
    ContentLinks,
    /// Remote/oEmbed media entities.
    RemoteMedia,
    /// Menu link entries.
    MenuLinks,
}

impl ScanPhase {
    /// Fixed execution order of scan phases. Content-link extraction runs
    /// after the managed-file phase so path hits reuse managed assets.
    pub const ALL: [ScanPhase; 5] = [
        ScanPhase::ManagedFiles,
        ScanPhase::OrphanFiles,
        ScanPhase::ContentLinks,
        ScanPhase::RemoteMedia,
        ScanPhase::MenuLinks,
    ];
}

impl std::fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ManagedFiles => write!(f, "managed_files"),
            Self::OrphanFiles => write!(f, "orphan_files"),
            Self::ContentLinks => write!(f, "content_links"),
            Self::RemoteMedia => write!(f, "remote_media"),
            Self::MenuLinks => write!(f, "menu_links"),
        }
    }
}

impl std::str::FromStr for ScanPhase {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "managed_files" => Ok(Self::ManagedFiles),
            "orphan_files" => Ok(Self::OrphanFiles),
            "content_links" => Ok(Self::ContentLinks),
            "remote_media" => Ok(Self::RemoteMedia),
            "menu_links" => Ok(Self::MenuLinks),
            _ => Err(format!("Invalid scan phase: {}", s)),
        }
    }
}
