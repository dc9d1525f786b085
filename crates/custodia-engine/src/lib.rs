//! Custodia engines: archive lifecycle and inventory reconciliation.
//!
//! Two engines sit on top of the repository traits in `custodia-core`:
//!
//! * [`lifecycle::ArchiveLifecycleEngine`] drives archive records through
//!   their state machine, from queueing through execution, visibility
//!   toggling, integrity reconciliation, and termination.
//! * [`scan::InventoryScanner`] rebuilds the asset/usage inventory from a
//!   site content source in fixed phases, staging into a temporary
//!   partition that atomically replaces the permanent one on success.
//!
//! Both engines are storage-agnostic and take `Arc<dyn Trait>` handles,
//! so they run unchanged against Postgres or the in-memory repositories.

pub mod extract;
pub mod integrity;
pub mod lifecycle;
pub mod scan;
pub mod source;

pub use extract::{extract_links, ExtractedLink};
pub use integrity::{IntegrityChecker, IntegrityStatus};
pub use lifecycle::{
    ArchiveLifecycleEngine, ArchiveRequest, ExecuteOutcome, ManualEntryEdit, ManualEntryRequest,
};
pub use scan::{InventoryScanner, ScanProgress, ScanReport, ScanTick};
pub use source::{FailingSource, InventorySource, SourceRecord, StaticSource, UsageRef};
