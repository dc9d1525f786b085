//! Structured logging field-name constants for custodia.
//!
//! All crates use these constants for consistent structured logging
//! fields, so log aggregation tools can query by standardized names
//! across every subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle transitions, scan phase completions |
//! | DEBUG | Decision points, gate evaluations, config choices |
//! | TRACE | Per-row iteration during scans |

/// Subsystem originating the log event.
/// Values: "db", "archive", "scan"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "lifecycle", "integrity", "scanner", "pool"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "execute_archive", "reconcile_status", "run_chunk"
pub const OPERATION: &str = "op";

/// Archive record UUID being operated on.
pub const ARCHIVE_ID: &str = "archive_id";

/// Asset UUID being operated on.
pub const ASSET_ID: &str = "asset_id";

/// Archive status enum variant.
pub const STATUS: &str = "status";

/// Scan phase enum variant.
pub const SCAN_PHASE: &str = "scan_phase";

/// Elapsed wall time for the operation, in milliseconds.
pub const DURATION_MS: &str = "duration_ms";
