//! Centralized default constants for the custodia system.
//!
//! **This module is the single source of truth** for shared default
//! values. All crates reference these constants instead of defining their
//! own magic numbers.

// =============================================================================
// COMPLIANCE
// =============================================================================

/// Default compliance deadline (RFC 3339).
///
/// Archives classified before this instant are Legacy archives eligible
/// for the accessibility exemption; on/after it they are General archives.
pub const COMPLIANCE_DEADLINE: &str = "2026-04-24T00:00:00Z";

/// Default label shown next to archived content links.
pub const ARCHIVED_LABEL: &str = "Archived";

// =============================================================================
// SCANNING
// =============================================================================

/// Source rows processed per scan-chunk invocation.
pub const SCAN_BATCH_SIZE: u64 = 50;

// =============================================================================
// PAGINATION
// =============================================================================

/// Default page size for list endpoints.
pub const PAGE_LIMIT: i64 = 50;

/// Default page offset.
pub const PAGE_OFFSET: i64 = 0;

/// Internal "fetch everything" limit for aggregation queries.
pub const INTERNAL_FETCH_LIMIT: i64 = 10_000;
