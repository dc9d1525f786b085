//! # custodia-db
//!
//! PostgreSQL persistence layer for the custodia asset archive.
//!
//! This crate provides:
//! - Connection pool management
//! - Repository implementations for the four persisted entities
//!   (`asset`, `usage_record`, `archive_record`, `archive_note`)
//! - The transactional promote/clear inventory swap
//! - A filesystem-backed file store
//! - Deterministic in-memory repositories for tests and embedded use
//!
//! ## Example
//!
//! ```rust,ignore
//! use custodia_db::Database;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/custodia").await?;
//!     let queued = db
//!         .archive_records
//!         .list(Default::default())
//!         .await?;
//!     println!("{} archive records", queued.len());
//!     Ok(())
//! }
//! ```

pub mod archive_notes;
pub mod archive_records;
pub mod assets;
pub mod files;
pub mod inventory;
pub mod memory;
pub mod pool;
pub mod usage;

// Test fixtures for integration tests.
// Always compiled so integration tests (in tests/) can use them.
pub mod test_fixtures;

// Re-export core types
pub use custodia_core::*;

// Re-export repository implementations
pub use archive_notes::PgArchiveNoteRepository;
pub use archive_records::PgArchiveRecordRepository;
pub use assets::PgAssetRepository;
pub use files::FilesystemStore;
pub use inventory::PgInventoryRepository;
pub use memory::{FixedClock, InMemoryArchive, InMemoryFileStore, InMemoryInventory};
pub use pool::{create_pool, create_pool_with_config, PoolConfig};
pub use usage::PgUsageRepository;

/// Embedded sqlx migrations for the custodia schema.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Combined database context with all repositories.
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::PgPool,
    /// Asset repository (inventory, owned by the reconciliation engine).
    pub assets: PgAssetRepository,
    /// Usage record repository.
    pub usage: PgUsageRepository,
    /// Bulk staging maintenance (promote/clear swap).
    pub inventory: PgInventoryRepository,
    /// Archive record repository with write-once enforcement.
    pub archive_records: PgArchiveRecordRepository,
    /// Append-only audit note repository.
    pub archive_notes: PgArchiveNoteRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self {
            assets: PgAssetRepository::new(pool.clone()),
            usage: PgUsageRepository::new(pool.clone()),
            inventory: PgInventoryRepository::new(pool.clone()),
            archive_records: PgArchiveRecordRepository::new(pool.clone()),
            archive_notes: PgArchiveNoteRepository::new(pool.clone()),
            pool,
        }
    }

    /// Connect to the database and construct all repositories.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = create_pool(database_url).await?;
        Ok(Self::new(pool))
    }

    /// Connect and run pending migrations.
    pub async fn connect_and_migrate(database_url: &str) -> Result<Self> {
        let db = Self::connect(database_url).await?;
        MIGRATOR
            .run(&db.pool)
            .await
            .map_err(|e| Error::Internal(format!("Migration failed: {}", e)))?;
        Ok(db)
    }
}
