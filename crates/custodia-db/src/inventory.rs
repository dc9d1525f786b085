//! Bulk staging maintenance for the inventory tables.
//!
//! The promote and clear operations implement the atomic inventory swap:
//! every step runs inside a single transaction, and usage rows are always
//! deleted before the asset rows they reference. Callers querying only
//! non-temporary rows therefore see either the complete previous
//! inventory or the complete new one, never a partial mix.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;

use custodia_core::{InventoryMaintenance, Result};

/// PostgreSQL implementation of InventoryMaintenance.
pub struct PgInventoryRepository {
    pool: PgPool,
}

impl PgInventoryRepository {
    /// Create a new PgInventoryRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InventoryMaintenance for PgInventoryRepository {
    async fn promote_temporary_items(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        // Usage first: usage_record has no FK, so ordering is the only
        // thing standing between us and orphaned usage rows.
        let usage_deleted = sqlx::query(
            "DELETE FROM usage_record WHERE asset_id IN \
             (SELECT id FROM asset WHERE is_temporary = FALSE)",
        )
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let assets_deleted = sqlx::query("DELETE FROM asset WHERE is_temporary = FALSE")
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let promoted = sqlx::query("UPDATE asset SET is_temporary = FALSE WHERE is_temporary = TRUE")
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;

        info!(
            subsystem = "db",
            component = "inventory",
            op = "promote_temporary_items",
            usage_deleted,
            assets_deleted,
            promoted,
            "Promoted temporary inventory"
        );
        Ok(())
    }

    async fn clear_temporary_items(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let usage_deleted = sqlx::query(
            "DELETE FROM usage_record WHERE asset_id IN \
             (SELECT id FROM asset WHERE is_temporary = TRUE)",
        )
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let assets_deleted = sqlx::query("DELETE FROM asset WHERE is_temporary = TRUE")
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;

        info!(
            subsystem = "db",
            component = "inventory",
            op = "clear_temporary_items",
            usage_deleted,
            assets_deleted,
            "Discarded temporary inventory staging"
        );
        Ok(())
    }

    async fn clear_usage_records(&self, temporary: bool) -> Result<()> {
        sqlx::query(
            "DELETE FROM usage_record WHERE asset_id IN \
             (SELECT id FROM asset WHERE is_temporary = $1)",
        )
        .bind(temporary)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
