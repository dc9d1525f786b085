//! Usage record repository implementation.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use custodia_core::{new_v7, Error, NewUsageRecord, Result, UsageRecord, UsageRepository};

/// PostgreSQL implementation of UsageRepository.
pub struct PgUsageRepository {
    pool: PgPool,
}

impl PgUsageRepository {
    /// Create a new PgUsageRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn usage_from_row(row: &PgRow) -> Result<UsageRecord> {
    let embed_method: String = row.try_get("embed_method")?;
    Ok(UsageRecord {
        id: row.try_get("id")?,
        asset_id: row.try_get("asset_id")?,
        entity_type: row.try_get("entity_type")?,
        entity_id: row.try_get("entity_id")?,
        field_name: row.try_get("field_name")?,
        embed_method: embed_method.parse().map_err(Error::Internal)?,
        count: row.try_get("count")?,
    })
}

#[async_trait]
impl UsageRepository for PgUsageRepository {
    async fn insert(&self, usage: NewUsageRecord) -> Result<UsageRecord> {
        let id = new_v7();
        let row = sqlx::query(
            r#"
            INSERT INTO usage_record (id, asset_id, entity_type, entity_id, field_name,
                                      embed_method, count)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, asset_id, entity_type, entity_id, field_name, embed_method, count
            "#,
        )
        .bind(id)
        .bind(usage.asset_id)
        .bind(&usage.entity_type)
        .bind(&usage.entity_id)
        .bind(&usage.field_name)
        .bind(usage.embed_method.to_string())
        .bind(usage.count)
        .fetch_one(&self.pool)
        .await?;

        usage_from_row(&row)
    }

    async fn list_for_asset(&self, asset_id: Uuid) -> Result<Vec<UsageRecord>> {
        let rows = sqlx::query(
            "SELECT id, asset_id, entity_type, entity_id, field_name, embed_method, count \
             FROM usage_record WHERE asset_id = $1 ORDER BY id",
        )
        .bind(asset_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(usage_from_row).collect()
    }

    async fn usage_count(&self, asset_id: Uuid) -> Result<i64> {
        let count: Option<i64> = sqlx::query_scalar(
            "SELECT SUM(count)::BIGINT FROM usage_record WHERE asset_id = $1",
        )
        .bind(asset_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count.unwrap_or(0))
    }
}
