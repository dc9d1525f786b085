//! Asset repository implementation.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use custodia_core::{
    new_v7, Asset, AssetRepository, Error, NewAsset, Result,
};

/// PostgreSQL implementation of AssetRepository.
pub struct PgAssetRepository {
    pool: PgPool,
}

impl PgAssetRepository {
    /// Create a new PgAssetRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub(crate) fn asset_from_row(row: &PgRow) -> Result<Asset> {
    let category: String = row.try_get("category")?;
    let source_type: String = row.try_get("source_type")?;
    Ok(Asset {
        id: row.try_get("id")?,
        file_name: row.try_get("file_name")?,
        file_path: row.try_get("file_path")?,
        asset_type: row.try_get("asset_type")?,
        category: category.parse().map_err(Error::Internal)?,
        mime_type: row.try_get("mime_type")?,
        source_type: source_type.parse().map_err(Error::Internal)?,
        managed_file_id: row.try_get("managed_file_id")?,
        file_size: row.try_get("file_size")?,
        is_private: row.try_get("is_private")?,
        is_temporary: row.try_get("is_temporary")?,
        created_at: row.try_get("created_at")?,
    })
}

const ASSET_COLUMNS: &str = "id, file_name, file_path, asset_type, category, mime_type, \
     source_type, managed_file_id, file_size, is_private, is_temporary, created_at";

#[async_trait]
impl AssetRepository for PgAssetRepository {
    async fn insert(&self, asset: NewAsset) -> Result<Asset> {
        let id = new_v7();
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO asset (id, file_name, file_path, asset_type, category, mime_type,
                               source_type, managed_file_id, file_size, is_private,
                               is_temporary, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, NOW())
            RETURNING {ASSET_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&asset.file_name)
        .bind(&asset.file_path)
        .bind(&asset.asset_type)
        .bind(asset.category.to_string())
        .bind(&asset.mime_type)
        .bind(asset.source_type.to_string())
        .bind(asset.managed_file_id)
        .bind(asset.file_size)
        .bind(asset.is_private)
        .bind(asset.is_temporary)
        .fetch_one(&self.pool)
        .await?;

        asset_from_row(&row)
    }

    async fn fetch(&self, id: Uuid) -> Result<Asset> {
        let row = sqlx::query(&format!("SELECT {ASSET_COLUMNS} FROM asset WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(Error::AssetNotFound(id))?;
        asset_from_row(&row)
    }

    async fn find_by_path(&self, path: &str, temporary: bool) -> Result<Option<Asset>> {
        let row = sqlx::query(&format!(
            "SELECT {ASSET_COLUMNS} FROM asset WHERE file_path = $1 AND is_temporary = $2"
        ))
        .bind(path)
        .bind(temporary)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(asset_from_row).transpose()
    }

    async fn find_by_managed_file(
        &self,
        managed_file_id: i64,
        temporary: bool,
    ) -> Result<Option<Asset>> {
        let row = sqlx::query(&format!(
            "SELECT {ASSET_COLUMNS} FROM asset \
             WHERE managed_file_id = $1 AND is_temporary = $2"
        ))
        .bind(managed_file_id)
        .bind(temporary)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(asset_from_row).transpose()
    }

    async fn list(&self, temporary: bool, limit: i64, offset: i64) -> Result<Vec<Asset>> {
        let rows = sqlx::query(&format!(
            "SELECT {ASSET_COLUMNS} FROM asset WHERE is_temporary = $1 \
             ORDER BY file_path LIMIT $2 OFFSET $3"
        ))
        .bind(temporary)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(asset_from_row).collect()
    }

    async fn count(&self, temporary: bool) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM asset WHERE is_temporary = $1")
            .bind(temporary)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
