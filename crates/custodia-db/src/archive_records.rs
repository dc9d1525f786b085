//! Archive record repository implementation.
//!
//! Enforces the write-once contract on `checksum` and `classified_at`:
//! updates are conditional on those fields being unset or unchanged, and
//! an attempt to alter a set value surfaces `Error::ImmutableField`
//! without persisting anything.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use custodia_core::{
    new_v7, ArchiveRecord, ArchiveRecordRepository, ArchiveStatus, Error, ListArchivesRequest,
    NewArchiveRecord, Result,
};

const RECORD_COLUMNS: &str = "id, status, managed_file_id, original_path, file_name, asset_type, \
     mime_type, file_size, is_private, reason, reason_other, public_description, internal_notes, \
     checksum, classified_at, flag_usage, flag_missing, flag_integrity, flag_modified, \
     flag_late_archive, flag_prior_void, archived_while_in_use, usage_at_archive, archived_by, \
     deleted_at, deleted_by, created_at, updated_at";

const ACTIVE_STATUSES: &str = "('queued', 'archived_public', 'archived_admin')";

/// PostgreSQL implementation of ArchiveRecordRepository.
pub struct PgArchiveRecordRepository {
    pool: PgPool,
}

impl PgArchiveRecordRepository {
    /// Create a new PgArchiveRecordRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub(crate) fn record_from_row(row: &PgRow) -> Result<ArchiveRecord> {
    let status: String = row.try_get("status")?;
    let reason: String = row.try_get("reason")?;
    Ok(ArchiveRecord {
        id: row.try_get("id")?,
        status: status.parse().map_err(Error::Internal)?,
        managed_file_id: row.try_get("managed_file_id")?,
        original_path: row.try_get("original_path")?,
        file_name: row.try_get("file_name")?,
        asset_type: row.try_get("asset_type")?,
        mime_type: row.try_get("mime_type")?,
        file_size: row.try_get("file_size")?,
        is_private: row.try_get("is_private")?,
        reason: reason.parse().map_err(Error::Internal)?,
        reason_other: row.try_get("reason_other")?,
        public_description: row.try_get("public_description")?,
        internal_notes: row.try_get("internal_notes")?,
        checksum: row.try_get("checksum")?,
        classified_at: row.try_get("classified_at")?,
        flag_usage: row.try_get("flag_usage")?,
        flag_missing: row.try_get("flag_missing")?,
        flag_integrity: row.try_get("flag_integrity")?,
        flag_modified: row.try_get("flag_modified")?,
        flag_late_archive: row.try_get("flag_late_archive")?,
        flag_prior_void: row.try_get("flag_prior_void")?,
        archived_while_in_use: row.try_get("archived_while_in_use")?,
        usage_at_archive: row.try_get("usage_at_archive")?,
        archived_by: row.try_get("archived_by")?,
        deleted_at: row.try_get("deleted_at")?,
        deleted_by: row.try_get("deleted_by")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl ArchiveRecordRepository for PgArchiveRecordRepository {
    async fn insert(&self, record: NewArchiveRecord) -> Result<ArchiveRecord> {
        let id = new_v7();
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO archive_record (id, status, managed_file_id, original_path, file_name,
                                        asset_type, mime_type, file_size, is_private, reason,
                                        reason_other, public_description, internal_notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {RECORD_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(ArchiveStatus::Queued.to_string())
        .bind(record.managed_file_id)
        .bind(&record.original_path)
        .bind(&record.file_name)
        .bind(&record.asset_type)
        .bind(&record.mime_type)
        .bind(record.file_size)
        .bind(record.is_private)
        .bind(record.reason.to_string())
        .bind(&record.reason_other)
        .bind(&record.public_description)
        .bind(&record.internal_notes)
        .fetch_one(&self.pool)
        .await?;

        record_from_row(&row)
    }

    async fn fetch(&self, id: Uuid) -> Result<ArchiveRecord> {
        let row = sqlx::query(&format!(
            "SELECT {RECORD_COLUMNS} FROM archive_record WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(Error::ArchiveNotFound(id))?;
        record_from_row(&row)
    }

    async fn update(&self, record: &ArchiveRecord) -> Result<()> {
        // The WHERE clause is the immutability guard: a row whose checksum
        // or classification date is already set to a different value is
        // never touched.
        let result = sqlx::query(
            r#"
            UPDATE archive_record SET
                status = $2, reason = $3, reason_other = $4, public_description = $5,
                internal_notes = $6, file_name = $7, checksum = $8, classified_at = $9,
                flag_usage = $10, flag_missing = $11, flag_integrity = $12,
                flag_modified = $13, flag_late_archive = $14, flag_prior_void = $15,
                archived_while_in_use = $16, usage_at_archive = $17, archived_by = $18,
                deleted_at = $19, deleted_by = $20, updated_at = NOW()
            WHERE id = $1
              AND (checksum IS NULL OR checksum = $8)
              AND (classified_at IS NULL OR classified_at = $9)
            "#,
        )
        .bind(record.id)
        .bind(record.status.to_string())
        .bind(record.reason.to_string())
        .bind(&record.reason_other)
        .bind(&record.public_description)
        .bind(&record.internal_notes)
        .bind(&record.file_name)
        .bind(&record.checksum)
        .bind(record.classified_at)
        .bind(record.flag_usage)
        .bind(record.flag_missing)
        .bind(record.flag_integrity)
        .bind(record.flag_modified)
        .bind(record.flag_late_archive)
        .bind(record.flag_prior_void)
        .bind(record.archived_while_in_use)
        .bind(record.usage_at_archive)
        .bind(&record.archived_by)
        .bind(record.deleted_at)
        .bind(&record.deleted_by)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Distinguish a missing row from an immutability violation.
            let existing = self.fetch(record.id).await?;
            if existing.checksum.is_some() && existing.checksum != record.checksum {
                return Err(Error::ImmutableField("checksum"));
            }
            if existing.classified_at.is_some() && existing.classified_at != record.classified_at {
                return Err(Error::ImmutableField("classified_at"));
            }
            return Err(Error::ArchiveNotFound(record.id));
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        // Notes first: archive_note carries a real FK to archive_record.
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM archive_note WHERE archive_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM archive_record WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        if result.rows_affected() == 0 {
            return Err(Error::ArchiveNotFound(id));
        }
        Ok(())
    }

    async fn find_active(
        &self,
        managed_file_id: Option<i64>,
        path: &str,
    ) -> Result<Option<ArchiveRecord>> {
        let row = match managed_file_id {
            Some(fid) => {
                sqlx::query(&format!(
                    "SELECT {RECORD_COLUMNS} FROM archive_record \
                     WHERE managed_file_id = $1 AND status IN {ACTIVE_STATUSES} LIMIT 1"
                ))
                .bind(fid)
                .fetch_optional(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {RECORD_COLUMNS} FROM archive_record \
                     WHERE original_path = $1 AND status IN {ACTIVE_STATUSES} LIMIT 1"
                ))
                .bind(path)
                .fetch_optional(&self.pool)
                .await?
            }
        };
        row.as_ref().map(record_from_row).transpose()
    }

    async fn has_prior_void(&self, managed_file_id: Option<i64>, path: &str) -> Result<bool> {
        let count: i64 = match managed_file_id {
            Some(fid) => {
                sqlx::query_scalar(
                    "SELECT COUNT(*) FROM archive_record \
                     WHERE managed_file_id = $1 AND status = 'exemption_void'",
                )
                .bind(fid)
                .fetch_one(&self.pool)
                .await?
            }
            None => {
                sqlx::query_scalar(
                    "SELECT COUNT(*) FROM archive_record \
                     WHERE original_path = $1 AND status = 'exemption_void'",
                )
                .bind(path)
                .fetch_one(&self.pool)
                .await?
            }
        };
        Ok(count > 0)
    }

    async fn list(&self, req: ListArchivesRequest) -> Result<Vec<ArchiveRecord>> {
        let limit = req.limit.unwrap_or(custodia_core::defaults::PAGE_LIMIT);
        let offset = req.offset.unwrap_or(custodia_core::defaults::PAGE_OFFSET);
        let statuses: Vec<String> = req.statuses.iter().map(|s| s.to_string()).collect();

        let rows = if statuses.is_empty() {
            sqlx::query(&format!(
                "SELECT {RECORD_COLUMNS} FROM archive_record \
                 ORDER BY created_at DESC LIMIT $1 OFFSET $2"
            ))
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query(&format!(
                "SELECT {RECORD_COLUMNS} FROM archive_record \
                 WHERE status = ANY($1::text[]) \
                 ORDER BY created_at DESC LIMIT $2 OFFSET $3"
            ))
            .bind(&statuses)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?
        };
        rows.iter().map(record_from_row).collect()
    }
}
