//! Append-only audit note repository implementation.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use custodia_core::{new_v7, ArchiveNote, ArchiveNoteRepository, Result};

/// PostgreSQL implementation of ArchiveNoteRepository.
///
/// Notes are the audit trail behind every lifecycle transition; the
/// repository deliberately exposes no update or delete.
pub struct PgArchiveNoteRepository {
    pool: PgPool,
}

impl PgArchiveNoteRepository {
    /// Create a new PgArchiveNoteRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn note_from_row(row: &PgRow) -> Result<ArchiveNote> {
    Ok(ArchiveNote {
        id: row.try_get("id")?,
        archive_id: row.try_get("archive_id")?,
        text: row.try_get("text")?,
        author: row.try_get("author")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl ArchiveNoteRepository for PgArchiveNoteRepository {
    async fn append(&self, archive_id: Uuid, text: &str, author: &str) -> Result<ArchiveNote> {
        let id = new_v7();
        let row = sqlx::query(
            r#"
            INSERT INTO archive_note (id, archive_id, text, author, created_at)
            VALUES ($1, $2, $3, $4, NOW())
            RETURNING id, archive_id, text, author, created_at
            "#,
        )
        .bind(id)
        .bind(archive_id)
        .bind(text)
        .bind(author)
        .fetch_one(&self.pool)
        .await?;
        note_from_row(&row)
    }

    async fn list(&self, archive_id: Uuid) -> Result<Vec<ArchiveNote>> {
        let rows = sqlx::query(
            "SELECT id, archive_id, text, author, created_at \
             FROM archive_note WHERE archive_id = $1 ORDER BY created_at, id",
        )
        .bind(archive_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(note_from_row).collect()
    }
}
