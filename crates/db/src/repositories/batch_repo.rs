//! Repository for the `job_batch` table.

use folio_core::status::{BatchStatus, StatusId};
use folio_core::types::DbId;
use sqlx::PgExecutor;

use crate::models::batch::JobBatch;

/// Column list for `job_batch` queries.
const COLUMNS: &str = "id, note_id, status_id, created_at, started_at, ended_at";

/// Provides CRUD operations for job batches.
pub struct JobBatchRepo;

impl JobBatchRepo {
    /// Insert a new batch in the given status.
    pub async fn insert(
        executor: impl PgExecutor<'_>,
        note_id: DbId,
        status: BatchStatus,
    ) -> Result<JobBatch, sqlx::Error> {
        let query = format!(
            "INSERT INTO job_batch (note_id, status_id) \
             VALUES ($1, $2) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, JobBatch>(&query)
            .bind(note_id)
            .bind(status.id())
            .fetch_one(executor)
            .await
    }

    /// Overwrite a batch's status and timestamps.
    ///
    /// Returns the number of rows affected; zero is a consistency bug
    /// the caller must treat as fatal.
    pub async fn update(
        executor: impl PgExecutor<'_>,
        batch: &JobBatch,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE job_batch \
             SET status_id = $2, started_at = $3, ended_at = $4 \
             WHERE id = $1",
        )
        .bind(batch.id)
        .bind(batch.status_id)
        .bind(batch.started_at)
        .bind(batch.ended_at)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    /// Find a batch by its ID.
    pub async fn find_by_id(
        executor: impl PgExecutor<'_>,
        id: DbId,
    ) -> Result<Option<JobBatch>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM job_batch WHERE id = $1");
        sqlx::query_as::<_, JobBatch>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// All batches in a given status.
    pub async fn list_by_status(
        executor: impl PgExecutor<'_>,
        status_id: StatusId,
    ) -> Result<Vec<JobBatch>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM job_batch WHERE status_id = $1 ORDER BY id"
        );
        sqlx::query_as::<_, JobBatch>(&query)
            .bind(status_id)
            .fetch_all(executor)
            .await
    }
}
