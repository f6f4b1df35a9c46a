//! Repository for the `job_result` table: append-only interpreter
//! output messages, read back by API consumers.

use folio_core::types::DbId;
use sqlx::PgExecutor;

use crate::models::result::JobResultRow;

pub struct JobResultRepo;

impl JobResultRepo {
    /// Append one result message for a job.
    pub async fn insert(
        executor: impl PgExecutor<'_>,
        job_id: DbId,
        message_type: &str,
        result: &str,
    ) -> Result<JobResultRow, sqlx::Error> {
        sqlx::query_as::<_, JobResultRow>(
            "INSERT INTO job_result (job_id, type, result) \
             VALUES ($1, $2, $3) \
             RETURNING id, job_id, created_at, type, result",
        )
        .bind(job_id)
        .bind(message_type)
        .bind(result)
        .fetch_one(executor)
        .await
    }

    /// All messages recorded for a job, oldest first.
    pub async fn list_by_job_id(
        executor: impl PgExecutor<'_>,
        job_id: DbId,
    ) -> Result<Vec<JobResultRow>, sqlx::Error> {
        sqlx::query_as::<_, JobResultRow>(
            "SELECT id, job_id, created_at, type, result \
             FROM job_result \
             WHERE job_id = $1 \
             ORDER BY id",
        )
        .bind(job_id)
        .fetch_all(executor)
        .await
    }
}
