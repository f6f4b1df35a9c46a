//! Repository for the `job_payload` table. Plain key-value access
//! keyed by job id; the rows never mutate after insertion.

use folio_core::types::DbId;
use sqlx::PgExecutor;

use crate::models::payload::JobPayload;

pub struct JobPayloadRepo;

impl JobPayloadRepo {
    /// Persist the payload dispatched for a job.
    pub async fn insert(
        executor: impl PgExecutor<'_>,
        job_id: DbId,
        payload: &str,
    ) -> Result<JobPayload, sqlx::Error> {
        sqlx::query_as::<_, JobPayload>(
            "INSERT INTO job_payload (job_id, payload) \
             VALUES ($1, $2) \
             RETURNING id, job_id, payload",
        )
        .bind(job_id)
        .bind(payload)
        .fetch_one(executor)
        .await
    }

    /// Read back the payload for a job.
    pub async fn find_by_job_id(
        executor: impl PgExecutor<'_>,
        job_id: DbId,
    ) -> Result<Option<JobPayload>, sqlx::Error> {
        sqlx::query_as::<_, JobPayload>(
            "SELECT id, job_id, payload FROM job_payload WHERE job_id = $1",
        )
        .bind(job_id)
        .fetch_optional(executor)
        .await
    }
}
