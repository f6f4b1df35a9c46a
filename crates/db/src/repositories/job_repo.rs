//! Repository for the `job` table.
//!
//! The ready/cancel/orphan queries encode the batch ordering rules:
//! a batch executes its jobs strictly in index order, one at a time,
//! and halts on the first error until the row is changed externally.

use folio_core::status::{BatchStatus, JobStatus};
use folio_core::types::DbId;
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::models::job::{Job, NewJob};

/// Column list for `job` queries.
const COLUMNS: &str = "\
    id, batch_id, note_id, paragraph_id, index_number, shebang, \
    status_id, interpreter_process_uuid, interpreter_job_uuid, \
    username, roles, created_at, started_at, ended_at";

/// Provides CRUD and scheduling queries for jobs.
pub struct JobRepo;

impl JobRepo {
    /// Insert a new pending job tied to a batch and index.
    pub async fn insert(
        executor: impl PgExecutor<'_>,
        input: &NewJob,
    ) -> Result<Job, sqlx::Error> {
        let query = format!(
            "INSERT INTO job \
                 (batch_id, note_id, paragraph_id, index_number, shebang, \
                  status_id, username, roles) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(input.batch_id)
            .bind(input.note_id)
            .bind(input.paragraph_id)
            .bind(input.index_number)
            .bind(&input.shebang)
            .bind(JobStatus::Pending.id())
            .bind(&input.username)
            .bind(&input.roles)
            .fetch_one(executor)
            .await
    }

    /// Full overwrite of a job's mutable fields.
    ///
    /// Returns the number of rows affected; zero means the row
    /// vanished or the id is wrong, which the caller must treat as
    /// fatal rather than retry.
    pub async fn update(
        executor: impl PgExecutor<'_>,
        job: &Job,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE job \
             SET status_id = $2, \
                 interpreter_process_uuid = $3, \
                 interpreter_job_uuid = $4, \
                 started_at = $5, \
                 ended_at = $6 \
             WHERE id = $1",
        )
        .bind(job.id)
        .bind(job.status_id)
        .bind(job.interpreter_process_uuid)
        .bind(job.interpreter_job_uuid)
        .bind(job.started_at)
        .bind(job.ended_at)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    /// Find a job by its ID.
    pub async fn find_by_id(
        executor: impl PgExecutor<'_>,
        id: DbId,
    ) -> Result<Option<Job>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM job WHERE id = $1");
        sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Find the job an interpreter reported a result for.
    pub async fn find_by_interpreter_job_uuid(
        executor: impl PgExecutor<'_>,
        interpreter_job_uuid: Uuid,
    ) -> Result<Option<Job>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM job WHERE interpreter_job_uuid = $1"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(interpreter_job_uuid)
            .fetch_optional(executor)
            .await
    }

    /// All jobs of a batch, ordered by index.
    pub async fn list_by_batch(
        executor: impl PgExecutor<'_>,
        batch_id: DbId,
    ) -> Result<Vec<Job>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM job \
             WHERE batch_id = $1 \
             ORDER BY index_number"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(batch_id)
            .fetch_all(executor)
            .await
    }

    /// Next job eligible for dispatch per batch.
    ///
    /// At most one job per batch: the lowest-index pending job of each
    /// batch whose batch status is Pending/Running and that has no job
    /// currently Running or Error. Ordered by (batch_id, index_number).
    pub async fn next_ready(
        executor: impl PgExecutor<'_>,
    ) -> Result<Vec<Job>, sqlx::Error> {
        let query = "\
            SELECT DISTINCT ON (j.batch_id) \
                j.id, j.batch_id, j.note_id, j.paragraph_id, \
                j.index_number, j.shebang, j.status_id, \
                j.interpreter_process_uuid, j.interpreter_job_uuid, \
                j.username, j.roles, j.created_at, j.started_at, j.ended_at \
            FROM job j \
            JOIN job_batch b ON b.id = j.batch_id \
            WHERE b.status_id IN ($1, $2) \
              AND j.status_id = $3 \
              AND NOT EXISTS ( \
                  SELECT 1 FROM job blk \
                  WHERE blk.batch_id = j.batch_id \
                    AND blk.status_id IN ($4, $5) \
              ) \
            ORDER BY j.batch_id, j.index_number";
        sqlx::query_as::<_, Job>(query)
            .bind(BatchStatus::Pending.id())
            .bind(BatchStatus::Running.id())
            .bind(JobStatus::Pending.id())
            .bind(JobStatus::Running.id())
            .bind(JobStatus::Error.id())
            .fetch_all(executor)
            .await
    }

    /// Running jobs whose batch was asked to abort.
    pub async fn ready_to_cancel(
        executor: impl PgExecutor<'_>,
    ) -> Result<Vec<Job>, sqlx::Error> {
        let query = "\
            SELECT j.id, j.batch_id, j.note_id, j.paragraph_id, \
                j.index_number, j.shebang, j.status_id, \
                j.interpreter_process_uuid, j.interpreter_job_uuid, \
                j.username, j.roles, j.created_at, j.started_at, j.ended_at \
            FROM job j \
            JOIN job_batch b ON b.id = j.batch_id \
            WHERE b.status_id = $1 AND j.status_id = $2 \
            ORDER BY j.batch_id, j.index_number";
        sqlx::query_as::<_, Job>(query)
            .bind(BatchStatus::Aborting.id())
            .bind(JobStatus::Running.id())
            .fetch_all(executor)
            .await
    }

    /// Jobs still attributed to a specific interpreter process.
    pub async fn bound_to_process(
        executor: impl PgExecutor<'_>,
        process_uuid: Uuid,
    ) -> Result<Vec<Job>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM job \
             WHERE interpreter_process_uuid = $1 \
             ORDER BY batch_id, index_number"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(process_uuid)
            .fetch_all(executor)
            .await
    }

    /// Boot-time compensation: every Running job back to Pending with
    /// both UUID fields cleared. Idempotent.
    pub async fn restore_state(
        executor: impl PgExecutor<'_>,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE job \
             SET status_id = $1, \
                 interpreter_process_uuid = NULL, \
                 interpreter_job_uuid = NULL \
             WHERE status_id = $2",
        )
        .bind(JobStatus::Pending.id())
        .bind(JobStatus::Running.id())
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    /// Requeue Running jobs whose process is not in the live set.
    ///
    /// Used by the dead-interpreter sweep so in-flight work of a
    /// crashed process resumes on a freshly spawned one.
    pub async fn requeue_orphans(
        executor: impl PgExecutor<'_>,
        live_process_uuids: &[Uuid],
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE job \
             SET status_id = $1, \
                 interpreter_process_uuid = NULL, \
                 interpreter_job_uuid = NULL \
             WHERE status_id = $2 \
               AND (interpreter_process_uuid IS NULL \
                    OR interpreter_process_uuid <> ALL($3))",
        )
        .bind(JobStatus::Pending.id())
        .bind(JobStatus::Running.id())
        .bind(live_process_uuids)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }
}
