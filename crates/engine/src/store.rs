//! Persistence seam for the engine.
//!
//! The scheduler, result handler, and batch operations only ever talk
//! to [`JobStore`]; the Postgres implementation lives in [`crate::pg`]
//! and an in-memory double backs the engine tests.

use async_trait::async_trait;
use folio_core::status::StatusId;
use folio_core::types::DbId;
use folio_db::models::batch::JobBatch;
use folio_db::models::job::Job;
use folio_db::models::payload::JobPayload;
use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// An update matched zero rows. The row the engine believed in is
    /// gone; the caller must treat this as fatal, never retry it.
    #[error("{entity} {id} vanished during update")]
    RowVanished { entity: &'static str, id: DbId },
}

/// One paragraph within a batch submission, in execution order.
#[derive(Debug, Clone)]
pub struct ParagraphSubmission {
    pub paragraph_id: DbId,
    pub shebang: String,
    pub payload: String,
}

/// Everything needed to persist one batch atomically.
#[derive(Debug, Clone)]
pub struct BatchSubmission {
    pub note_id: DbId,
    pub username: String,
    pub roles: Vec<String>,
    pub paragraphs: Vec<ParagraphSubmission>,
}

/// Batch/job persistence operations the engine depends on.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a Pending batch, its ordered Pending jobs, and one
    /// payload per job, atomically. Returns the batch id.
    async fn submit_batch(&self, input: &BatchSubmission) -> Result<DbId, StoreError>;

    async fn get_batch(&self, id: DbId) -> Result<Option<JobBatch>, StoreError>;

    /// Overwrite a batch's status and timestamps.
    async fn update_batch(&self, batch: &JobBatch) -> Result<(), StoreError>;

    async fn batches_by_status(&self, status_id: StatusId) -> Result<Vec<JobBatch>, StoreError>;

    /// Overwrite a job's mutable fields.
    async fn update_job(&self, job: &Job) -> Result<(), StoreError>;

    /// At most one job per batch: the lowest-index Pending job of each
    /// Pending/Running batch with no job currently Running or Error.
    async fn next_ready_jobs(&self) -> Result<Vec<Job>, StoreError>;

    /// Running jobs whose batch was asked to abort.
    async fn jobs_ready_to_cancel(&self) -> Result<Vec<Job>, StoreError>;

    /// Jobs still attributed to a specific interpreter process.
    async fn jobs_bound_to(&self, process_uuid: Uuid) -> Result<Vec<Job>, StoreError>;

    /// All jobs of a batch, ordered by index.
    async fn jobs_by_batch(&self, batch_id: DbId) -> Result<Vec<Job>, StoreError>;

    /// Resolve the job an interpreter reported a result for.
    async fn find_job_by_interpreter_job_uuid(
        &self,
        interpreter_job_uuid: Uuid,
    ) -> Result<Option<Job>, StoreError>;

    /// Boot-time compensation: every Running job back to Pending with
    /// cleared UUIDs. Idempotent. Returns the number of jobs touched.
    async fn restore_state(&self) -> Result<u64, StoreError>;

    /// Requeue Running jobs whose process is not in the live set.
    async fn requeue_orphans(&self, live_process_uuids: &[Uuid]) -> Result<u64, StoreError>;

    async fn get_payload(&self, job_id: DbId) -> Result<Option<JobPayload>, StoreError>;

    /// Append one interpreter result message for a job.
    async fn insert_result(
        &self,
        job_id: DbId,
        message_type: &str,
        result: &str,
    ) -> Result<(), StoreError>;
}
