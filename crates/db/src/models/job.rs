//! Job entity model: one paragraph's dispatch attempt within a batch.

use folio_core::status::StatusId;
use folio_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// A row from the `job` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Job {
    pub id: DbId,
    pub batch_id: DbId,
    pub note_id: DbId,
    pub paragraph_id: DbId,
    /// Position within the batch; execution is strictly ordered by it.
    pub index_number: i32,
    /// Interpreter identity string the job is bound to.
    pub shebang: String,
    pub status_id: StatusId,
    /// Identity of the interpreter process the job was pushed to.
    pub interpreter_process_uuid: Option<Uuid>,
    /// Identity the interpreter assigned to the accepted job.
    pub interpreter_job_uuid: Option<Uuid>,
    pub username: String,
    pub roles: Vec<String>,
    pub created_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub ended_at: Option<Timestamp>,
}

/// Fields required to insert a new pending job.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub batch_id: DbId,
    pub note_id: DbId,
    pub paragraph_id: DbId,
    pub index_number: i32,
    pub shebang: String,
    pub username: String,
    pub roles: Vec<String>,
}
