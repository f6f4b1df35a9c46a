//! Batch entity model: a group of jobs from one submission.

use folio_core::status::StatusId;
use folio_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `job_batch` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct JobBatch {
    pub id: DbId,
    pub note_id: DbId,
    pub status_id: StatusId,
    pub created_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub ended_at: Option<Timestamp>,
}
