use folio_core::types::DbId;
use sqlx::FromRow;

/// A row from the `job_payload` table: the text dispatched to the
/// interpreter for one job.
#[derive(Debug, Clone, FromRow)]
pub struct JobPayload {
    pub id: DbId,
    pub job_id: DbId,
    pub payload: String,
}
