use folio_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `job_result` table: one message produced by the
/// interpreter while executing a job. A job may have several.
#[derive(Debug, Clone, FromRow)]
pub struct JobResultRow {
    pub id: DbId,
    pub job_id: DbId,
    pub created_at: Timestamp,
    /// Message kind reported by the interpreter (e.g. `TEXT`, `HTML`).
    pub r#type: String,
    pub result: String,
}
