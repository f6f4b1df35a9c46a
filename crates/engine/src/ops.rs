//! Batch submit/cancel surface used by the API layers above the
//! engine.

use chrono::Utc;
use folio_core::status::BatchStatus;
use folio_core::types::DbId;
use folio_core::CoreError;
use thiserror::Error;

use crate::store::{BatchSubmission, JobStore, ParagraphSubmission, StoreError};

#[derive(Debug, Error)]
pub enum OpsError {
    #[error("batch {0} not found")]
    BatchNotFound(DbId),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Submit the ordered paragraphs of a note as one batch.
///
/// The batch, its jobs, and their payloads are persisted atomically;
/// the scheduler picks the first job up on its next pending tick.
/// Returns the batch id.
pub async fn submit_batch(
    store: &dyn JobStore,
    note_id: DbId,
    paragraphs: Vec<ParagraphSubmission>,
    username: String,
    roles: Vec<String>,
) -> Result<DbId, OpsError> {
    if paragraphs.is_empty() {
        return Err(CoreError::Validation("a batch needs at least one paragraph".into()).into());
    }
    let job_count = paragraphs.len();
    let batch_id = store
        .submit_batch(&BatchSubmission {
            note_id,
            username,
            roles,
            paragraphs,
        })
        .await?;
    tracing::info!(batch_id, note_id, job_count, "Batch submitted");
    Ok(batch_id)
}

/// Ask a batch to abort.
///
/// Only flips the batch to Aborting; the scheduler's cancel sweep does
/// the per-job work. A terminal batch is left untouched.
pub async fn cancel_batch(store: &dyn JobStore, batch_id: DbId) -> Result<(), OpsError> {
    let Some(mut batch) = store.get_batch(batch_id).await? else {
        return Err(OpsError::BatchNotFound(batch_id));
    };
    let status = BatchStatus::from_id(batch.status_id);
    match status {
        Some(status) if status.is_terminal() => {
            tracing::warn!(batch_id, status = ?status, "Cancel of a finished batch ignored");
            Ok(())
        }
        Some(BatchStatus::Aborting) => Ok(()),
        _ => {
            batch.status_id = BatchStatus::Aborting.id();
            if batch.started_at.is_none() {
                batch.started_at = Some(Utc::now());
            }
            store.update_batch(&batch).await?;
            tracing::info!(batch_id, "Batch abort requested");
            Ok(())
        }
    }
}
