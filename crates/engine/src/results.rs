//! Callback handling: registrations, job results, streamed output.
//!
//! [`ResultHandler`] is the engine's [`CallbackSink`]. Registrations
//! promote registry entries, results drive the terminal job and batch
//! transitions, output appends are fanned out on a broadcast channel
//! for whatever UI layer sits above the engine.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use folio_core::status::{BatchStatus, JobStatus};
use folio_db::models::job::Job;
use folio_remote::messages::{
    OutputAppendEvent, RegisterInfo, ResultCode, ResultEvent,
};
use folio_remote::CallbackSink;
use tokio::sync::broadcast;

use crate::registry::ProcessRegistry;
use crate::store::{JobStore, StoreError};

/// Broadcast capacity for streamed output events.
const OUTPUT_CHANNEL_CAPACITY: usize = 256;

/// Receives interpreter callbacks and applies them to the store and
/// the registry.
pub struct ResultHandler {
    store: Arc<dyn JobStore>,
    registry: Arc<ProcessRegistry>,
    output_tx: broadcast::Sender<OutputAppendEvent>,
}

impl ResultHandler {
    pub fn new(store: Arc<dyn JobStore>, registry: Arc<ProcessRegistry>) -> Self {
        let (output_tx, _) = broadcast::channel(OUTPUT_CHANNEL_CAPACITY);
        Self {
            store,
            registry,
            output_tx,
        }
    }

    /// Subscribe to streamed interpreter output.
    pub fn subscribe_output(&self) -> broadcast::Receiver<OutputAppendEvent> {
        self.output_tx.subscribe()
    }

    /// Apply one result callback: persist the messages, close the job,
    /// and finalize the batch if this was its last open job.
    async fn apply_result(&self, event: ResultEvent) -> Result<(), StoreError> {
        let Some(mut job) = self
            .store
            .find_job_by_interpreter_job_uuid(event.interpreter_job_uuid)
            .await?
        else {
            tracing::warn!(interpreter_job_uuid = %event.interpreter_job_uuid,
                "Result for an unknown job dropped");
            return Ok(());
        };

        for message in &event.result.messages {
            self.store
                .insert_result(job.id, &message.r#type, &message.data)
                .await?;
        }

        let status = match event.result.code {
            ResultCode::Success => JobStatus::Done,
            ResultCode::Error => JobStatus::Error,
            ResultCode::Aborted => JobStatus::Aborted,
        };
        job.status_id = status.id();
        job.interpreter_process_uuid = None;
        job.interpreter_job_uuid = None;
        job.ended_at = Some(Utc::now());
        self.store.update_job(&job).await?;
        tracing::info!(job_id = job.id, batch_id = job.batch_id, status = ?status,
            "Job finished");

        self.finalize_batch(&job, event.result.code).await
    }

    async fn finalize_batch(&self, job: &Job, code: ResultCode) -> Result<(), StoreError> {
        let Some(mut batch) = self.store.get_batch(job.batch_id).await? else {
            return Err(StoreError::RowVanished {
                entity: "job_batch",
                id: job.batch_id,
            });
        };
        let batch_status = match BatchStatus::try_from_id(batch.status_id) {
            Ok(status) => status,
            Err(e) => {
                tracing::error!(batch_id = batch.id, error = %e, "Batch status unreadable");
                return Ok(());
            }
        };
        if batch_status.is_terminal() {
            return Ok(());
        }

        let jobs = self.store.jobs_by_batch(batch.id).await?;
        let new_status = match code {
            // First error halts the batch; later jobs stay Pending but
            // blocked by the ready query.
            ResultCode::Error => Some(BatchStatus::Error),
            ResultCode::Success => {
                let all_done = jobs
                    .iter()
                    .all(|j| j.status_id == JobStatus::Done.id());
                all_done.then_some(BatchStatus::Done)
            }
            ResultCode::Aborted => {
                let open = jobs.iter().any(|j| {
                    j.status_id == JobStatus::Running.id()
                        || j.status_id == JobStatus::Aborting.id()
                });
                (!open && batch_status == BatchStatus::Aborting)
                    .then_some(BatchStatus::Aborted)
            }
        };

        if let Some(new_status) = new_status {
            batch.status_id = new_status.id();
            batch.ended_at = Some(Utc::now());
            self.store.update_batch(&batch).await?;
            tracing::info!(batch_id = batch.id, status = ?new_status, "Batch finished");
        }
        Ok(())
    }
}

#[async_trait]
impl CallbackSink for ResultHandler {
    async fn register(&self, info: RegisterInfo) {
        self.registry.handle_register_event(&info).await;
    }

    async fn result(&self, event: ResultEvent) {
        let interpreter_job_uuid = event.interpreter_job_uuid;
        if let Err(e) = self.apply_result(event).await {
            tracing::error!(%interpreter_job_uuid, error = %e,
                "Failed to apply result callback");
        }
    }

    async fn output(&self, event: OutputAppendEvent) {
        // No subscribers is fine; output is fire-and-forget.
        let _ = self.output_tx.send(event);
    }
}
