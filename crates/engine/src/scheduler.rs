//! Polling scheduler loop.
//!
//! A single long-lived task with three periodic duties:
//!
//! 1. pending tick — dispatch the next ready job of each batch to its
//!    interpreter, spawning the interpreter first if needed;
//! 2. cancel tick — drive Aborting batches: cancel their running jobs
//!    over RPC, abort their queued jobs, finalize drained batches;
//! 3. liveness tick — ping every registered interpreter, drop the dead
//!    ones, and requeue the jobs they still held.
//!
//! Tick intervals are tunables; correctness never depends on them.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use folio_core::context::{
    CTX_JOB_ID, CTX_NOTE_ID, CTX_PARAGRAPH_ID, CTX_USER_NAME, CTX_USER_ROLES,
};
use folio_core::status::{BatchStatus, JobStatus};
use folio_core::types::DbId;
use folio_db::models::job::Job;
use folio_remote::messages::{CancelStatus, PingStatus, PushStatus};
use folio_remote::RemoteClient;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::launcher::{InterpreterResolver, Launcher};
use crate::registry::{InterpreterProcess, ProcessRegistry, ProcessStatus};
use crate::store::{JobStore, StoreError};

/// The polling loop driving dispatch, cancellation, and liveness.
pub struct Scheduler {
    store: Arc<dyn JobStore>,
    registry: Arc<ProcessRegistry>,
    launcher: Launcher,
    resolver: Arc<dyn InterpreterResolver>,
    pending_poll: Duration,
    cancel_poll: Duration,
    liveness_poll: Duration,
    rpc_timeout: Duration,
}

impl Scheduler {
    pub fn new(
        store: Arc<dyn JobStore>,
        registry: Arc<ProcessRegistry>,
        launcher: Launcher,
        resolver: Arc<dyn InterpreterResolver>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            store,
            registry,
            launcher,
            resolver,
            pending_poll: config.pending_poll,
            cancel_poll: config.cancel_poll,
            liveness_poll: config.liveness_poll,
            rpc_timeout: config.rpc_timeout,
        }
    }

    /// Run the scheduler loop until the cancellation token is triggered.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut pending = tokio::time::interval(self.pending_poll);
        let mut cancel_sweep = tokio::time::interval(self.cancel_poll);
        let mut liveness = tokio::time::interval(self.liveness_poll);
        tracing::info!(
            pending_poll_ms = self.pending_poll.as_millis() as u64,
            cancel_poll_ms = self.cancel_poll.as_millis() as u64,
            liveness_poll_ms = self.liveness_poll.as_millis() as u64,
            "Scheduler started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Scheduler shutting down");
                    break;
                }
                _ = pending.tick() => {
                    if let Err(e) = self.dispatch_pending().await {
                        tracing::error!(error = %e, "Pending tick failed");
                    }
                }
                _ = cancel_sweep.tick() => {
                    if let Err(e) = self.sweep_cancellations().await {
                        tracing::error!(error = %e, "Cancel tick failed");
                    }
                }
                _ = liveness.tick() => {
                    if let Err(e) = self.sweep_liveness().await {
                        tracing::error!(error = %e, "Liveness tick failed");
                    }
                }
            }
        }
    }

    /// One pending tick: at most one dispatch attempt per batch.
    pub async fn dispatch_pending(&self) -> Result<(), StoreError> {
        for job in self.store.next_ready_jobs().await? {
            self.dispatch_one(job).await?;
        }
        Ok(())
    }

    async fn dispatch_one(&self, job: Job) -> Result<(), StoreError> {
        match self.registry.get(&job.shebang).await {
            None => {
                // No process for this shebang yet; spawn one and let a
                // later tick push the job.
                match self.resolver.resolve(&job.shebang) {
                    Some(spec) => {
                        self.registry.starting(&job.shebang).await;
                        self.launcher.spawn(&job.shebang, &spec);
                    }
                    None => {
                        tracing::error!(job_id = job.id, shebang = %job.shebang,
                            "No interpreter installed for shebang");
                        self.fail_job(job, "Interpreter not installed").await?;
                    }
                }
            }
            Some(entry) if entry.status == ProcessStatus::Starting => {
                // Still booting; the job stays eligible.
            }
            Some(entry) => self.push_job(job, &entry).await?,
        }
        Ok(())
    }

    /// Push one job to a ready interpreter and record the outcome.
    async fn push_job(&self, mut job: Job, entry: &InterpreterProcess) -> Result<(), StoreError> {
        let Some(payload) = self.store.get_payload(job.id).await? else {
            tracing::error!(job_id = job.id, "Job has no payload");
            return self.fail_job(job, "Job payload missing").await;
        };

        let mut note_context = HashMap::new();
        note_context.insert(CTX_NOTE_ID.to_string(), job.note_id.to_string());
        note_context.insert(CTX_PARAGRAPH_ID.to_string(), job.paragraph_id.to_string());
        note_context.insert(CTX_JOB_ID.to_string(), job.id.to_string());
        let mut user_context = HashMap::new();
        user_context.insert(CTX_USER_NAME.to_string(), job.username.clone());
        user_context.insert(CTX_USER_ROLES.to_string(), job.roles.join(","));

        let result = self
            .client(entry)
            .push(payload.payload, note_context, user_context, HashMap::new())
            .await;

        match result {
            Some(result) if result.status == PushStatus::Accept => {
                job.status_id = JobStatus::Running.id();
                job.interpreter_process_uuid = Some(result.interpreter_process_uuid);
                job.interpreter_job_uuid = Some(result.interpreter_job_uuid);
                job.started_at = Some(Utc::now());
                self.store.update_job(&job).await?;
                tracing::info!(job_id = job.id, batch_id = job.batch_id,
                    shebang = %job.shebang,
                    interpreter_job_uuid = %result.interpreter_job_uuid, "Job dispatched");
                self.mark_batch_running(job.batch_id).await?;
            }
            Some(result) if result.status == PushStatus::Decline => {
                // Busy; the job stays eligible for the next tick.
                tracing::debug!(job_id = job.id, shebang = %job.shebang, "Push declined");
            }
            Some(_) => {
                tracing::warn!(job_id = job.id, shebang = %job.shebang,
                    "Interpreter rejected the push");
            }
            None => {
                // Transport failure; the liveness sweep decides the
                // process's fate, the job stays eligible.
                tracing::warn!(job_id = job.id, shebang = %job.shebang, "Push failed");
            }
        }
        Ok(())
    }

    /// A batch starts running with its first dispatched job.
    async fn mark_batch_running(&self, batch_id: DbId) -> Result<(), StoreError> {
        let Some(mut batch) = self.store.get_batch(batch_id).await? else {
            return Err(StoreError::RowVanished {
                entity: "job_batch",
                id: batch_id,
            });
        };
        if batch.status_id == BatchStatus::Pending.id() {
            batch.status_id = BatchStatus::Running.id();
            batch.started_at = Some(Utc::now());
            self.store.update_batch(&batch).await?;
        }
        Ok(())
    }

    /// Close a job that can never run, halting its batch.
    async fn fail_job(&self, mut job: Job, reason: &str) -> Result<(), StoreError> {
        self.store.insert_result(job.id, "TEXT", reason).await?;
        job.status_id = JobStatus::Error.id();
        job.interpreter_process_uuid = None;
        job.interpreter_job_uuid = None;
        job.ended_at = Some(Utc::now());
        self.store.update_job(&job).await?;

        let Some(mut batch) = self.store.get_batch(job.batch_id).await? else {
            return Err(StoreError::RowVanished {
                entity: "job_batch",
                id: job.batch_id,
            });
        };
        let terminal = BatchStatus::from_id(batch.status_id)
            .map(BatchStatus::is_terminal)
            .unwrap_or(false);
        if !terminal {
            batch.status_id = BatchStatus::Error.id();
            batch.ended_at = Some(Utc::now());
            self.store.update_batch(&batch).await?;
        }
        Ok(())
    }

    /// One cancel tick: drive every Aborting batch towards Aborted.
    pub async fn sweep_cancellations(&self) -> Result<(), StoreError> {
        // Running jobs first: ask their interpreter to stop.
        for job in self.store.jobs_ready_to_cancel().await? {
            self.cancel_one(job).await?;
        }

        // Then the batch-level bookkeeping: queued jobs of an Aborting
        // batch never run, and a drained batch becomes Aborted.
        for batch in self
            .store
            .batches_by_status(BatchStatus::Aborting.id())
            .await?
        {
            let jobs = self.store.jobs_by_batch(batch.id).await?;
            let mut open = false;
            for job in jobs {
                match JobStatus::from_id(job.status_id) {
                    Some(JobStatus::Pending) => self.abort_now(job).await?,
                    Some(JobStatus::Running) | Some(JobStatus::Aborting) => open = true,
                    _ => {}
                }
            }
            if !open {
                let mut batch = batch;
                batch.status_id = BatchStatus::Aborted.id();
                batch.ended_at = Some(Utc::now());
                self.store.update_batch(&batch).await?;
                tracing::info!(batch_id = batch.id, "Batch aborted");
            }
        }
        Ok(())
    }

    async fn cancel_one(&self, job: Job) -> Result<(), StoreError> {
        let entry = self.registry.get(&job.shebang).await;
        let target = match (entry, job.interpreter_job_uuid) {
            (Some(entry), Some(uuid)) if entry.status == ProcessStatus::Ready => {
                Some((entry, uuid))
            }
            _ => None,
        };

        // Without a live process to ask, the job is aborted outright.
        let Some((entry, interpreter_job_uuid)) = target else {
            return self.abort_now(job).await;
        };

        match self.client(&entry).cancel(interpreter_job_uuid).await {
            Some(result) if result.status == CancelStatus::Accept => {
                let mut job = job;
                job.status_id = JobStatus::Aborting.id();
                self.store.update_job(&job).await?;
                tracing::info!(job_id = job.id, %interpreter_job_uuid,
                    "Cancel accepted, awaiting aborted result");
                Ok(())
            }
            // NotFound, Error, or an unreachable process: the
            // interpreter will never report this job again.
            _ => self.abort_now(job).await,
        }
    }

    async fn abort_now(&self, mut job: Job) -> Result<(), StoreError> {
        job.status_id = JobStatus::Aborted.id();
        job.interpreter_process_uuid = None;
        job.interpreter_job_uuid = None;
        job.ended_at = Some(Utc::now());
        self.store.update_job(&job).await?;
        tracing::info!(job_id = job.id, batch_id = job.batch_id, "Job aborted");
        Ok(())
    }

    /// One liveness tick: ping every ready interpreter, drop the dead
    /// ones, requeue whatever they still held.
    pub async fn sweep_liveness(&self) -> Result<(), StoreError> {
        let mut live: Vec<Uuid> = Vec::new();
        for shebang in self.registry.shebangs().await {
            let Some(entry) = self.registry.get(&shebang).await else {
                continue;
            };
            // A booting process has nothing bound to it yet.
            if entry.status == ProcessStatus::Starting {
                continue;
            }

            let client = self.client(&entry);
            match client.ping().await {
                Some(result) if result.status == PingStatus::Ok => {
                    if let Some(uuid) = entry.uuid {
                        live.push(uuid);
                    }
                }
                other => {
                    tracing::warn!(shebang = %shebang, response = ?other,
                        "Interpreter failed liveness probe");
                    client.force_kill().await;
                    self.registry.remove(&shebang).await;
                }
            }
        }

        let requeued = self.store.requeue_orphans(&live).await?;
        if requeued > 0 {
            tracing::info!(requeued, "Orphaned running jobs requeued");
        }
        Ok(())
    }

    fn client(&self, entry: &InterpreterProcess) -> RemoteClient {
        RemoteClient::new(entry.host.clone(), entry.port).with_timeout(self.rpc_timeout)
    }
}
