#![allow(dead_code)]

//! Shared test doubles: an in-memory [`JobStore`] mirroring the SQL
//! scheduling predicates, and a scripted interpreter process speaking
//! the real wire protocol over localhost.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use folio_core::status::{BatchStatus, JobStatus, StatusId};
use folio_core::types::DbId;
use folio_db::models::batch::JobBatch;
use folio_db::models::job::Job;
use folio_db::models::payload::JobPayload;
use folio_engine::store::{BatchSubmission, JobStore, StoreError};
use folio_engine::ProcessRegistry;
use folio_remote::codec::{framed, recv_message, send_message};
use folio_remote::messages::{
    CancelResult, CancelStatus, InterpreterRequest, InterpreterResponse, PingResult, PingStatus,
    PushRequest, PushResult, PushStatus, RegisterInfo,
};
use tokio::net::TcpListener;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

#[derive(Default)]
struct StoreState {
    batches: HashMap<DbId, JobBatch>,
    jobs: HashMap<DbId, Job>,
    payloads: HashMap<DbId, String>,
    results: Vec<(DbId, String, String)>,
    next_batch_id: DbId,
    next_job_id: DbId,
}

/// In-memory [`JobStore`] with the same scheduling predicates as the
/// Postgres queries.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn job(&self, id: DbId) -> Option<Job> {
        self.state.lock().unwrap().jobs.get(&id).cloned()
    }

    pub fn batch(&self, id: DbId) -> Option<JobBatch> {
        self.state.lock().unwrap().batches.get(&id).cloned()
    }

    pub fn job_status(&self, id: DbId) -> Option<JobStatus> {
        self.job(id).and_then(|j| JobStatus::from_id(j.status_id))
    }

    pub fn batch_status(&self, id: DbId) -> Option<BatchStatus> {
        self.batch(id)
            .and_then(|b| BatchStatus::from_id(b.status_id))
    }

    pub fn results_for(&self, job_id: DbId) -> Vec<(String, String)> {
        self.state
            .lock()
            .unwrap()
            .results
            .iter()
            .filter(|(id, _, _)| *id == job_id)
            .map(|(_, t, r)| (t.clone(), r.clone()))
            .collect()
    }

    /// Force a job into a status, bypassing the engine.
    pub fn set_job_status(&self, id: DbId, status: JobStatus) {
        let mut state = self.state.lock().unwrap();
        if let Some(job) = state.jobs.get_mut(&id) {
            job.status_id = status.id();
        }
    }

    fn ordered_jobs(state: &StoreState, batch_id: DbId) -> Vec<Job> {
        let mut jobs: Vec<Job> = state
            .jobs
            .values()
            .filter(|j| j.batch_id == batch_id)
            .cloned()
            .collect();
        jobs.sort_by_key(|j| j.index_number);
        jobs
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn submit_batch(&self, input: &BatchSubmission) -> Result<DbId, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.next_batch_id += 1;
        let batch_id = state.next_batch_id;
        state.batches.insert(
            batch_id,
            JobBatch {
                id: batch_id,
                note_id: input.note_id,
                status_id: BatchStatus::Pending.id(),
                created_at: Utc::now(),
                started_at: None,
                ended_at: None,
            },
        );
        for (index, paragraph) in input.paragraphs.iter().enumerate() {
            state.next_job_id += 1;
            let job_id = state.next_job_id;
            state.jobs.insert(
                job_id,
                Job {
                    id: job_id,
                    batch_id,
                    note_id: input.note_id,
                    paragraph_id: paragraph.paragraph_id,
                    index_number: index as i32,
                    shebang: paragraph.shebang.clone(),
                    status_id: JobStatus::Pending.id(),
                    interpreter_process_uuid: None,
                    interpreter_job_uuid: None,
                    username: input.username.clone(),
                    roles: input.roles.clone(),
                    created_at: Utc::now(),
                    started_at: None,
                    ended_at: None,
                },
            );
            state.payloads.insert(job_id, paragraph.payload.clone());
        }
        Ok(batch_id)
    }

    async fn get_batch(&self, id: DbId) -> Result<Option<JobBatch>, StoreError> {
        Ok(self.state.lock().unwrap().batches.get(&id).cloned())
    }

    async fn update_batch(&self, batch: &JobBatch) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        match state.batches.get_mut(&batch.id) {
            Some(existing) => {
                *existing = batch.clone();
                Ok(())
            }
            None => Err(StoreError::RowVanished {
                entity: "job_batch",
                id: batch.id,
            }),
        }
    }

    async fn batches_by_status(&self, status_id: StatusId) -> Result<Vec<JobBatch>, StoreError> {
        let state = self.state.lock().unwrap();
        let mut batches: Vec<JobBatch> = state
            .batches
            .values()
            .filter(|b| b.status_id == status_id)
            .cloned()
            .collect();
        batches.sort_by_key(|b| b.id);
        Ok(batches)
    }

    async fn update_job(&self, job: &Job) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        match state.jobs.get_mut(&job.id) {
            Some(existing) => {
                *existing = job.clone();
                Ok(())
            }
            None => Err(StoreError::RowVanished {
                entity: "job",
                id: job.id,
            }),
        }
    }

    async fn next_ready_jobs(&self) -> Result<Vec<Job>, StoreError> {
        let state = self.state.lock().unwrap();
        let mut ready = Vec::new();
        let mut batch_ids: Vec<DbId> = state.batches.keys().copied().collect();
        batch_ids.sort_unstable();
        for batch_id in batch_ids {
            let batch = &state.batches[&batch_id];
            let schedulable = batch.status_id == BatchStatus::Pending.id()
                || batch.status_id == BatchStatus::Running.id();
            if !schedulable {
                continue;
            }
            let jobs = Self::ordered_jobs(&state, batch_id);
            let blocked = jobs.iter().any(|j| {
                j.status_id == JobStatus::Running.id() || j.status_id == JobStatus::Error.id()
            });
            if blocked {
                continue;
            }
            if let Some(job) = jobs
                .into_iter()
                .find(|j| j.status_id == JobStatus::Pending.id())
            {
                ready.push(job);
            }
        }
        Ok(ready)
    }

    async fn jobs_ready_to_cancel(&self) -> Result<Vec<Job>, StoreError> {
        let state = self.state.lock().unwrap();
        let mut jobs: Vec<Job> = state
            .jobs
            .values()
            .filter(|j| {
                j.status_id == JobStatus::Running.id()
                    && state
                        .batches
                        .get(&j.batch_id)
                        .is_some_and(|b| b.status_id == BatchStatus::Aborting.id())
            })
            .cloned()
            .collect();
        jobs.sort_by_key(|j| (j.batch_id, j.index_number));
        Ok(jobs)
    }

    async fn jobs_bound_to(&self, process_uuid: Uuid) -> Result<Vec<Job>, StoreError> {
        let state = self.state.lock().unwrap();
        let mut jobs: Vec<Job> = state
            .jobs
            .values()
            .filter(|j| j.interpreter_process_uuid == Some(process_uuid))
            .cloned()
            .collect();
        jobs.sort_by_key(|j| (j.batch_id, j.index_number));
        Ok(jobs)
    }

    async fn jobs_by_batch(&self, batch_id: DbId) -> Result<Vec<Job>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(Self::ordered_jobs(&state, batch_id))
    }

    async fn find_job_by_interpreter_job_uuid(
        &self,
        interpreter_job_uuid: Uuid,
    ) -> Result<Option<Job>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .jobs
            .values()
            .find(|j| j.interpreter_job_uuid == Some(interpreter_job_uuid))
            .cloned())
    }

    async fn restore_state(&self) -> Result<u64, StoreError> {
        let mut state = self.state.lock().unwrap();
        let mut touched = 0;
        for job in state.jobs.values_mut() {
            if job.status_id == JobStatus::Running.id() {
                job.status_id = JobStatus::Pending.id();
                job.interpreter_process_uuid = None;
                job.interpreter_job_uuid = None;
                touched += 1;
            }
        }
        Ok(touched)
    }

    async fn requeue_orphans(&self, live_process_uuids: &[Uuid]) -> Result<u64, StoreError> {
        let mut state = self.state.lock().unwrap();
        let mut touched = 0;
        for job in state.jobs.values_mut() {
            if job.status_id != JobStatus::Running.id() {
                continue;
            }
            let live = job
                .interpreter_process_uuid
                .is_some_and(|uuid| live_process_uuids.contains(&uuid));
            if !live {
                job.status_id = JobStatus::Pending.id();
                job.interpreter_process_uuid = None;
                job.interpreter_job_uuid = None;
                touched += 1;
            }
        }
        Ok(touched)
    }

    async fn get_payload(&self, job_id: DbId) -> Result<Option<JobPayload>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state.payloads.get(&job_id).map(|payload| JobPayload {
            id: job_id,
            job_id,
            payload: payload.clone(),
        }))
    }

    async fn insert_result(
        &self,
        job_id: DbId,
        message_type: &str,
        result: &str,
    ) -> Result<(), StoreError> {
        self.state.lock().unwrap().results.push((
            job_id,
            message_type.to_string(),
            result.to_string(),
        ));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Scripted interpreter process
// ---------------------------------------------------------------------------

/// A localhost interpreter speaking the real wire protocol, one
/// request per connection, with scripted responses.
pub struct FakeInterpreter {
    pub port: u16,
    pub process_uuid: Uuid,
    pushes: Arc<Mutex<Vec<PushRequest>>>,
    cancels: Arc<Mutex<Vec<Uuid>>>,
    push_status: Arc<Mutex<PushStatus>>,
    cancel_status: Arc<Mutex<CancelStatus>>,
    ping_status: Arc<Mutex<PingStatus>>,
    job_uuids: Arc<Mutex<Vec<Uuid>>>,
}

impl FakeInterpreter {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let process_uuid = Uuid::new_v4();
        let pushes: Arc<Mutex<Vec<PushRequest>>> = Arc::default();
        let cancels: Arc<Mutex<Vec<Uuid>>> = Arc::default();
        let push_status = Arc::new(Mutex::new(PushStatus::Accept));
        let cancel_status = Arc::new(Mutex::new(CancelStatus::Accept));
        let ping_status = Arc::new(Mutex::new(PingStatus::Ok));
        let job_uuids: Arc<Mutex<Vec<Uuid>>> = Arc::default();

        {
            let pushes = Arc::clone(&pushes);
            let cancels = Arc::clone(&cancels);
            let push_status = Arc::clone(&push_status);
            let cancel_status = Arc::clone(&cancel_status);
            let ping_status = Arc::clone(&ping_status);
            let job_uuids = Arc::clone(&job_uuids);
            tokio::spawn(async move {
                while let Ok((stream, _)) = listener.accept().await {
                    let mut transport = framed(stream);
                    let Ok(request) =
                        recv_message::<_, InterpreterRequest>(&mut transport).await
                    else {
                        continue;
                    };
                    let response = match request {
                        InterpreterRequest::Push(push) => {
                            pushes.lock().unwrap().push(push);
                            let interpreter_job_uuid = Uuid::new_v4();
                            job_uuids.lock().unwrap().push(interpreter_job_uuid);
                            InterpreterResponse::Push(PushResult {
                                status: *push_status.lock().unwrap(),
                                interpreter_process_uuid: process_uuid,
                                interpreter_job_uuid,
                            })
                        }
                        InterpreterRequest::Ping => InterpreterResponse::Ping(PingResult {
                            status: *ping_status.lock().unwrap(),
                        }),
                        InterpreterRequest::Cancel {
                            interpreter_job_uuid,
                        } => {
                            cancels.lock().unwrap().push(interpreter_job_uuid);
                            InterpreterResponse::Cancel(CancelResult {
                                status: *cancel_status.lock().unwrap(),
                            })
                        }
                        InterpreterRequest::Shutdown => InterpreterResponse::Shutdown,
                    };
                    let _ = send_message(&mut transport, &response).await;
                }
            });
        }

        Self {
            port,
            process_uuid,
            pushes,
            cancels,
            push_status,
            cancel_status,
            ping_status,
            job_uuids,
        }
    }

    /// Insert this process as a Ready registry entry for `shebang`.
    pub async fn register(&self, registry: &ProcessRegistry, shebang: &str) {
        registry.starting(shebang).await;
        registry
            .handle_register_event(&RegisterInfo {
                shebang: shebang.to_string(),
                host: "127.0.0.1".to_string(),
                port: self.port,
                process_uuid: self.process_uuid,
            })
            .await;
    }

    pub fn set_push_status(&self, status: PushStatus) {
        *self.push_status.lock().unwrap() = status;
    }

    pub fn set_cancel_status(&self, status: CancelStatus) {
        *self.cancel_status.lock().unwrap() = status;
    }

    pub fn set_ping_status(&self, status: PingStatus) {
        *self.ping_status.lock().unwrap() = status;
    }

    pub fn pushes(&self) -> Vec<PushRequest> {
        self.pushes.lock().unwrap().clone()
    }

    pub fn cancels(&self) -> Vec<Uuid> {
        self.cancels.lock().unwrap().clone()
    }

    /// Job uuids handed out for accepted pushes, in order.
    pub fn job_uuids(&self) -> Vec<Uuid> {
        self.job_uuids.lock().unwrap().clone()
    }
}
