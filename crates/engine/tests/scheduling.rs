//! Batch scheduling rules: single-flight, strict ordering, fail-stop,
//! and crash compensation, exercised through the store seam.

mod support;

use assert_matches::assert_matches;
use folio_core::status::{BatchStatus, JobStatus};
use folio_core::types::DbId;
use folio_engine::ops::{self, OpsError};
use folio_engine::store::{JobStore, ParagraphSubmission};
use uuid::Uuid;

use support::MemoryStore;

fn paragraphs(count: usize) -> Vec<ParagraphSubmission> {
    (0..count)
        .map(|i| ParagraphSubmission {
            paragraph_id: 100 + i as DbId,
            shebang: "python".to_string(),
            payload: format!("print({i})"),
        })
        .collect()
}

async fn submit(store: &MemoryStore, count: usize) -> DbId {
    ops::submit_batch(
        store,
        1,
        paragraphs(count),
        "alice".to_string(),
        vec!["admin".to_string()],
    )
    .await
    .unwrap()
}

/// Bind a job to a process as an accepted push would.
async fn mark_running(store: &MemoryStore, job_id: DbId, process_uuid: Uuid) {
    let mut job = store.job(job_id).unwrap();
    job.status_id = JobStatus::Running.id();
    job.interpreter_process_uuid = Some(process_uuid);
    job.interpreter_job_uuid = Some(Uuid::new_v4());
    store.update_job(&job).await.unwrap();
}

#[tokio::test]
async fn at_most_one_ready_job_per_batch() {
    let store = MemoryStore::new();
    let batch_id = submit(&store, 3).await;

    let ready = store.next_ready_jobs().await.unwrap();
    assert_eq!(ready.len(), 1);
    assert_eq!(ready[0].batch_id, batch_id);
    assert_eq!(ready[0].index_number, 0);
}

#[tokio::test]
async fn independent_batches_are_each_scheduled() {
    let store = MemoryStore::new();
    let first = submit(&store, 2).await;
    let second = submit(&store, 2).await;

    let ready = store.next_ready_jobs().await.unwrap();
    assert_eq!(ready.len(), 2);
    assert_eq!(ready[0].batch_id, first);
    assert_eq!(ready[1].batch_id, second);
    assert!(ready.iter().all(|j| j.index_number == 0));
}

#[tokio::test]
async fn jobs_run_in_strict_index_order() {
    let store = MemoryStore::new();
    let batch_id = submit(&store, 3).await;

    let jobs = store.jobs_by_batch(batch_id).await.unwrap();
    store.set_job_status(jobs[0].id, JobStatus::Done);

    let ready = store.next_ready_jobs().await.unwrap();
    assert_eq!(ready.len(), 1);
    assert_eq!(ready[0].index_number, 1);
}

#[tokio::test]
async fn a_running_job_blocks_its_batch() {
    let store = MemoryStore::new();
    let batch_id = submit(&store, 2).await;

    let jobs = store.jobs_by_batch(batch_id).await.unwrap();
    mark_running(&store, jobs[0].id, Uuid::new_v4()).await;

    assert!(store.next_ready_jobs().await.unwrap().is_empty());
}

#[tokio::test]
async fn first_error_halts_the_batch() {
    let store = MemoryStore::new();
    let batch_id = submit(&store, 3).await;

    let jobs = store.jobs_by_batch(batch_id).await.unwrap();
    store.set_job_status(jobs[0].id, JobStatus::Done);
    store.set_job_status(jobs[1].id, JobStatus::Error);

    // Index 2 stays Pending but is never offered.
    assert!(store.next_ready_jobs().await.unwrap().is_empty());
    assert_eq!(store.job_status(jobs[2].id), Some(JobStatus::Pending));
}

#[tokio::test]
async fn terminal_batches_are_not_scheduled() {
    let store = MemoryStore::new();
    let batch_id = submit(&store, 1).await;

    let mut batch = store.batch(batch_id).unwrap();
    batch.status_id = BatchStatus::Aborting.id();
    store.update_batch(&batch).await.unwrap();

    assert!(store.next_ready_jobs().await.unwrap().is_empty());
}

#[tokio::test]
async fn restore_state_requeues_everything_and_is_idempotent() {
    let store = MemoryStore::new();
    let batch_id = submit(&store, 2).await;

    let jobs = store.jobs_by_batch(batch_id).await.unwrap();
    mark_running(&store, jobs[0].id, Uuid::new_v4()).await;

    assert_eq!(store.restore_state().await.unwrap(), 1);
    let restored = store.job(jobs[0].id).unwrap();
    assert_eq!(restored.status_id, JobStatus::Pending.id());
    assert!(restored.interpreter_process_uuid.is_none());
    assert!(restored.interpreter_job_uuid.is_none());

    // Second run touches nothing.
    assert_eq!(store.restore_state().await.unwrap(), 0);
}

#[tokio::test]
async fn requeue_orphans_spares_live_processes() {
    let store = MemoryStore::new();
    let first = submit(&store, 1).await;
    let second = submit(&store, 1).await;

    let live = Uuid::new_v4();
    let dead = Uuid::new_v4();
    let first_job = store.jobs_by_batch(first).await.unwrap()[0].id;
    let second_job = store.jobs_by_batch(second).await.unwrap()[0].id;
    mark_running(&store, first_job, live).await;
    mark_running(&store, second_job, dead).await;

    assert_eq!(store.requeue_orphans(&[live]).await.unwrap(), 1);
    assert_eq!(store.job_status(first_job), Some(JobStatus::Running));
    assert_eq!(store.job_status(second_job), Some(JobStatus::Pending));
    assert!(store
        .job(second_job)
        .unwrap()
        .interpreter_process_uuid
        .is_none());
}

#[tokio::test]
async fn jobs_bound_to_finds_a_dead_processes_jobs() {
    let store = MemoryStore::new();
    let first = submit(&store, 1).await;
    let second = submit(&store, 1).await;

    let process = Uuid::new_v4();
    let first_job = store.jobs_by_batch(first).await.unwrap()[0].id;
    let second_job = store.jobs_by_batch(second).await.unwrap()[0].id;
    mark_running(&store, first_job, process).await;
    mark_running(&store, second_job, Uuid::new_v4()).await;

    let bound = store.jobs_bound_to(process).await.unwrap();
    assert_eq!(bound.len(), 1);
    assert_eq!(bound[0].id, first_job);
}

#[tokio::test]
async fn empty_submission_is_rejected() {
    let store = MemoryStore::new();
    let result = ops::submit_batch(&store, 1, vec![], "alice".to_string(), vec![]).await;
    assert_matches!(result, Err(OpsError::Core(_)));
}

#[tokio::test]
async fn cancel_of_unknown_batch_fails() {
    let store = MemoryStore::new();
    let result = ops::cancel_batch(&store, 42).await;
    assert_matches!(result, Err(OpsError::BatchNotFound(42)));
}

#[tokio::test]
async fn cancel_marks_a_batch_aborting_once() {
    let store = MemoryStore::new();
    let batch_id = submit(&store, 1).await;

    ops::cancel_batch(&store, batch_id).await.unwrap();
    assert_eq!(store.batch_status(batch_id), Some(BatchStatus::Aborting));

    // Repeated cancel is a no-op.
    ops::cancel_batch(&store, batch_id).await.unwrap();
    assert_eq!(store.batch_status(batch_id), Some(BatchStatus::Aborting));
}

#[tokio::test]
async fn cancel_of_a_finished_batch_is_ignored() {
    let store = MemoryStore::new();
    let batch_id = submit(&store, 1).await;

    let mut batch = store.batch(batch_id).unwrap();
    batch.status_id = BatchStatus::Done.id();
    store.update_batch(&batch).await.unwrap();

    ops::cancel_batch(&store, batch_id).await.unwrap();
    assert_eq!(store.batch_status(batch_id), Some(BatchStatus::Done));
}
