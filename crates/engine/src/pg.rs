//! Postgres-backed [`JobStore`] over the `folio-db` repositories.

use async_trait::async_trait;
use folio_core::status::{BatchStatus, StatusId};
use folio_core::types::DbId;
use folio_db::models::batch::JobBatch;
use folio_db::models::job::{Job, NewJob};
use folio_db::models::payload::JobPayload;
use folio_db::repositories::{JobBatchRepo, JobPayloadRepo, JobRepo, JobResultRepo};
use sqlx::PgPool;
use uuid::Uuid;

use crate::store::{BatchSubmission, JobStore, StoreError};

/// Production store backed by a connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PgStore {
    async fn submit_batch(&self, input: &BatchSubmission) -> Result<DbId, StoreError> {
        let mut tx = self.pool.begin().await?;

        let batch = JobBatchRepo::insert(&mut *tx, input.note_id, BatchStatus::Pending).await?;
        for (index, paragraph) in input.paragraphs.iter().enumerate() {
            let job = JobRepo::insert(
                &mut *tx,
                &NewJob {
                    batch_id: batch.id,
                    note_id: input.note_id,
                    paragraph_id: paragraph.paragraph_id,
                    index_number: index as i32,
                    shebang: paragraph.shebang.clone(),
                    username: input.username.clone(),
                    roles: input.roles.clone(),
                },
            )
            .await?;
            JobPayloadRepo::insert(&mut *tx, job.id, &paragraph.payload).await?;
        }

        tx.commit().await?;
        Ok(batch.id)
    }

    async fn get_batch(&self, id: DbId) -> Result<Option<JobBatch>, StoreError> {
        Ok(JobBatchRepo::find_by_id(&self.pool, id).await?)
    }

    async fn update_batch(&self, batch: &JobBatch) -> Result<(), StoreError> {
        let affected = JobBatchRepo::update(&self.pool, batch).await?;
        if affected == 0 {
            return Err(StoreError::RowVanished {
                entity: "job_batch",
                id: batch.id,
            });
        }
        Ok(())
    }

    async fn batches_by_status(&self, status_id: StatusId) -> Result<Vec<JobBatch>, StoreError> {
        Ok(JobBatchRepo::list_by_status(&self.pool, status_id).await?)
    }

    async fn update_job(&self, job: &Job) -> Result<(), StoreError> {
        let affected = JobRepo::update(&self.pool, job).await?;
        if affected == 0 {
            return Err(StoreError::RowVanished {
                entity: "job",
                id: job.id,
            });
        }
        Ok(())
    }

    async fn next_ready_jobs(&self) -> Result<Vec<Job>, StoreError> {
        Ok(JobRepo::next_ready(&self.pool).await?)
    }

    async fn jobs_ready_to_cancel(&self) -> Result<Vec<Job>, StoreError> {
        Ok(JobRepo::ready_to_cancel(&self.pool).await?)
    }

    async fn jobs_bound_to(&self, process_uuid: Uuid) -> Result<Vec<Job>, StoreError> {
        Ok(JobRepo::bound_to_process(&self.pool, process_uuid).await?)
    }

    async fn jobs_by_batch(&self, batch_id: DbId) -> Result<Vec<Job>, StoreError> {
        Ok(JobRepo::list_by_batch(&self.pool, batch_id).await?)
    }

    async fn find_job_by_interpreter_job_uuid(
        &self,
        interpreter_job_uuid: Uuid,
    ) -> Result<Option<Job>, StoreError> {
        Ok(JobRepo::find_by_interpreter_job_uuid(&self.pool, interpreter_job_uuid).await?)
    }

    async fn restore_state(&self) -> Result<u64, StoreError> {
        Ok(JobRepo::restore_state(&self.pool).await?)
    }

    async fn requeue_orphans(&self, live_process_uuids: &[Uuid]) -> Result<u64, StoreError> {
        Ok(JobRepo::requeue_orphans(&self.pool, live_process_uuids).await?)
    }

    async fn get_payload(&self, job_id: DbId) -> Result<Option<JobPayload>, StoreError> {
        Ok(JobPayloadRepo::find_by_job_id(&self.pool, job_id).await?)
    }

    async fn insert_result(
        &self,
        job_id: DbId,
        message_type: &str,
        result: &str,
    ) -> Result<(), StoreError> {
        JobResultRepo::insert(&self.pool, job_id, message_type, result).await?;
        Ok(())
    }
}
