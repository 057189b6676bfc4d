use crate::db::{JobCounts, JobRecord, JobState, NewJob, Store};
use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum JobError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Scheduler error: {0}")]
    Scheduler(String),

    #[error("Job handler failed: {0}")]
    Handler(String),

    #[error("Shutdown timed out after {0} seconds")]
    ShutdownTimeout(u64),
}

impl From<sea_orm::DbErr> for JobError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for JobError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<tokio_cron_scheduler::JobSchedulerError> for JobError {
    fn from(err: tokio_cron_scheduler::JobSchedulerError) -> Self {
        Self::Scheduler(err.to_string())
    }
}

/// Durable, at-least-once job queue.
#[async_trait::async_trait]
pub trait JobQueue: Send + Sync {
    /// Returns the new job id, or `None` when a live job already holds the
    /// singleton key.
    async fn enqueue(&self, job: NewJob) -> Result<Option<i32>, JobError>;

    /// The waiting, active or delayed job holding `singleton_key`.
    async fn find_live(
        &self,
        queue: &str,
        singleton_key: &str,
    ) -> Result<Option<JobRecord>, JobError>;

    async fn counts(&self, queue: &str) -> Result<JobCounts, JobError>;

    /// Removes every job in `queue`, whatever its state.
    async fn clear(&self, queue: &str) -> Result<u64, JobError>;

    /// Leases the next due job, if any.
    async fn claim(&self, queue: &str) -> Result<Option<JobRecord>, JobError>;

    async fn complete(&self, job: &JobRecord) -> Result<(), JobError>;

    /// Schedules a retry with backoff, or gives up once attempts run out.
    async fn fail(&self, job: &JobRecord, error: &str) -> Result<JobState, JobError>;

    /// Makes jobs whose lease expired claimable again.
    async fn recover_expired_leases(&self) -> Result<u64, JobError>;
}

pub struct SqliteJobQueue {
    store: Store,
    lease: chrono::Duration,
    retry_backoff: chrono::Duration,
}

impl SqliteJobQueue {
    #[must_use]
    pub const fn new(store: Store, lease: chrono::Duration, retry_backoff: chrono::Duration) -> Self {
        Self {
            store,
            lease,
            retry_backoff,
        }
    }
}

#[async_trait::async_trait]
impl JobQueue for SqliteJobQueue {
    async fn enqueue(&self, job: NewJob) -> Result<Option<i32>, JobError> {
        let id = self.store.job_repo().insert(&job).await?;
        match id {
            Some(id) => debug!(queue = %job.queue, job_name = %job.name, job_id = id, "Enqueued job"),
            None => debug!(
                queue = %job.queue,
                job_name = %job.name,
                "Singleton job already live, not enqueued"
            ),
        }
        Ok(id)
    }

    async fn find_live(
        &self,
        queue: &str,
        singleton_key: &str,
    ) -> Result<Option<JobRecord>, JobError> {
        Ok(self
            .store
            .job_repo()
            .find_live_singleton(queue, singleton_key)
            .await?)
    }

    async fn counts(&self, queue: &str) -> Result<JobCounts, JobError> {
        Ok(self.store.job_repo().counts(queue).await?)
    }

    async fn clear(&self, queue: &str) -> Result<u64, JobError> {
        let removed = self.store.job_repo().clear_queue(queue).await?;
        if removed > 0 {
            info!(queue, removed, "Cleared job queue");
        }
        Ok(removed)
    }

    async fn claim(&self, queue: &str) -> Result<Option<JobRecord>, JobError> {
        Ok(self
            .store
            .job_repo()
            .claim_next(queue, Utc::now(), self.lease)
            .await?)
    }

    async fn complete(&self, job: &JobRecord) -> Result<(), JobError> {
        Ok(self.store.job_repo().complete(job.id).await?)
    }

    async fn fail(&self, job: &JobRecord, error: &str) -> Result<JobState, JobError> {
        let backoff = self.retry_backoff * job.attempts.max(1);
        let retry_at = Utc::now() + backoff;
        Ok(self.store.job_repo().fail(job.id, error, retry_at).await?)
    }

    async fn recover_expired_leases(&self) -> Result<u64, JobError> {
        let recovered = self
            .store
            .job_repo()
            .recover_expired_leases(Utc::now())
            .await?;
        if recovered > 0 {
            info!(recovered, "Recovered jobs with expired leases");
        }
        Ok(recovered)
    }
}
