use crate::db::{JobRecord, JobState};
use crate::jobs::queue::{JobError, JobQueue};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Processes jobs from one queue.
#[async_trait::async_trait]
pub trait JobHandler: Send + Sync {
    fn queue(&self) -> &'static str;

    async fn handle(&self, job: &JobRecord) -> anyhow::Result<()>;
}

/// Polls one queue and runs its handler, one job at a time.
pub struct Worker {
    queue: Arc<dyn JobQueue>,
    handler: Arc<dyn JobHandler>,
    poll_interval: Duration,
}

impl Worker {
    #[must_use]
    pub fn new(
        queue: Arc<dyn JobQueue>,
        handler: Arc<dyn JobHandler>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            queue,
            handler,
            poll_interval,
        }
    }

    /// Runs until `shutdown` turns true. A job already claimed is always
    /// finished before the loop exits.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let queue_name = self.handler.queue();
        info!(queue = queue_name, "Worker started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            match self.run_once().await {
                Ok(true) => continue,
                Ok(false) => {}
                Err(e) => error!(queue = queue_name, error = %e, "Worker failed to poll queue"),
            }

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                () = tokio::time::sleep(self.poll_interval) => {}
            }
        }

        info!(queue = queue_name, "Worker stopped");
    }

    /// Claims and processes at most one job. Returns whether a job ran.
    ///
    /// Handler errors and panics are caught here, recorded on the job and
    /// never propagated.
    pub async fn run_once(&self) -> Result<bool, JobError> {
        let queue_name = self.handler.queue();
        let Some(job) = self.queue.claim(queue_name).await? else {
            return Ok(false);
        };

        let start = Instant::now();
        info!(
            event = "job_started",
            job_name = %job.name,
            job_id = job.id,
            attempt = job.attempts,
            "Starting job"
        );

        // Dropping the set aborts the handler, so aborting this worker never
        // leaves it running detached.
        let handler = Arc::clone(&self.handler);
        let running = job.clone();
        let mut in_flight = JoinSet::new();
        in_flight.spawn(async move { handler.handle(&running).await });

        let failure = match in_flight.join_next().await {
            Some(Ok(Ok(()))) => None,
            Some(Ok(Err(e))) => Some(format!("{e:#}")),
            Some(Err(join_err)) if join_err.is_panic() => Some("job handler panicked".to_string()),
            Some(Err(join_err)) => Some(join_err.to_string()),
            None => Some("job handler was not started".to_string()),
        };

        let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        match failure {
            None => {
                self.queue.complete(&job).await?;
                metrics::counter!("jobs_processed_total", "queue" => queue_name, "outcome" => "completed")
                    .increment(1);
                info!(
                    event = "job_finished",
                    job_name = %job.name,
                    job_id = job.id,
                    duration_ms,
                    "Job finished"
                );
            }
            Some(message) => {
                let next = self.queue.fail(&job, &message).await?;
                let outcome = if next == JobState::Failed {
                    "failed"
                } else {
                    "retried"
                };
                metrics::counter!("jobs_processed_total", "queue" => queue_name, "outcome" => outcome)
                    .increment(1);
                error!(
                    event = "job_failed",
                    job_name = %job.name,
                    job_id = job.id,
                    duration_ms,
                    error = %message,
                    next_state = %next,
                    "Job failed"
                );
                if next == JobState::Failed {
                    warn!(job_name = %job.name, job_id = job.id, "Job gave up after max attempts");
                } else {
                    debug!(job_name = %job.name, job_id = job.id, "Job scheduled for retry");
                }
            }
        }

        Ok(true)
    }
}
