//! Background work: cron triggers feed the durable queue, workers drain it.
//!
//! The catalog freshness sweep is a singleton. Before anything is enqueued
//! the coordinator looks for a waiting, active or delayed run under the same
//! key and skips if one exists; the partial unique index on `jobs` backs the
//! check up when two triggers race.

use crate::config::Config;
use crate::db::NewJob;
use crate::jobs::queue::{JobError, JobQueue};
use crate::jobs::worker::{JobHandler, Worker};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinSet;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{debug, error, info, warn};

pub const CATALOG_FRESHNESS_QUEUE: &str = "catalog-freshness";
pub const CATALOG_FRESHNESS_KEY: &str = "catalog-freshness-sweep";
pub const SESSION_MAINTENANCE_QUEUE: &str = "session-maintenance";
pub const SESSION_MAINTENANCE_KEY: &str = "session-maintenance-sweep";

/// Enqueues a singleton job unless one is already live.
///
/// Returns `true` when a new job was enqueued.
pub async fn enqueue_singleton(
    queue: &dyn JobQueue,
    queue_name: &str,
    singleton_key: &str,
    max_attempts: u32,
) -> Result<bool, JobError> {
    if let Some(existing) = queue.find_live(queue_name, singleton_key).await? {
        debug!(
            queue = queue_name,
            job_id = existing.id,
            state = %existing.state,
            "Singleton job already live, skipping"
        );
        return Ok(false);
    }

    let id = queue
        .enqueue(NewJob {
            queue: queue_name.to_string(),
            name: singleton_key.to_string(),
            singleton_key: Some(singleton_key.to_string()),
            payload: serde_json::json!({}),
            max_attempts: i32::try_from(max_attempts).unwrap_or(i32::MAX),
            run_at: Utc::now(),
        })
        .await?;

    Ok(id.is_some())
}

/// Periodically returns jobs whose lease ran out to `waiting`. A job left
/// `active` by a crash is only recoverable once its lease passes, which may
/// be long after startup.
async fn reap_expired_leases(
    queue: Arc<dyn JobQueue>,
    every: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            () = tokio::time::sleep(every) => {
                if let Err(e) = queue.recover_expired_leases().await {
                    error!(error = %e, "Failed to recover expired job leases");
                }
            }
        }
    }
    debug!("Lease reaper stopped");
}

pub struct JobCoordinator {
    queue: Arc<dyn JobQueue>,
    handlers: Vec<Arc<dyn JobHandler>>,
    config: Config,
    scheduler: Mutex<Option<JobScheduler>>,
    workers: Mutex<JoinSet<()>>,
    shutdown_tx: watch::Sender<bool>,
}

impl JobCoordinator {
    #[must_use]
    pub fn new(queue: Arc<dyn JobQueue>, config: Config) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            queue,
            handlers: Vec::new(),
            config,
            scheduler: Mutex::new(None),
            workers: Mutex::new(JoinSet::new()),
            shutdown_tx,
        }
    }

    /// Registers a handler. One worker per handler is started by [`start`].
    ///
    /// [`start`]: Self::start
    #[must_use]
    pub fn with_handler(mut self, handler: Arc<dyn JobHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    fn max_attempts(&self) -> u32 {
        self.config.queue.max_attempts.max(1)
    }

    pub async fn enqueue_catalog_freshness(&self) -> Result<bool, JobError> {
        enqueue_singleton(
            self.queue.as_ref(),
            CATALOG_FRESHNESS_QUEUE,
            CATALOG_FRESHNESS_KEY,
            self.max_attempts(),
        )
        .await
    }

    pub async fn enqueue_session_maintenance(&self) -> Result<bool, JobError> {
        enqueue_singleton(
            self.queue.as_ref(),
            SESSION_MAINTENANCE_QUEUE,
            SESSION_MAINTENANCE_KEY,
            self.max_attempts(),
        )
        .await
    }

    /// Startup sequence: drop leftover freshness jobs, recover expired
    /// leases, start workers and the lease reaper, register cron triggers,
    /// then optionally kick off one freshness run.
    pub async fn start(&self) -> Result<(), JobError> {
        let cleared = self.queue.clear(CATALOG_FRESHNESS_QUEUE).await?;
        info!(cleared, "Cleared catalog freshness queue at startup");

        self.queue.recover_expired_leases().await?;

        self.spawn_workers().await;
        self.register_triggers().await?;

        if self.config.freshness.enabled && self.config.freshness.run_on_startup {
            match self.enqueue_catalog_freshness().await {
                Ok(true) => info!("Queued startup catalog freshness run"),
                Ok(false) => debug!("Startup catalog freshness run already queued"),
                Err(e) => error!(error = %e, "Failed to queue startup catalog freshness run"),
            }
        }

        Ok(())
    }

    async fn spawn_workers(&self) {
        let poll = Duration::from_millis(self.config.queue.poll_interval_ms.max(10));
        let mut workers = self.workers.lock().await;

        for handler in &self.handlers {
            let worker = Worker::new(Arc::clone(&self.queue), Arc::clone(handler), poll);
            workers.spawn(worker.run(self.shutdown_tx.subscribe()));
        }

        let every = Duration::from_millis(self.config.queue.lease_check_interval_ms.max(10));
        workers.spawn(reap_expired_leases(
            Arc::clone(&self.queue),
            every,
            self.shutdown_tx.subscribe(),
        ));
    }

    async fn register_triggers(&self) -> Result<(), JobError> {
        let sched = JobScheduler::new().await?;
        let max_attempts = self.max_attempts();

        let queue = Arc::clone(&self.queue);
        let maintenance = Job::new_async(self.config.sessions.reset_cron.as_str(), move |_uuid, _lock| {
            let queue = Arc::clone(&queue);
            Box::pin(async move {
                if let Err(e) = enqueue_singleton(
                    queue.as_ref(),
                    SESSION_MAINTENANCE_QUEUE,
                    SESSION_MAINTENANCE_KEY,
                    max_attempts,
                )
                .await
                {
                    error!(
                        event = "job_failed",
                        job_name = SESSION_MAINTENANCE_KEY,
                        error = %e,
                        "Failed to enqueue session maintenance"
                    );
                }
            })
        })?;
        sched.add(maintenance).await?;
        info!(cron = %self.config.sessions.reset_cron, "Session maintenance scheduled");

        if self.config.freshness.enabled {
            let queue = Arc::clone(&self.queue);
            let freshness = Job::new_async(self.config.freshness.cron.as_str(), move |_uuid, _lock| {
                let queue = Arc::clone(&queue);
                Box::pin(async move {
                    if let Err(e) = enqueue_singleton(
                        queue.as_ref(),
                        CATALOG_FRESHNESS_QUEUE,
                        CATALOG_FRESHNESS_KEY,
                        max_attempts,
                    )
                    .await
                    {
                        error!(
                            event = "job_failed",
                            job_name = CATALOG_FRESHNESS_KEY,
                            error = %e,
                            "Failed to enqueue catalog freshness"
                        );
                    }
                })
            })?;
            sched.add(freshness).await?;
            info!(cron = %self.config.freshness.cron, "Catalog freshness scheduled");
        } else {
            info!("Catalog freshness is disabled in config");
        }

        sched.start().await?;
        *self.scheduler.lock().await = Some(sched);
        Ok(())
    }

    /// Stops the triggers, tells workers to stop claiming, then waits for
    /// in-flight jobs. Workers still running at the timeout are aborted;
    /// their jobs are picked up again once the lease expires.
    pub async fn shutdown(&self) -> Result<(), JobError> {
        info!("Stopping job coordinator...");

        if let Some(mut sched) = self.scheduler.lock().await.take()
            && let Err(e) = sched.shutdown().await
        {
            warn!(error = %e, "Cron scheduler did not shut down cleanly");
        }

        self.shutdown_tx.send_replace(true);

        let timeout = self.config.queue.shutdown_timeout_seconds;
        let mut workers = self.workers.lock().await;

        let drained = tokio::time::timeout(Duration::from_secs(timeout), async {
            while let Some(result) = workers.join_next().await {
                if let Err(e) = result {
                    error!(error = %e, "Worker task ended abnormally");
                }
            }
        })
        .await;

        if drained.is_err() {
            workers.abort_all();
            warn!(timeout, "Workers did not finish before the shutdown timeout");
            return Err(JobError::ShutdownTimeout(timeout));
        }

        info!("Job coordinator stopped");
        Ok(())
    }
}
