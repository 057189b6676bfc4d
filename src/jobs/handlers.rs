use crate::db::JobRecord;
use crate::jobs::coordinator::{
    CATALOG_FRESHNESS_KEY, CATALOG_FRESHNESS_QUEUE, SESSION_MAINTENANCE_QUEUE, enqueue_singleton,
};
use crate::jobs::queue::{JobError, JobQueue};
use crate::jobs::worker::JobHandler;
use crate::services::{FreshnessScheduler, MaintenanceRun, SearchResultCache, SessionTracker};
use std::sync::Arc;
use tracing::{info, warn};

/// Runs one catalog-wide freshness sweep.
pub struct CatalogFreshnessHandler {
    scheduler: Arc<dyn FreshnessScheduler>,
}

impl CatalogFreshnessHandler {
    #[must_use]
    pub fn new(scheduler: Arc<dyn FreshnessScheduler>) -> Self {
        Self { scheduler }
    }
}

#[async_trait::async_trait]
impl JobHandler for CatalogFreshnessHandler {
    fn queue(&self) -> &'static str {
        CATALOG_FRESHNESS_QUEUE
    }

    async fn handle(&self, job: &JobRecord) -> anyhow::Result<()> {
        let run = self.scheduler.refresh_catalog().await?;
        info!(
            job_id = job.id,
            total_checked = run.total_checked,
            deactivated = run.deactivated_count,
            "Catalog freshness sweep complete"
        );
        Ok(())
    }
}

/// Result of asking for a catalog sweep outside the daemon.
#[derive(Debug)]
pub enum SweepOutcome {
    Ran(MaintenanceRun),
    /// Another sweep is waiting, running or scheduled for retry.
    AlreadyLive,
    /// A running daemon claimed the job first and will run it.
    HandedOff,
}

/// Runs one catalog sweep in the caller's process while holding the sweep's
/// singleton key, so it never overlaps a queued or running daemon sweep.
///
/// A failed run is recorded on the job and left for the daemon to retry.
pub async fn run_catalog_sweep_now(
    queue: &dyn JobQueue,
    scheduler: &dyn FreshnessScheduler,
    max_attempts: u32,
) -> Result<SweepOutcome, JobError> {
    let enqueued = enqueue_singleton(
        queue,
        CATALOG_FRESHNESS_QUEUE,
        CATALOG_FRESHNESS_KEY,
        max_attempts,
    )
    .await?;
    if !enqueued {
        return Ok(SweepOutcome::AlreadyLive);
    }

    let Some(job) = queue.claim(CATALOG_FRESHNESS_QUEUE).await? else {
        return Ok(SweepOutcome::HandedOff);
    };

    match scheduler.refresh_catalog().await {
        Ok(run) => {
            queue.complete(&job).await?;
            Ok(SweepOutcome::Ran(run))
        }
        Err(e) => {
            queue.fail(&job, &e.to_string()).await?;
            Err(JobError::Handler(e.to_string()))
        }
    }
}

/// Resets idle search sessions and purges expired cache entries.
pub struct SessionMaintenanceHandler {
    sessions: Arc<dyn SessionTracker>,
    cache: Arc<SearchResultCache>,
    retention: chrono::Duration,
}

impl SessionMaintenanceHandler {
    #[must_use]
    pub fn new(
        sessions: Arc<dyn SessionTracker>,
        cache: Arc<SearchResultCache>,
        retention: chrono::Duration,
    ) -> Self {
        Self {
            sessions,
            cache,
            retention,
        }
    }
}

#[async_trait::async_trait]
impl JobHandler for SessionMaintenanceHandler {
    fn queue(&self) -> &'static str {
        SESSION_MAINTENANCE_QUEUE
    }

    async fn handle(&self, job: &JobRecord) -> anyhow::Result<()> {
        let reset = self.sessions.reset_inactive(self.retention).await?;

        // The purge only bounds table growth; expired rows are already invisible.
        let purged = match self.cache.purge_expired().await {
            Ok(n) => n,
            Err(e) => {
                warn!(job_id = job.id, error = %e, "Failed to purge expired search cache");
                0
            }
        };

        info!(job_id = job.id, reset, purged, "Session maintenance complete");
        Ok(())
    }
}
