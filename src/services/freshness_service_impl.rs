use crate::db::{SavedItem, Store};
use crate::domain::UserContext;
use crate::services::availability::{AvailabilityCheck, AvailabilityChecker};
use crate::services::freshness_service::{FreshnessScheduler, MaintenanceError, MaintenanceRun};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

pub struct SeaOrmFreshnessScheduler {
    store: Store,
    checker: Arc<dyn AvailabilityChecker>,
    staleness: chrono::Duration,
    batch_size: u32,
}

impl SeaOrmFreshnessScheduler {
    #[must_use]
    pub fn new(
        store: Store,
        checker: Arc<dyn AvailabilityChecker>,
        staleness: chrono::Duration,
        batch_size: u32,
    ) -> Self {
        Self {
            store,
            checker,
            staleness,
            batch_size,
        }
    }

    fn cutoff(&self) -> String {
        crate::db::timestamp(chrono::Utc::now() - self.staleness)
    }

    /// Checks items one at a time, oldest first. A failure on one item is
    /// logged and counted; it never stops the loop.
    async fn run(&self, items: Vec<SavedItem>, scope: &str) -> MaintenanceRun {
        let started = Instant::now();
        let repo = self.store.catalog_repo();
        let mut run = MaintenanceRun::default();

        for item in items {
            run.total_checked += 1;

            let check = match self.checker.check(&item.upstream_item_id).await {
                Ok(check) => check,
                Err(e) => {
                    error!(
                        item_id = item.id,
                        upstream_item_id = %item.upstream_item_id,
                        error = %e,
                        "Availability check failed"
                    );
                    run.failed_checks += 1;
                    metrics::counter!("freshness_items_checked_total", "outcome" => "error")
                        .increment(1);
                    continue;
                }
            };

            let status = check.persisted_status();
            let written = match repo.update_status(item.id, status).await {
                Ok(written) => written,
                Err(e) => {
                    error!(
                        item_id = item.id,
                        status = %status,
                        error = %e,
                        "Failed to write availability status"
                    );
                    false
                }
            };

            let outcome = match &check {
                AvailabilityCheck::CheckFailed { reason } => {
                    warn!(
                        item_id = item.id,
                        upstream_item_id = %item.upstream_item_id,
                        reason = %reason,
                        "Could not determine availability, keeping item visible"
                    );
                    run.failed_checks += 1;
                    "check_failed"
                }
                AvailabilityCheck::Determined(s) if s.is_available() => {
                    run.available_count += 1;
                    "available"
                }
                AvailabilityCheck::Determined(s) => {
                    run.unavailable_count += 1;
                    if written {
                        run.deactivated_count += 1;
                        info!(
                            item_id = item.id,
                            upstream_item_id = %item.upstream_item_id,
                            status = %s,
                            "Deactivated saved item"
                        );
                    }
                    "unavailable"
                }
            };

            metrics::counter!("freshness_items_checked_total", "outcome" => outcome).increment(1);
        }

        info!(
            scope,
            total_checked = run.total_checked,
            available = run.available_count,
            unavailable = run.unavailable_count,
            deactivated = run.deactivated_count,
            failed = run.failed_checks,
            duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Freshness run finished"
        );

        run
    }
}

#[async_trait::async_trait]
impl FreshnessScheduler for SeaOrmFreshnessScheduler {
    async fn refresh_user(&self, user: &UserContext) -> Result<MaintenanceRun, MaintenanceError> {
        let repo = self.store.catalog_repo();
        let wishlist_ids = repo.wishlist_ids_for_user(user.user_id.as_str()).await?;
        let items = repo
            .find_stale(
                Some(&wishlist_ids),
                &self.cutoff(),
                u64::from(self.batch_size),
            )
            .await?;

        Ok(self.run(items, "user").await)
    }

    async fn refresh_catalog(&self) -> Result<MaintenanceRun, MaintenanceError> {
        let items = self
            .store
            .catalog_repo()
            .find_stale(None, &self.cutoff(), u64::from(self.batch_size))
            .await?;

        Ok(self.run(items, "catalog").await)
    }
}
