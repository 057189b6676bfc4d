pub mod coordinator;
pub mod handlers;
pub mod queue;
pub mod worker;

pub use coordinator::{
    CATALOG_FRESHNESS_KEY, CATALOG_FRESHNESS_QUEUE, JobCoordinator, SESSION_MAINTENANCE_KEY,
    SESSION_MAINTENANCE_QUEUE, enqueue_singleton,
};
pub use handlers::{
    CatalogFreshnessHandler, SessionMaintenanceHandler, SweepOutcome, run_catalog_sweep_now,
};
pub use queue::{JobError, JobQueue, SqliteJobQueue};
pub use worker::{JobHandler, Worker};
