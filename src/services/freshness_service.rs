//! Catalog freshness: re-validates stale saved items against the marketplace.

use crate::domain::UserContext;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MaintenanceError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sea_orm::DbErr> for MaintenanceError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for MaintenanceError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Summary of one freshness run. Built once and never mutated afterwards.
///
/// `total_checked = available_count + unavailable_count + failed_checks`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MaintenanceRun {
    pub total_checked: u64,
    pub available_count: u64,
    pub unavailable_count: u64,
    /// Unavailable items whose new status was written.
    pub deactivated_count: u64,
    /// Checks that produced no classification.
    pub failed_checks: u64,
}

#[async_trait::async_trait]
pub trait FreshnessScheduler: Send + Sync {
    /// Interactive path: checks the user's own stale items.
    async fn refresh_user(&self, user: &UserContext) -> Result<MaintenanceRun, MaintenanceError>;

    /// Autonomous path: checks the stalest items across every user.
    async fn refresh_catalog(&self) -> Result<MaintenanceRun, MaintenanceError>;
}
