use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod migrator;
pub mod repositories;

pub use repositories::cache::CacheRepository;
pub use repositories::catalog::{
    CatalogRepository, MoveOutcome, NewSavedItem, SavedItem, Wishlist,
};
pub use repositories::history::{HistoryRepository, NewSwipeRecord};
pub use repositories::jobs::{JobCounts, JobRecord, JobRepository, JobState, NewJob};
pub use repositories::session::{NewSession, SessionRepository, SessionRow};

/// Formats a timestamp the way every table stores it.
///
/// Fixed precision and a `Z` suffix keep lexical order equal to time order,
/// which the staleness and expiry filters depend on.
#[must_use]
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[must_use]
pub fn now_timestamp() -> String {
    timestamp(Utc::now())
}

#[must_use]
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            let path_str = path_str.split('?').next().unwrap_or(path_str);
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    #[must_use]
    pub fn cache_repo(&self) -> CacheRepository {
        CacheRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn session_repo(&self) -> SessionRepository {
        SessionRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn catalog_repo(&self) -> CatalogRepository {
        CatalogRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn history_repo(&self) -> HistoryRepository {
        HistoryRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn job_repo(&self) -> JobRepository {
        JobRepository::new(self.conn.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamps_sort_lexically() {
        let earlier = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let later = earlier + chrono::Duration::microseconds(1);
        assert!(timestamp(earlier) < timestamp(later));
        assert_eq!(timestamp(earlier), "2026-01-01T00:00:00.000000Z");
    }

    #[test]
    fn parse_round_trips() {
        let at = Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap();
        assert_eq!(parse_timestamp(&timestamp(at)), Some(at));
        assert_eq!(parse_timestamp("yesterday"), None);
    }
}
