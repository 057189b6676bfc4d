use crate::entities::{prelude::*, search_cache};
use anyhow::Result;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

const MAX_TTL_DAYS: i64 = 3650;

pub struct CacheRepository {
    conn: DatabaseConnection,
}

impl CacheRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Returns the payload for `key` unless it is missing or expired.
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = crate::db::now_timestamp();

        let entry = SearchCache::find()
            .filter(search_cache::Column::CacheKey.eq(key))
            .filter(search_cache::Column::ExpiresAt.gt(now))
            .one(&self.conn)
            .await?;

        Ok(entry.map(|e| e.payload))
    }

    pub async fn set(&self, key: &str, payload: &str, ttl: std::time::Duration) -> Result<()> {
        let now = chrono::Utc::now();
        let max_ttl = chrono::Duration::days(MAX_TTL_DAYS);
        let ttl = chrono::Duration::from_std(ttl)
            .unwrap_or(max_ttl)
            .min(max_ttl);
        let expires_at = now + ttl;

        let active_model = search_cache::ActiveModel {
            cache_key: Set(key.to_string()),
            payload: Set(payload.to_string()),
            created_at: Set(crate::db::timestamp(now)),
            expires_at: Set(crate::db::timestamp(expires_at)),
            ..Default::default()
        };

        SearchCache::insert(active_model)
            .on_conflict(
                sea_orm::sea_query::OnConflict::column(search_cache::Column::CacheKey)
                    .update_columns([
                        search_cache::Column::Payload,
                        search_cache::Column::CreatedAt,
                        search_cache::Column::ExpiresAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.conn)
            .await?;

        Ok(())
    }

    /// Deletes expired rows and returns how many were removed.
    pub async fn purge_expired(&self) -> Result<u64> {
        let now = crate::db::now_timestamp();

        let result = SearchCache::delete_many()
            .filter(search_cache::Column::ExpiresAt.lte(now))
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected)
    }
}
