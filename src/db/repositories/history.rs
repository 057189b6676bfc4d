use crate::domain::SwipeOutcome;
use crate::entities::{prelude::*, swipe_history};
use anyhow::Result;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, Set};

#[derive(Debug, Clone)]
pub struct NewSwipeRecord {
    pub user_id: String,
    pub upstream_item_id: String,
    pub outcome: SwipeOutcome,
    pub query: Option<String>,
    pub filters_json: Option<String>,
    pub price: Option<f64>,
    pub session_id: Option<i32>,
}

/// Append-only log of swipes. Nothing in the service updates or deletes rows.
pub struct HistoryRepository {
    conn: DatabaseConnection,
}

impl HistoryRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn append(&self, record: &NewSwipeRecord) -> Result<i32> {
        let active_model = swipe_history::ActiveModel {
            user_id: Set(record.user_id.clone()),
            upstream_item_id: Set(record.upstream_item_id.clone()),
            outcome: Set(record.outcome.as_str().to_string()),
            query: Set(record.query.clone()),
            filters_json: Set(record.filters_json.clone()),
            price: Set(record.price),
            session_id: Set(record.session_id),
            created_at: Set(crate::db::now_timestamp()),
            ..Default::default()
        };

        let result = SwipeHistory::insert(active_model).exec(&self.conn).await?;
        Ok(result.last_insert_id)
    }

    pub async fn count_for_user(&self, user_id: &str) -> Result<u64> {
        let count = SwipeHistory::find()
            .filter(swipe_history::Column::UserId.eq(user_id))
            .count(&self.conn)
            .await?;

        Ok(count)
    }
}
