use crate::entities::{prelude::*, search_sessions};
use anyhow::Result;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, Set,
};

pub type SessionRow = search_sessions::Model;

#[derive(Debug, Clone)]
pub struct NewSession<'a> {
    pub user_id: &'a str,
    pub fingerprint: &'a str,
    pub query: &'a str,
    pub filters_json: &'a str,
}

pub struct SessionRepository {
    conn: DatabaseConnection,
}

impl SessionRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn find(&self, user_id: &str, fingerprint: &str) -> Result<Option<SessionRow>> {
        let row = SearchSessions::find()
            .filter(search_sessions::Column::UserId.eq(user_id))
            .filter(search_sessions::Column::Fingerprint.eq(fingerprint))
            .one(&self.conn)
            .await?;

        Ok(row)
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<SessionRow>> {
        Ok(SearchSessions::find_by_id(id).one(&self.conn).await?)
    }

    /// Inserts a fresh session at offset 0. Returns `false` when another
    /// writer already holds the (user, fingerprint) pair.
    pub async fn insert_if_absent(&self, session: &NewSession<'_>) -> Result<bool> {
        let now = crate::db::now_timestamp();

        let active_model = search_sessions::ActiveModel {
            user_id: Set(session.user_id.to_string()),
            fingerprint: Set(session.fingerprint.to_string()),
            query: Set(session.query.to_string()),
            filters_json: Set(session.filters_json.to_string()),
            current_offset: Set(0),
            items_seen: Set(0),
            last_activity_at: Set(now.clone()),
            created_at: Set(now),
            ..Default::default()
        };

        let inserted = SearchSessions::insert(active_model)
            .on_conflict(
                OnConflict::columns([
                    search_sessions::Column::UserId,
                    search_sessions::Column::Fingerprint,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(&self.conn)
            .await?;

        Ok(inserted > 0)
    }

    pub async fn touch(&self, id: i32) -> Result<()> {
        SearchSessions::update_many()
            .col_expr(
                search_sessions::Column::LastActivityAt,
                Expr::value(crate::db::now_timestamp()),
            )
            .filter(search_sessions::Column::Id.eq(id))
            .exec(&self.conn)
            .await?;

        Ok(())
    }

    /// Applies counter deltas in a single statement so concurrent progress
    /// reports never lose updates. Returns `false` if the session does not
    /// exist or belongs to someone else.
    pub async fn advance(
        &self,
        id: i32,
        user_id: &str,
        items_delta: i64,
        offset_delta: i64,
    ) -> Result<bool> {
        let result = SearchSessions::update_many()
            .col_expr(
                search_sessions::Column::ItemsSeen,
                Expr::col(search_sessions::Column::ItemsSeen).add(items_delta),
            )
            .col_expr(
                search_sessions::Column::CurrentOffset,
                Expr::col(search_sessions::Column::CurrentOffset).add(offset_delta),
            )
            .col_expr(
                search_sessions::Column::LastActivityAt,
                Expr::value(crate::db::now_timestamp()),
            )
            .filter(search_sessions::Column::Id.eq(id))
            .filter(search_sessions::Column::UserId.eq(user_id))
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected > 0)
    }

    /// Zeroes offset and counters for sessions idle since before `cutoff`.
    /// Rows are kept so returning users resume the same session.
    pub async fn reset_inactive(&self, cutoff: &str) -> Result<u64> {
        let result = SearchSessions::update_many()
            .col_expr(search_sessions::Column::CurrentOffset, Expr::value(0_i64))
            .col_expr(search_sessions::Column::ItemsSeen, Expr::value(0_i64))
            .filter(search_sessions::Column::LastActivityAt.lt(cutoff))
            .filter(
                Condition::any()
                    .add(search_sessions::Column::CurrentOffset.ne(0_i64))
                    .add(search_sessions::Column::ItemsSeen.ne(0_i64)),
            )
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected)
    }

    pub async fn count_for(&self, user_id: &str, fingerprint: &str) -> Result<u64> {
        let count = SearchSessions::find()
            .filter(search_sessions::Column::UserId.eq(user_id))
            .filter(search_sessions::Column::Fingerprint.eq(fingerprint))
            .count(&self.conn)
            .await?;

        Ok(count)
    }
}
