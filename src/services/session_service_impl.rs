use crate::db::{NewSession, SessionRow, Store};
use crate::domain::UserContext;
use crate::services::fingerprint::{SearchFilters, SearchFingerprint};
use crate::services::session_service::{SessionError, SessionSnapshot, SessionTracker};
use tracing::{debug, info, warn};

pub struct SeaOrmSessionTracker {
    store: Store,
    upstream_page_size: u32,
}

impl SeaOrmSessionTracker {
    #[must_use]
    pub const fn new(store: Store, upstream_page_size: u32) -> Self {
        Self {
            store,
            upstream_page_size,
        }
    }

    fn snapshot(row: SessionRow) -> SessionSnapshot {
        let filters = serde_json::from_str(&row.filters_json).unwrap_or_else(|e| {
            warn!(session_id = row.id, error = %e, "Unreadable filter snapshot on session");
            SearchFilters::default()
        });

        SessionSnapshot {
            id: row.id,
            fingerprint: row.fingerprint,
            query: row.query,
            filters,
            current_offset: u64::try_from(row.current_offset).unwrap_or(0),
            items_seen: u64::try_from(row.items_seen).unwrap_or(0),
            last_activity_at: row.last_activity_at,
            created_at: row.created_at,
        }
    }
}

#[async_trait::async_trait]
impl SessionTracker for SeaOrmSessionTracker {
    async fn lookup_or_create(
        &self,
        user: &UserContext,
        fingerprint: &SearchFingerprint,
        query: &str,
        filters: &SearchFilters,
    ) -> Result<SessionSnapshot, SessionError> {
        let repo = self.store.session_repo();
        let user_id = user.user_id.as_str();

        if let Some(existing) = repo.find(user_id, fingerprint.as_str()).await? {
            repo.touch(existing.id).await?;
            let row = repo
                .find_by_id(existing.id)
                .await?
                .ok_or(SessionError::NotFound(existing.id))?;
            return Ok(Self::snapshot(row));
        }

        let filters_json = serde_json::to_string(filters)
            .map_err(|e| SessionError::Validation(format!("Unserializable filters: {e}")))?;

        let inserted = repo
            .insert_if_absent(&NewSession {
                user_id,
                fingerprint: fingerprint.as_str(),
                query,
                filters_json: &filters_json,
            })
            .await?;

        let row = repo
            .find(user_id, fingerprint.as_str())
            .await?
            .ok_or_else(|| SessionError::Database("session missing after insert".to_string()))?;

        if inserted {
            info!(user_id = %user.user_id, session_id = row.id, "Created search session");
            Ok(Self::snapshot(row))
        } else {
            debug!(session_id = row.id, "Lost session insert race, reusing existing row");
            repo.touch(row.id).await?;
            let row = repo
                .find_by_id(row.id)
                .await?
                .ok_or(SessionError::NotFound(row.id))?;
            Ok(Self::snapshot(row))
        }
    }

    async fn record_progress(
        &self,
        user: &UserContext,
        session_id: i32,
        items_consumed: u64,
        new_page_fetched: bool,
    ) -> Result<SessionSnapshot, SessionError> {
        let items_delta = i64::try_from(items_consumed)
            .map_err(|_| SessionError::Validation("item count out of range".to_string()))?;
        let offset_delta = if new_page_fetched {
            i64::from(self.upstream_page_size)
        } else {
            0
        };

        let repo = self.store.session_repo();
        let updated = repo
            .advance(session_id, user.user_id.as_str(), items_delta, offset_delta)
            .await?;

        if !updated {
            return Err(SessionError::NotFound(session_id));
        }

        let row = repo
            .find_by_id(session_id)
            .await?
            .ok_or(SessionError::NotFound(session_id))?;

        debug!(
            session_id,
            items_consumed,
            new_page_fetched,
            offset = row.current_offset,
            "Recorded session progress"
        );

        Ok(Self::snapshot(row))
    }

    async fn reset_inactive(&self, retention: chrono::Duration) -> Result<u64, SessionError> {
        let cutoff = crate::db::timestamp(chrono::Utc::now() - retention);
        let reset = self.store.session_repo().reset_inactive(&cutoff).await?;

        if reset > 0 {
            info!(reset, cutoff = %cutoff, "Reset inactive search sessions");
        }

        Ok(reset)
    }
}
