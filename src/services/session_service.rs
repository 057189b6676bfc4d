//! Per-user pagination state for repeated searches.
//!
//! One session exists per (user, fingerprint). Sessions are created on the
//! first search, touched on every repeat, advanced as the client consumes
//! items and reset (never deleted) after a period of inactivity.

use crate::domain::UserContext;
use crate::services::fingerprint::{SearchFilters, SearchFingerprint};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Search session {0} not found")]
    NotFound(i32),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sea_orm::DbErr> for SessionError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for SessionError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub id: i32,
    pub fingerprint: String,
    pub query: String,
    pub filters: SearchFilters,
    pub current_offset: u64,
    pub items_seen: u64,
    pub last_activity_at: String,
    pub created_at: String,
}

#[async_trait::async_trait]
pub trait SessionTracker: Send + Sync {
    /// Finds the session for this user and fingerprint, creating it at
    /// offset 0 if absent. Refreshes last activity either way.
    ///
    /// Concurrent calls for the same pair resolve to the same row.
    async fn lookup_or_create(
        &self,
        user: &UserContext,
        fingerprint: &SearchFingerprint,
        query: &str,
        filters: &SearchFilters,
    ) -> Result<SessionSnapshot, SessionError>;

    /// Reports consumption. `items_seen` always grows by `items_consumed`;
    /// the offset grows by one upstream page only when `new_page_fetched`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotFound`] when the session does not exist or
    /// belongs to another user.
    async fn record_progress(
        &self,
        user: &UserContext,
        session_id: i32,
        items_consumed: u64,
        new_page_fetched: bool,
    ) -> Result<SessionSnapshot, SessionError>;

    /// Zeroes offset and counters of sessions idle longer than `retention`.
    async fn reset_inactive(&self, retention: chrono::Duration) -> Result<u64, SessionError>;
}
