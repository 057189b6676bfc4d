//! Swipe recording: the only write path the client's batching layer touches.

use crate::domain::{SwipeOutcome, UserContext};
use crate::services::fingerprint::SearchFilters;
use crate::services::wishlist_service::WishlistError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest batch accepted in one call.
pub const MAX_BATCH_SIZE: usize = 100;

#[derive(Debug, Error)]
pub enum InteractionError {
    #[error("Validation error: {0}")]
    Validation(String),

    /// Entries before the failing one stay recorded.
    #[error("Recording stopped after {recorded} entries: {message}")]
    Interrupted { recorded: usize, message: String },

    #[error("Could not save item after {recorded} entries: {source}")]
    Save {
        recorded: usize,
        #[source]
        source: WishlistError,
    },

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sea_orm::DbErr> for InteractionError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for InteractionError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Where an accepted item should be saved, with the display fields captured
/// at swipe time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveTarget {
    pub wishlist_id: i32,
    pub title: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub seller_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwipeRecord {
    pub item_id: String,
    pub outcome: SwipeOutcome,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub filters: Option<SearchFilters>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub save_to: Option<SaveTarget>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionBatch {
    #[serde(default)]
    pub session_id: Option<i32>,
    pub records: Vec<SwipeRecord>,
}

impl InteractionBatch {
    /// Rejects malformed batches before anything is written.
    pub fn validate(&self) -> Result<(), InteractionError> {
        if self.records.is_empty() {
            return Err(InteractionError::Validation(
                "Batch must contain at least one record".to_string(),
            ));
        }

        if self.records.len() > MAX_BATCH_SIZE {
            return Err(InteractionError::Validation(format!(
                "Batch too large: {} records (max {MAX_BATCH_SIZE})",
                self.records.len()
            )));
        }

        for (i, record) in self.records.iter().enumerate() {
            if record.item_id.trim().is_empty() {
                return Err(InteractionError::Validation(format!(
                    "Record {i} has an empty item id"
                )));
            }
            if record.price.is_some_and(|p| !p.is_finite() || p < 0.0) {
                return Err(InteractionError::Validation(format!(
                    "Record {i} has an invalid price"
                )));
            }
            if record.save_to.is_some() && record.outcome != SwipeOutcome::Accept {
                return Err(InteractionError::Validation(format!(
                    "Record {i} has a save target but is not an accept"
                )));
            }
        }

        Ok(())
    }
}

#[async_trait::async_trait]
pub trait InteractionRecorder: Send + Sync {
    /// Appends one history row per record, saves accepted items that carry a
    /// save target, and nudges the session's item counter.
    ///
    /// Returns the number of records written.
    async fn record_batch(
        &self,
        user: &UserContext,
        batch: InteractionBatch,
    ) -> Result<usize, InteractionError>;
}
