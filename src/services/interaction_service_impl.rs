use crate::db::{NewSavedItem, NewSwipeRecord, Store};
use crate::domain::{SwipeOutcome, UserContext};
use crate::services::interaction_service::{
    InteractionBatch, InteractionError, InteractionRecorder,
};
use crate::services::session_service::SessionTracker;
use crate::services::wishlist_service::WishlistService;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct SeaOrmInteractionRecorder {
    store: Store,
    wishlists: Arc<dyn WishlistService>,
    sessions: Arc<dyn SessionTracker>,
}

impl SeaOrmInteractionRecorder {
    #[must_use]
    pub fn new(
        store: Store,
        wishlists: Arc<dyn WishlistService>,
        sessions: Arc<dyn SessionTracker>,
    ) -> Self {
        Self {
            store,
            wishlists,
            sessions,
        }
    }

    /// Appends history and saves accepts, one record at a time. On failure
    /// the error carries how many records made it.
    async fn record_each(
        &self,
        user: &UserContext,
        batch: &InteractionBatch,
    ) -> Result<usize, InteractionError> {
        let history = self.store.history_repo();
        let mut recorded = 0;

        for record in &batch.records {
            let filters_json = record
                .filters
                .as_ref()
                .and_then(|f| serde_json::to_string(f).ok());

            history
                .append(&NewSwipeRecord {
                    user_id: user.user_id.as_str().to_string(),
                    upstream_item_id: record.item_id.clone(),
                    outcome: record.outcome,
                    query: record.query.clone(),
                    filters_json,
                    price: record.price,
                    session_id: batch.session_id,
                })
                .await
                .map_err(|e| InteractionError::Interrupted {
                    recorded,
                    message: e.to_string(),
                })?;

            if record.outcome == SwipeOutcome::Accept
                && let Some(target) = &record.save_to
            {
                self.wishlists
                    .save_item(
                        user,
                        NewSavedItem {
                            wishlist_id: target.wishlist_id,
                            upstream_item_id: record.item_id.clone(),
                            title: target.title.clone(),
                            image_url: target.image_url.clone(),
                            price: record.price,
                            currency: target.currency.clone(),
                            seller_score: target.seller_score,
                        },
                    )
                    .await
                    .map_err(|source| InteractionError::Save {
                        recorded: recorded + 1,
                        source,
                    })?;
            }

            recorded += 1;
        }

        Ok(recorded)
    }
}

#[async_trait::async_trait]
impl InteractionRecorder for SeaOrmInteractionRecorder {
    async fn record_batch(
        &self,
        user: &UserContext,
        batch: InteractionBatch,
    ) -> Result<usize, InteractionError> {
        batch.validate()?;

        let outcome = self.record_each(user, &batch).await;

        // History already written counts as seen even when the batch stopped early.
        let recorded = match &outcome {
            Ok(n)
            | Err(
                InteractionError::Interrupted { recorded: n, .. }
                | InteractionError::Save { recorded: n, .. },
            ) => *n,
            Err(_) => 0,
        };

        if let Some(session_id) = batch.session_id
            && recorded > 0
        {
            let consumed = u64::try_from(recorded).unwrap_or(u64::MAX);
            if let Err(e) = self
                .sessions
                .record_progress(user, session_id, consumed, false)
                .await
            {
                warn!(
                    user_id = %user.user_id,
                    session_id,
                    error = %e,
                    "Failed to update session progress after recording swipes"
                );
            }
        }

        debug!(
            user_id = %user.user_id,
            recorded,
            complete = outcome.is_ok(),
            "Recorded swipe batch"
        );
        outcome
    }
}
