//! Wishlist collaborator used by swipe recording and the active items view.

use crate::db::{NewSavedItem, SavedItem, Wishlist};
use crate::domain::UserContext;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WishlistError {
    #[error("Wishlist {0} not found")]
    WishlistNotFound(i32),

    #[error("Saved item {0} not found")]
    ItemNotFound(i32),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sea_orm::DbErr> for WishlistError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for WishlistError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(err.to_string())
    }
}

#[async_trait::async_trait]
pub trait WishlistService: Send + Sync {
    async fn create_wishlist(
        &self,
        user: &UserContext,
        name: &str,
    ) -> Result<Wishlist, WishlistError>;

    /// Saves an item into one of the user's wishlists. Saving an item that is
    /// already present returns the existing row.
    async fn save_item(
        &self,
        user: &UserContext,
        item: NewSavedItem,
    ) -> Result<SavedItem, WishlistError>;

    /// Items whose availability still counts as active, in display order.
    async fn list_active_items(&self, user: &UserContext) -> Result<Vec<SavedItem>, WishlistError>;

    async fn remove_item(&self, user: &UserContext, item_id: i32) -> Result<(), WishlistError>;

    /// Moves an item to `wishlist_id` at `sort_index`. Both the item and the
    /// target wishlist must belong to the user.
    async fn move_item(
        &self,
        user: &UserContext,
        item_id: i32,
        wishlist_id: i32,
        sort_index: i32,
    ) -> Result<SavedItem, WishlistError>;
}
