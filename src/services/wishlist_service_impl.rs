use crate::db::{MoveOutcome, NewSavedItem, SavedItem, Store, Wishlist};
use crate::domain::UserContext;
use crate::services::wishlist_service::{WishlistError, WishlistService};
use tracing::info;

pub struct SeaOrmWishlistService {
    store: Store,
}

impl SeaOrmWishlistService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    async fn owned_wishlist(
        &self,
        user: &UserContext,
        wishlist_id: i32,
    ) -> Result<Wishlist, WishlistError> {
        match self.store.catalog_repo().get_wishlist(wishlist_id).await? {
            Some(w) if w.user_id == user.user_id.as_str() => Ok(w),
            _ => Err(WishlistError::WishlistNotFound(wishlist_id)),
        }
    }

    async fn owned_item(&self, user: &UserContext, item_id: i32) -> Result<SavedItem, WishlistError> {
        let item = self
            .store
            .catalog_repo()
            .get_item(item_id)
            .await?
            .ok_or(WishlistError::ItemNotFound(item_id))?;

        self.owned_wishlist(user, item.wishlist_id)
            .await
            .map_err(|_| WishlistError::ItemNotFound(item_id))?;

        Ok(item)
    }
}

#[async_trait::async_trait]
impl WishlistService for SeaOrmWishlistService {
    async fn create_wishlist(
        &self,
        user: &UserContext,
        name: &str,
    ) -> Result<Wishlist, WishlistError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(WishlistError::Validation(
                "Wishlist name cannot be empty".to_string(),
            ));
        }

        let wishlist = self
            .store
            .catalog_repo()
            .create_wishlist(user.user_id.as_str(), name)
            .await?;

        info!(user_id = %user.user_id, wishlist_id = wishlist.id, "Created wishlist");
        Ok(wishlist)
    }

    async fn save_item(
        &self,
        user: &UserContext,
        item: NewSavedItem,
    ) -> Result<SavedItem, WishlistError> {
        if item.upstream_item_id.trim().is_empty() {
            return Err(WishlistError::Validation(
                "Upstream item id cannot be empty".to_string(),
            ));
        }

        self.owned_wishlist(user, item.wishlist_id).await?;

        Ok(self.store.catalog_repo().save_item(&item).await?)
    }

    async fn list_active_items(&self, user: &UserContext) -> Result<Vec<SavedItem>, WishlistError> {
        Ok(self
            .store
            .catalog_repo()
            .list_active_for_user(user.user_id.as_str())
            .await?)
    }

    async fn remove_item(&self, user: &UserContext, item_id: i32) -> Result<(), WishlistError> {
        self.owned_item(user, item_id).await?;

        if !self.store.catalog_repo().remove_item(item_id).await? {
            return Err(WishlistError::ItemNotFound(item_id));
        }

        info!(user_id = %user.user_id, item_id, "Removed saved item");
        Ok(())
    }

    async fn move_item(
        &self,
        user: &UserContext,
        item_id: i32,
        wishlist_id: i32,
        sort_index: i32,
    ) -> Result<SavedItem, WishlistError> {
        if sort_index < 0 {
            return Err(WishlistError::Validation(
                "Sort index cannot be negative".to_string(),
            ));
        }

        self.owned_item(user, item_id).await?;
        self.owned_wishlist(user, wishlist_id).await?;

        let repo = self.store.catalog_repo();
        match repo.move_item(item_id, wishlist_id, sort_index).await? {
            MoveOutcome::Moved => {}
            MoveOutcome::Missing => return Err(WishlistError::ItemNotFound(item_id)),
            MoveOutcome::AlreadyInTarget => {
                return Err(WishlistError::Validation(format!(
                    "Wishlist {wishlist_id} already holds this item"
                )));
            }
        }

        repo.get_item(item_id)
            .await?
            .ok_or(WishlistError::ItemNotFound(item_id))
    }
}
