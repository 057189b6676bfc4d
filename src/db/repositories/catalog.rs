use crate::domain::AvailabilityStatus;
use crate::entities::{prelude::*, saved_items, wishlists};
use anyhow::Result;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    SqlErr,
};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Wishlist {
    pub id: i32,
    pub user_id: String,
    pub name: String,
    pub created_at: String,
}

impl From<wishlists::Model> for Wishlist {
    fn from(model: wishlists::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            name: model.name,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved,
    Missing,
    /// The target wishlist already holds the same upstream item.
    AlreadyInTarget,
}

/// A user's saved reference to an upstream listing.
#[derive(Debug, Clone, Serialize)]
pub struct SavedItem {
    pub id: i32,
    pub wishlist_id: i32,
    pub upstream_item_id: String,
    pub title: String,
    pub image_url: Option<String>,
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub seller_score: Option<f64>,
    pub sort_index: i32,
    pub availability_status: AvailabilityStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl From<saved_items::Model> for SavedItem {
    fn from(model: saved_items::Model) -> Self {
        Self {
            id: model.id,
            wishlist_id: model.wishlist_id,
            upstream_item_id: model.upstream_item_id,
            title: model.title,
            image_url: model.image_url,
            price: model.price,
            currency: model.currency,
            seller_score: model.seller_score,
            sort_index: model.sort_index,
            availability_status: model
                .availability_status
                .parse()
                .unwrap_or(AvailabilityStatus::UnknownAvailability),
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Display fields captured when an item is saved.
#[derive(Debug, Clone)]
pub struct NewSavedItem {
    pub wishlist_id: i32,
    pub upstream_item_id: String,
    pub title: String,
    pub image_url: Option<String>,
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub seller_score: Option<f64>,
}

pub struct CatalogRepository {
    conn: DatabaseConnection,
}

impl CatalogRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create_wishlist(&self, user_id: &str, name: &str) -> Result<Wishlist> {
        let active_model = wishlists::ActiveModel {
            user_id: Set(user_id.to_string()),
            name: Set(name.to_string()),
            created_at: Set(crate::db::now_timestamp()),
            ..Default::default()
        };

        let result = Wishlists::insert(active_model).exec(&self.conn).await?;

        let row = Wishlists::find_by_id(result.last_insert_id)
            .one(&self.conn)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Wishlist vanished after insert"))?;

        Ok(row.into())
    }

    pub async fn get_wishlist(&self, id: i32) -> Result<Option<Wishlist>> {
        let row = Wishlists::find_by_id(id).one(&self.conn).await?;
        Ok(row.map(Wishlist::from))
    }

    pub async fn wishlist_ids_for_user(&self, user_id: &str) -> Result<Vec<i32>> {
        let ids: Vec<i32> = Wishlists::find()
            .select_only()
            .column(wishlists::Column::Id)
            .filter(wishlists::Column::UserId.eq(user_id))
            .into_tuple()
            .all(&self.conn)
            .await?;

        Ok(ids)
    }

    /// Saves an item at the end of the wishlist. Saving the same upstream
    /// item twice returns the existing row unchanged.
    pub async fn save_item(&self, item: &NewSavedItem) -> Result<SavedItem> {
        let max_index: Option<i32> = SavedItems::find()
            .select_only()
            .column_as(saved_items::Column::SortIndex.max(), "max_index")
            .filter(saved_items::Column::WishlistId.eq(item.wishlist_id))
            .into_tuple::<Option<i32>>()
            .one(&self.conn)
            .await?
            .flatten();

        let now = crate::db::now_timestamp();
        let active_model = saved_items::ActiveModel {
            wishlist_id: Set(item.wishlist_id),
            upstream_item_id: Set(item.upstream_item_id.clone()),
            title: Set(item.title.clone()),
            image_url: Set(item.image_url.clone()),
            price: Set(item.price),
            currency: Set(item.currency.clone()),
            seller_score: Set(item.seller_score),
            sort_index: Set(max_index.map_or(0, |i| i + 1)),
            availability_status: Set(AvailabilityStatus::InStock.as_str().to_string()),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        SavedItems::insert(active_model)
            .on_conflict(
                OnConflict::columns([
                    saved_items::Column::WishlistId,
                    saved_items::Column::UpstreamItemId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(&self.conn)
            .await?;

        let row = SavedItems::find()
            .filter(saved_items::Column::WishlistId.eq(item.wishlist_id))
            .filter(saved_items::Column::UpstreamItemId.eq(item.upstream_item_id.as_str()))
            .one(&self.conn)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Saved item vanished after insert"))?;

        Ok(row.into())
    }

    pub async fn get_item(&self, id: i32) -> Result<Option<SavedItem>> {
        let row = SavedItems::find_by_id(id).one(&self.conn).await?;
        Ok(row.map(SavedItem::from))
    }

    /// Items the user sees: anything whose status still counts as available.
    pub async fn list_active_for_user(&self, user_id: &str) -> Result<Vec<SavedItem>> {
        let wishlist_ids = self.wishlist_ids_for_user(user_id).await?;
        if wishlist_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = SavedItems::find()
            .filter(saved_items::Column::WishlistId.is_in(wishlist_ids))
            .filter(
                saved_items::Column::AvailabilityStatus
                    .is_in(AvailabilityStatus::active_statuses()),
            )
            .order_by_asc(saved_items::Column::WishlistId)
            .order_by_asc(saved_items::Column::SortIndex)
            .all(&self.conn)
            .await?;

        Ok(rows.into_iter().map(SavedItem::from).collect())
    }

    /// Available items last updated before `cutoff`, oldest first.
    ///
    /// `wishlist_ids = None` scans the whole catalog.
    pub async fn find_stale(
        &self,
        wishlist_ids: Option<&[i32]>,
        cutoff: &str,
        limit: u64,
    ) -> Result<Vec<SavedItem>> {
        let mut query = SavedItems::find()
            .filter(
                saved_items::Column::AvailabilityStatus
                    .is_in(AvailabilityStatus::active_statuses()),
            )
            .filter(saved_items::Column::UpdatedAt.lt(cutoff));

        if let Some(ids) = wishlist_ids {
            if ids.is_empty() {
                return Ok(Vec::new());
            }
            query = query.filter(saved_items::Column::WishlistId.is_in(ids.to_vec()));
        }

        let rows = query
            .order_by_asc(saved_items::Column::UpdatedAt)
            .order_by_asc(saved_items::Column::Id)
            .limit(limit)
            .all(&self.conn)
            .await?;

        Ok(rows.into_iter().map(SavedItem::from).collect())
    }

    /// Writes a freshness result. Only the status and timestamp change.
    pub async fn update_status(&self, id: i32, status: AvailabilityStatus) -> Result<bool> {
        let result = SavedItems::update_many()
            .col_expr(
                saved_items::Column::AvailabilityStatus,
                Expr::value(status.as_str()),
            )
            .col_expr(
                saved_items::Column::UpdatedAt,
                Expr::value(crate::db::now_timestamp()),
            )
            .filter(saved_items::Column::Id.eq(id))
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected > 0)
    }

    pub async fn move_item(&self, id: i32, wishlist_id: i32, sort_index: i32) -> Result<MoveOutcome> {
        let result = SavedItems::update_many()
            .col_expr(saved_items::Column::WishlistId, Expr::value(wishlist_id))
            .col_expr(saved_items::Column::SortIndex, Expr::value(sort_index))
            .filter(saved_items::Column::Id.eq(id))
            .exec(&self.conn)
            .await;

        match result {
            Ok(r) if r.rows_affected > 0 => Ok(MoveOutcome::Moved),
            Ok(_) => Ok(MoveOutcome::Missing),
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Ok(MoveOutcome::AlreadyInTarget)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Explicit user removal.
    pub async fn remove_item(&self, id: i32) -> Result<bool> {
        let result = SavedItems::delete_by_id(id).exec(&self.conn).await?;
        Ok(result.rows_affected > 0)
    }
}
