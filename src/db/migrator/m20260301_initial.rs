use crate::entities::prelude::*;
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Schema;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        let schema = Schema::new(backend);

        manager
            .create_table(
                schema
                    .create_table_from_entity(SearchCache)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(SearchSessions)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(Wishlists)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(SavedItems)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(SwipeHistory)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // Lookup-or-create relies on this constraint instead of an in-process lock.
        manager
            .create_index(
                Index::create()
                    .name("idx_search_sessions_user_fingerprint")
                    .table(Sessions::Table)
                    .col(Sessions::UserId)
                    .col(Sessions::Fingerprint)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_search_sessions_last_activity")
                    .table(Sessions::Table)
                    .col(Sessions::LastActivityAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_search_cache_expires_at")
                    .table(Cache::Table)
                    .col(Cache::ExpiresAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_wishlists_user")
                    .table(WishlistTable::Table)
                    .col(WishlistTable::UserId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_saved_items_wishlist_item")
                    .table(Items::Table)
                    .col(Items::WishlistId)
                    .col(Items::UpstreamItemId)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_saved_items_status_updated")
                    .table(Items::Table)
                    .col(Items::AvailabilityStatus)
                    .col(Items::UpdatedAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_swipe_history_user")
                    .table(History::Table)
                    .col(History::UserId)
                    .col(History::CreatedAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(History::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Items::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(WishlistTable::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(Sessions::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Cache::Table).if_exists().to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Cache {
    #[sea_orm(iden = "search_cache")]
    Table,
    ExpiresAt,
}

#[derive(DeriveIden)]
enum Sessions {
    #[sea_orm(iden = "search_sessions")]
    Table,
    UserId,
    Fingerprint,
    LastActivityAt,
}

#[derive(DeriveIden)]
enum WishlistTable {
    #[sea_orm(iden = "wishlists")]
    Table,
    UserId,
}

#[derive(DeriveIden)]
enum Items {
    #[sea_orm(iden = "saved_items")]
    Table,
    WishlistId,
    UpstreamItemId,
    AvailabilityStatus,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum History {
    #[sea_orm(iden = "swipe_history")]
    Table,
    UserId,
    CreatedAt,
}
