use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "search_sessions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: String,
    pub fingerprint: String,
    pub query: String,
    /// Normalized filter snapshot as JSON.
    #[sea_orm(column_type = "Text")]
    pub filters_json: String,
    pub current_offset: i64,
    pub items_seen: i64,
    pub last_activity_at: String,
    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
