use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "swipe_history")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: String,
    pub upstream_item_id: String,
    pub outcome: String,
    pub query: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub filters_json: Option<String>,
    pub price: Option<f64>,
    pub session_id: Option<i32>,
    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
