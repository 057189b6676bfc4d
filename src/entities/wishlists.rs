use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "wishlists")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: String,
    pub name: String,
    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::saved_items::Entity")]
    SavedItems,
}

impl Related<super::saved_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SavedItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
