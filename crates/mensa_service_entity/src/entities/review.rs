use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Dish rating submitted by a user, joined against dish and canteen for
/// display. Timestamps are stored as RFC 3339 strings.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "reviews")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub author: String,
    pub mensa_id: i32,
    pub dish_id: i32,
    pub stars: i32,
    pub comment: Option<String>,
    pub timestamp: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::dish::Entity",
        from = "Column::DishId",
        to = "super::dish::Column::Id"
    )]
    Dish,
    #[sea_orm(
        belongs_to = "super::mensa::Entity",
        from = "Column::MensaId",
        to = "super::mensa::Column::Id"
    )]
    Mensa,
}

impl Related<super::dish::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Dish.def()
    }
}

impl Related<super::mensa::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Mensa.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
