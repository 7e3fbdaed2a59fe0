use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Dish as first observed on a daily menu. The id comes from the upstream
/// meal record; the canteen of origin is kept alongside it.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "dishes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,
    pub mensa_id: i32,
    pub name: String,
    pub category: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::mensa::Entity",
        from = "Column::MensaId",
        to = "super::mensa::Column::Id"
    )]
    Mensa,
    #[sea_orm(has_many = "super::review::Entity")]
    Review,
}

impl Related<super::mensa::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Mensa.def()
    }
}

impl Related<super::review::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Review.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
