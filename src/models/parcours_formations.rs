use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "parcours_formations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub parcours_id: i32,
    pub formation_id: i32,
    pub position: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::parcours::Entity",
        from = "Column::ParcoursId",
        to = "super::parcours::Column::Id"
    )]
    Parcours,

    #[sea_orm(
        belongs_to = "super::formations::Entity",
        from = "Column::FormationId",
        to = "super::formations::Column::Id"
    )]
    Formation,
}

impl Related<super::parcours::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Parcours.def()
    }
}

impl Related<super::formations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Formation.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
