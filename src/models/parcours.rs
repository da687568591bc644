use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

/// Parcours : suite ordonnée de formations.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "parcours")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub title: String,
    #[sea_orm(unique)]
    pub slug: String,
    pub description: String,
    pub image_url: Option<String>,
    pub author_id: i32,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::parcours_formations::Entity")]
    ParcoursFormations,
}

impl Related<super::parcours_formations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ParcoursFormations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
