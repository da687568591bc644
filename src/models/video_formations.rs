use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

// Table de liaison ordonnée vidéo <-> formation.
// position commence à 0 et reste contiguë après chaque remplacement de liste.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "video_formations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub formation_id: i32,
    pub video_id: i32,
    pub position: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::formations::Entity",
        from = "Column::FormationId",
        to = "super::formations::Column::Id"
    )]
    Formation,

    #[sea_orm(
        belongs_to = "super::videos::Entity",
        from = "Column::VideoId",
        to = "super::videos::Column::Id"
    )]
    Video,
}

impl Related<super::formations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Formation.def()
    }
}

impl Related<super::videos::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Video.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
