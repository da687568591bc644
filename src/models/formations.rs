use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

/// Une formation = une liste ordonnée de vidéos (voir `video_formations`).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "formations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub title: String,
    #[sea_orm(unique)]
    pub slug: String,
    pub description: String,
    pub image_url: Option<String>,
    pub is_premium: bool,
    pub price: Decimal,
    pub author_id: i32,
    pub category_id: Option<i32>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::AuthorId",
        to = "super::users::Column::Id"
    )]
    Author,

    #[sea_orm(
        belongs_to = "super::categories::Entity",
        from = "Column::CategoryId",
        to = "super::categories::Column::Id"
    )]
    Category,

    #[sea_orm(has_many = "super::video_formations::Entity")]
    VideoFormations,

    #[sea_orm(has_many = "super::parcours_formations::Entity")]
    ParcoursFormations,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Author.def()
    }
}

impl Related<super::categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::video_formations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::VideoFormations.def()
    }
}

impl Related<super::parcours_formations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ParcoursFormations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
