// ============================================================================
// MODÈLE : PURCHASES
// ============================================================================
//
// Description:
//   Achat unitaire d'un contenu premium. Le contenu est polymorphe :
//   (content_type, content_id) désigne un article, une vidéo ou une formation.
//
// Points d'attention:
//   - amount = prix du contenu au moment de l'achat
//   - un seul achat par (user_id, content_type, content_id)
//
// ============================================================================

use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

use super::enums::ContentType;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "purchases")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub content_type: ContentType,
    pub content_id: i32,
    pub amount: Decimal,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    User,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
