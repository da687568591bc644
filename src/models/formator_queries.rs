// ============================================================================
// MODÈLE : FORMATOR QUERIES
// ============================================================================
//
// Description:
//   Demande d'un utilisateur pour devenir formateur.
//
// Workflow:
//   1. User envoie POST /api/formator-queries (status = PENDING)
//   2. Admin accepte ou refuse via PUT /api/formator-queries/{id}
//   3. Si acceptée : users.role = FORMATOR + notification
//
// Points d'attention:
//   - Une seule demande PENDING par utilisateur
//
// ============================================================================

use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

use super::enums::QueryStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "formator_queries")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    #[sea_orm(column_type = "Text")]
    pub motivation: String,
    pub status: QueryStatus,
    pub created_at: DateTime,
    pub decided_at: Option<DateTime>,
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
