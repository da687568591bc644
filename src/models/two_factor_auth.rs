// ============================================================================
// MODÈLE : TWO FACTOR AUTH
// ============================================================================
//
// Description:
//   Code de connexion à 6 chiffres en attente de vérification.
//
// Colonnes:
//   - user_id (UNIQUE) : au plus un code actif par utilisateur
//   - code : 6 chiffres, zéros initiaux conservés
//   - expires_at : created_at + TWO_FACTOR_TTL_MINUTES
//
// Workflow:
//   1. POST /api/auth/login avec 2FA activée -> code émis (upsert) et envoyé
//   2. POST /api/auth/2fa/verify -> valide si now < expires_at
//   3. Ligne supprimée après une vérification réussie (usage unique)
//
// ============================================================================

use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "two_factor_auth")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub user_id: i32,

    #[serde(skip_serializing)]
    pub code: String,

    pub expires_at: DateTime,

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
