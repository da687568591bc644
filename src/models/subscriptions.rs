// ============================================================================
// MODÈLE : SUBSCRIPTIONS
// ============================================================================
//
// Description:
//   Abonnement premium d'un utilisateur (une ligne par utilisateur).
//
// Cycle de vie:
//   ACTIVE --(annulation)--> CANCELED --(fin de période)--> EXPIRED
//   ACTIVE --(fin de période)--> EXPIRED
//
// Points d'attention:
//   - CANCELED garde l'accès premium jusqu'à current_period_end
//   - L'expiration est constatée à la lecture (GET /api/subscriptions/me)
//
// ============================================================================

use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

use super::enums::{SubscriptionPlan, SubscriptionStatus};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "subscriptions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub user_id: i32,
    pub plan: SubscriptionPlan,
    pub status: SubscriptionStatus,
    pub amount: Decimal,
    pub current_period_end: DateTime,
    pub created_at: DateTime,
    pub updated_at: DateTime,
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
