use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

use super::enums::{Role, TwoFactorChannel};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub email: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Format: pbkdf2:sha256:iterations$salt$hash
    pub role: Role,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub two_factor_enabled: bool,
    pub two_factor_channel: TwoFactorChannel,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::articles::Entity")]
    Articles,

    #[sea_orm(has_many = "super::videos::Entity")]
    Videos,

    #[sea_orm(has_many = "super::formations::Entity")]
    Formations,

    #[sea_orm(has_many = "super::notifications::Entity")]
    Notifications,
}

impl Related<super::articles::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Articles.def()
    }
}

impl Related<super::videos::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Videos.def()
    }
}

impl Related<super::formations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Formations.def()
    }
}

impl Related<super::notifications::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Notifications.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
