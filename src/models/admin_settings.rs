use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

/// Réglages globaux du site. Ligne unique (id = 1).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "admin_settings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,
    pub site_name: String,
    pub monthly_price: Decimal,
    pub yearly_price: Decimal,
    pub maintenance_mode: bool,
    pub updated_at: DateTime,
}

pub const SETTINGS_ID: i32 = 1;

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
