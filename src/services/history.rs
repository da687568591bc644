use chrono::Utc;
use sea_orm::*;

use crate::models::enums::ContentType;
use crate::models::history;

/// Enregistre (ou rafraîchit) la consultation d'un contenu.
pub async fn record_view(
    db: &DatabaseConnection,
    user_id: i32,
    content_type: ContentType,
    content_id: i32,
) -> Result<(), DbErr> {
    let now = Utc::now().naive_utc();
    let existing = history::Entity::find()
        .filter(history::Column::UserId.eq(user_id))
        .filter(history::Column::ContentType.eq(content_type))
        .filter(history::Column::ContentId.eq(content_id))
        .one(db)
        .await?;

    match existing {
        Some(row) => {
            let mut active: history::ActiveModel = row.into();
            active.viewed_at = Set(now);
            active.update(db).await?;
        }
        None => {
            history::ActiveModel {
                user_id: Set(user_id),
                content_type: Set(content_type),
                content_id: Set(content_id),
                viewed_at: Set(now),
                ..Default::default()
            }
            .insert(db)
            .await?;
        }
    }
    Ok(())
}
