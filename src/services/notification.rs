use chrono::Utc;
use sea_orm::*;

use crate::models::notifications;

/// Crée une notification. Accepte une transaction pour rester atomique avec l'action qui la déclenche.
pub async fn notify<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    title: &str,
    body: &str,
) -> Result<notifications::Model, DbErr> {
    notifications::ActiveModel {
        user_id: Set(user_id),
        title: Set(title.to_string()),
        body: Set(body.to_string()),
        read: Set(false),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(conn)
    .await
}
