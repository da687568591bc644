use chrono::Utc;
use sea_orm::*;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::enums::ContentType;
use crate::models::purchases;
use crate::services::access::has_purchased;
use crate::services::content::find_content;
use crate::services::notification::notify;

/// Enregistre l'achat d'un contenu premium au prix courant.
/// Le paiement lui-même est délégué au prestataire externe, hors de ce service.
pub async fn purchase(
    db: &DatabaseConnection,
    user_id: i32,
    content_type: ContentType,
    content_id: i32,
) -> AppResult<purchases::Model> {
    let txn = db.begin().await?;

    // 1. Le contenu existe et est payant
    let content = find_content(&txn, content_type, content_id)
        .await?
        .ok_or_else(|| AppError::not_found("Content"))?;

    if !content.is_premium {
        return Err(AppError::BadRequest("Content is free".into()));
    }

    // 2. Pas de double achat
    if has_purchased(&txn, user_id, content_type, content_id).await? {
        return Err(AppError::Conflict("Content already purchased".into()));
    }

    // 3. Achat + notification dans la même transaction
    let purchase = purchases::ActiveModel {
        user_id: Set(user_id),
        content_type: Set(content_type),
        content_id: Set(content_id),
        amount: Set(content.price),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    notify(
        &txn,
        user_id,
        "Achat confirmé",
        &format!("Vous avez maintenant accès à « {} ».", content.title),
    )
    .await?;

    txn.commit().await?;
    info!(user_id, ?content_type, content_id, amount = %purchase.amount, "content purchased");
    Ok(purchase)
}
