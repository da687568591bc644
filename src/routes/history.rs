use actix_web::{delete, get, web, HttpResponse};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};

use crate::error::AppResult;
use crate::middleware::AuthUser;
use crate::models::history::{Entity as History, Column as HistoryColumn};

/// GET /api/history - Contenus consultés, plus récents d'abord
#[get("")]
pub async fn list_history(
    auth_user: AuthUser,
    db: web::Data<DatabaseConnection>,
) -> AppResult<HttpResponse> {
    let entries = History::find()
        .filter(HistoryColumn::UserId.eq(auth_user.user_id))
        .order_by_desc(HistoryColumn::ViewedAt)
        .all(db.get_ref())
        .await?;
    Ok(HttpResponse::Ok().json(entries))
}

/// DELETE /api/history - Vide l'historique
#[delete("")]
pub async fn clear_history(
    auth_user: AuthUser,
    db: web::Data<DatabaseConnection>,
) -> AppResult<HttpResponse> {
    History::delete_many()
        .filter(HistoryColumn::UserId.eq(auth_user.user_id))
        .exec(db.get_ref())
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

pub fn history_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/history")
            .service(list_history)
            .service(clear_history)
    );
}
