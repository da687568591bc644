use actix_web::{get, post, web, HttpResponse};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};

use crate::error::AppResult;
use crate::middleware::AuthUser;
use crate::models::dto::ContentKey;
use crate::models::purchases::{Entity as Purchases, Column as PurchaseColumn};
use crate::services::purchase;

/// POST /api/purchases - Achat d'un contenu premium (connecté)
#[post("")]
pub async fn create_purchase(
    auth_user: AuthUser,
    body: web::Json<ContentKey>,
    db: web::Data<DatabaseConnection>,
) -> AppResult<HttpResponse> {
    let created = purchase::purchase(db.get_ref(), auth_user.user_id, body.content_type, body.content_id).await?;
    Ok(HttpResponse::Created().json(created))
}

/// GET /api/purchases/me
#[get("/me")]
pub async fn my_purchases(
    auth_user: AuthUser,
    db: web::Data<DatabaseConnection>,
) -> AppResult<HttpResponse> {
    let purchases = Purchases::find()
        .filter(PurchaseColumn::UserId.eq(auth_user.user_id))
        .order_by_desc(PurchaseColumn::CreatedAt)
        .all(db.get_ref())
        .await?;
    Ok(HttpResponse::Ok().json(purchases))
}

pub fn purchases_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/purchases")
            .service(create_purchase)
            .service(my_purchases)
    );
}
