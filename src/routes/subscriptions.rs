use actix_web::{delete, get, post, web, HttpResponse};
use sea_orm::{DatabaseConnection, EntityTrait};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::enums::{Role, SubscriptionPlan};
use crate::models::{subscriptions, users};
use crate::services::subscription;

#[derive(Deserialize)]
pub struct SubscribeRequest {
    pub plan: SubscriptionPlan,
}

#[derive(Serialize)]
pub struct SubscriptionState {
    pub role: Role,
    pub subscription: Option<subscriptions::Model>,
}

/// POST /api/subscriptions (connecté)
#[post("")]
pub async fn subscribe(
    auth_user: AuthUser,
    body: web::Json<SubscribeRequest>,
    db: web::Data<DatabaseConnection>,
) -> AppResult<HttpResponse> {
    let created = subscription::subscribe(db.get_ref(), auth_user.user_id, body.plan).await?;
    Ok(HttpResponse::Created().json(created))
}

/// GET /api/subscriptions/me - État à jour (expiration appliquée)
#[get("/me")]
pub async fn my_subscription(
    auth_user: AuthUser,
    db: web::Data<DatabaseConnection>,
) -> AppResult<HttpResponse> {
    let user = users::Entity::find_by_id(auth_user.user_id)
        .one(db.get_ref())
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

    let (user, subscription) = subscription::refresh(db.get_ref(), user).await?;
    Ok(HttpResponse::Ok().json(SubscriptionState { role: user.role, subscription }))
}

/// DELETE /api/subscriptions/me - Résiliation en fin de période
#[delete("/me")]
pub async fn cancel_subscription(
    auth_user: AuthUser,
    db: web::Data<DatabaseConnection>,
) -> AppResult<HttpResponse> {
    let canceled = subscription::cancel(db.get_ref(), auth_user.user_id).await?;
    Ok(HttpResponse::Ok().json(canceled))
}

pub fn subscriptions_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/subscriptions")
            .service(subscribe)
            .service(my_subscription)
            .service(cancel_subscription)
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use actix_web::{test, App};
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[actix_web::test]
    async fn test_subscription_requires_login() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(db))
                .app_data(web::Data::new(test_config()))
                .configure(subscriptions_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/subscriptions")
            .set_json(serde_json::json!({"plan": "MONTHLY"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 401);
    }
}
