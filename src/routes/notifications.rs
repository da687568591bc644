use actix_web::{get, put, web, HttpResponse};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    sea_query::Expr,
};
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::notifications::{self, Entity as Notifications, Column as NotificationColumn};

/// GET /api/notifications - Notifications de l'utilisateur, plus récentes d'abord
#[get("")]
pub async fn list_notifications(
    auth_user: AuthUser,
    db: web::Data<DatabaseConnection>,
) -> AppResult<HttpResponse> {
    let all = Notifications::find()
        .filter(NotificationColumn::UserId.eq(auth_user.user_id))
        .order_by_desc(NotificationColumn::CreatedAt)
        .all(db.get_ref())
        .await?;
    Ok(HttpResponse::Ok().json(all))
}

// déclaré avant /{id}/read
/// PUT /api/notifications/read-all
#[put("/read-all")]
pub async fn mark_all_read(
    auth_user: AuthUser,
    db: web::Data<DatabaseConnection>,
) -> AppResult<HttpResponse> {
    let result = Notifications::update_many()
        .col_expr(NotificationColumn::Read, Expr::value(true))
        .filter(NotificationColumn::UserId.eq(auth_user.user_id))
        .filter(NotificationColumn::Read.eq(false))
        .exec(db.get_ref())
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "updated": result.rows_affected })))
}

/// PUT /api/notifications/{id}/read
#[put("/{id}/read")]
pub async fn mark_read(
    auth_user: AuthUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> AppResult<HttpResponse> {
    // Une notification d'un autre utilisateur est traitée comme inexistante
    let notification = Notifications::find_by_id(path.into_inner())
        .filter(NotificationColumn::UserId.eq(auth_user.user_id))
        .one(db.get_ref())
        .await?
        .ok_or_else(|| AppError::not_found("Notification"))?;

    let mut active: notifications::ActiveModel = notification.into();
    active.read = Set(true);
    let updated = active.update(db.get_ref()).await?;
    Ok(HttpResponse::Ok().json(updated))
}

pub fn notifications_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/notifications")
            .service(list_notifications)
            .service(mark_all_read)
            .service(mark_read)
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::models::enums::Role;
    use crate::utils::jwt;
    use actix_web::{http::header::AUTHORIZATION, test, App};
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[actix_web::test]
    async fn test_foreign_notification_is_404() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<notifications::Model>::new()])
            .into_connection();
        let config = test_config();
        let token = jwt::generate_token(&config.jwt_secret, 1, 3, "lea@knowledger.fr", Role::User).unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(db))
                .app_data(web::Data::new(config))
                .configure(notifications_routes),
        )
        .await;

        let req = test::TestRequest::put()
            .uri("/notifications/41/read")
            .insert_header((AUTHORIZATION, format!("Bearer {}", token)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 404);
    }
}
