use actix_web::{delete, get, post, web, HttpResponse};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set};
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::RequireAdmin;
use crate::models::messages::{self, Entity as Messages, Column as MessageColumn};

#[derive(Deserialize, Validate)]
pub struct ContactRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 200))]
    pub subject: String,
    #[validate(length(min = 1, max = 5000))]
    pub body: String,
}

/// POST /api/messages - Formulaire de contact (PUBLIC)
#[post("")]
pub async fn send_message(
    body: web::Json<ContactRequest>,
    db: web::Data<DatabaseConnection>,
) -> AppResult<HttpResponse> {
    body.validate()?;
    let body = body.into_inner();

    let message = messages::ActiveModel {
        name: Set(body.name),
        email: Set(body.email.to_lowercase()),
        subject: Set(body.subject),
        body: Set(body.body),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db.get_ref())
    .await?;

    info!(message_id = message.id, "contact message received");
    Ok(HttpResponse::Created().json(message))
}

/// GET /api/messages (ADMIN)
#[get("")]
pub async fn list_messages(
    _admin: RequireAdmin,
    db: web::Data<DatabaseConnection>,
) -> AppResult<HttpResponse> {
    let all = Messages::find()
        .order_by_desc(MessageColumn::CreatedAt)
        .all(db.get_ref())
        .await?;
    Ok(HttpResponse::Ok().json(all))
}

/// DELETE /api/messages/{id} (ADMIN)
#[delete("/{id}")]
pub async fn delete_message(
    _admin: RequireAdmin,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> AppResult<HttpResponse> {
    let result = Messages::delete_by_id(path.into_inner()).exec(db.get_ref()).await?;
    if result.rows_affected == 0 {
        return Err(AppError::not_found("Message"));
    }
    Ok(HttpResponse::NoContent().finish())
}

pub fn messages_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/messages")
            .service(send_message)
            .service(list_messages)
            .service(delete_message)
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
    async fn test_only_admin_reads_messages() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let config = test_config();
        let token = jwt::generate_token(&config.jwt_secret, 1, 4, "form@knowledger.fr", Role::Formator).unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(db))
                .app_data(web::Data::new(config))
                .configure(messages_routes),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/messages")
            .insert_header((AUTHORIZATION, format!("Bearer {}", token)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 403);
    }

    #[actix_web::test]
    async fn test_invalid_contact_email_is_rejected() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(db))
                .app_data(web::Data::new(test_config()))
                .configure(messages_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/messages")
            .set_json(serde_json::json!({
                "name": "Léa", "email": "pas-un-email", "subject": "Question", "body": "Bonjour"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
    }
}
