use actix_web::{delete, get, post, web, HttpResponse};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::Deserialize;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::comments::{self, Entity as Comments, Column as CommentColumn};
use crate::models::dto::ContentKey;
use crate::models::enums::ContentType;
use crate::services::content::find_content;

#[derive(Deserialize, Validate)]
pub struct CommentRequest {
    pub content_type: ContentType,
    pub content_id: i32,
    #[validate(length(min = 1, max = 2000))]
    pub body: String,
}

/// GET /api/comments?content_type=ARTICLE&content_id=4 (PUBLIC)
#[get("")]
pub async fn list_comments(
    query: web::Query<ContentKey>,
    db: web::Data<DatabaseConnection>,
) -> AppResult<HttpResponse> {
    let comments = Comments::find()
        .filter(CommentColumn::ContentType.eq(query.content_type))
        .filter(CommentColumn::ContentId.eq(query.content_id))
        .order_by_asc(CommentColumn::CreatedAt)
        .all(db.get_ref())
        .await?;
    Ok(HttpResponse::Ok().json(comments))
}

/// POST /api/comments (connecté)
#[post("")]
pub async fn create_comment(
    auth_user: AuthUser,
    body: web::Json<CommentRequest>,
    db: web::Data<DatabaseConnection>,
) -> AppResult<HttpResponse> {
    let mut body = body.into_inner();
    body.body = body.body.trim().to_string();
    body.validate()?;

    if find_content(db.get_ref(), body.content_type, body.content_id).await?.is_none() {
        return Err(AppError::not_found("Content"));
    }

    let comment = comments::ActiveModel {
        user_id: Set(auth_user.user_id),
        content_type: Set(body.content_type),
        content_id: Set(body.content_id),
        body: Set(body.body),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db.get_ref())
    .await?;

    Ok(HttpResponse::Created().json(comment))
}

/// DELETE /api/comments/{id} (auteur ou ADMIN)
#[delete("/{id}")]
pub async fn delete_comment(
    auth_user: AuthUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> AppResult<HttpResponse> {
    let comment = Comments::find_by_id(path.into_inner())
        .one(db.get_ref())
        .await?
        .ok_or_else(|| AppError::not_found("Comment"))?;

    if !auth_user.can_manage(comment.user_id) {
        return Err(AppError::Forbidden("Only the author or an admin can delete this comment".into()));
    }

    Comments::delete_by_id(comment.id).exec(db.get_ref()).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub fn comments_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/comments")
            .service(list_comments)
            .service(create_comment)
            .service(delete_comment)
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
    async fn test_cannot_delete_someone_elses_comment() {
        let comment = comments::Model {
            id: 9,
            user_id: 2,
            content_type: ContentType::Video,
            content_id: 4,
            body: "Très clair, merci".into(),
            created_at: Utc::now().naive_utc(),
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![comment]])
            .into_connection();
        let config = test_config();
        let token = jwt::generate_token(&config.jwt_secret, 1, 3, "lea@knowledger.fr", Role::User).unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(db))
                .app_data(web::Data::new(config))
                .configure(comments_routes),
        )
        .await;

        let req = test::TestRequest::delete()
            .uri("/comments/9")
            .insert_header((AUTHORIZATION, format!("Bearer {}", token)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 403);
    }

    #[actix_web::test]
    async fn test_comment_requires_login() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(db))
                .app_data(web::Data::new(test_config()))
                .configure(comments_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/comments")
            .set_json(serde_json::json!({"content_type": "ARTICLE", "content_id": 1, "body": "Bonjour"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 401);
    }

    #[actix_web::test]
    async fn test_blank_comment_is_rejected() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let config = test_config();
        let token = jwt::generate_token(&config.jwt_secret, 1, 3, "lea@knowledger.fr", Role::User).unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(db))
                .app_data(web::Data::new(config))
                .configure(comments_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/comments")
            .insert_header((AUTHORIZATION, format!("Bearer {}", token)))
            .set_json(serde_json::json!({"content_type": "ARTICLE", "content_id": 1, "body": "   \n  "}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
    }
}
