use actix_web::{get, put, web, HttpResponse};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde::Deserialize;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::dto::{ContentKey, RatingSummary};
use crate::models::enums::ContentType;
use crate::models::ratings::{self, Entity as Ratings, Column as RatingColumn};
use crate::services::content::find_content;

#[derive(Deserialize, Validate)]
pub struct RatingRequest {
    pub content_type: ContentType,
    pub content_id: i32,
    #[validate(range(min = 1, max = 5))]
    pub value: i16,
}

/// Moyenne des notes, `None` si aucune note.
pub fn summarize(key: ContentKey, values: &[i16]) -> RatingSummary {
    let average = if values.is_empty() {
        None
    } else {
        let total: i64 = values.iter().map(|v| *v as i64).sum();
        Some(total as f64 / values.len() as f64)
    };
    RatingSummary {
        content_type: key.content_type,
        content_id: key.content_id,
        average,
        count: values.len(),
    }
}

/// PUT /api/ratings - Une note par utilisateur et par contenu (connecté)
#[put("")]
pub async fn rate(
    auth_user: AuthUser,
    body: web::Json<RatingRequest>,
    db: web::Data<DatabaseConnection>,
) -> AppResult<HttpResponse> {
    body.validate()?;
    let body = body.into_inner();

    if find_content(db.get_ref(), body.content_type, body.content_id).await?.is_none() {
        return Err(AppError::not_found("Content"));
    }

    let existing = Ratings::find()
        .filter(RatingColumn::UserId.eq(auth_user.user_id))
        .filter(RatingColumn::ContentType.eq(body.content_type))
        .filter(RatingColumn::ContentId.eq(body.content_id))
        .one(db.get_ref())
        .await?;

    let rating = match existing {
        Some(row) => {
            let mut active: ratings::ActiveModel = row.into();
            active.value = Set(body.value);
            active.update(db.get_ref()).await?
        }
        None => {
            ratings::ActiveModel {
                user_id: Set(auth_user.user_id),
                content_type: Set(body.content_type),
                content_id: Set(body.content_id),
                value: Set(body.value),
                created_at: Set(Utc::now().naive_utc()),
                ..Default::default()
            }
            .insert(db.get_ref())
            .await?
        }
    };

    Ok(HttpResponse::Ok().json(rating))
}

/// GET /api/ratings/summary?content_type=VIDEO&content_id=2 (PUBLIC)
#[get("/summary")]
pub async fn rating_summary(
    query: web::Query<ContentKey>,
    db: web::Data<DatabaseConnection>,
) -> AppResult<HttpResponse> {
    let key = query.into_inner();
    let values: Vec<i16> = Ratings::find()
        .filter(RatingColumn::ContentType.eq(key.content_type))
        .filter(RatingColumn::ContentId.eq(key.content_id))
        .all(db.get_ref())
        .await?
        .into_iter()
        .map(|r| r.value)
        .collect();

    Ok(HttpResponse::Ok().json(summarize(key, &values)))
}

pub fn ratings_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/ratings")
            .service(rate)
            .service(rating_summary)
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::models::enums::Role;
    use crate::utils::jwt;
    use actix_web::{http::header::AUTHORIZATION, test as actix_test, App};
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn key() -> ContentKey {
        ContentKey { content_type: ContentType::Formation, content_id: 7 }
    }

    #[test]
    fn test_summarize() {
        let summary = summarize(key(), &[5, 4, 3]);
        assert_eq!(summary.count, 3);
        assert_eq!(summary.average, Some(4.0));

        let empty = summarize(key(), &[]);
        assert_eq!(empty.count, 0);
        assert_eq!(empty.average, None);
    }

    #[actix_web::test]
    async fn test_out_of_range_rating_is_rejected() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let config = test_config();
        let token = jwt::generate_token(&config.jwt_secret, 1, 3, "lea@knowledger.fr", Role::User).unwrap();
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(db))
                .app_data(web::Data::new(config))
                .configure(ratings_routes),
        )
        .await;

        let req = actix_test::TestRequest::put()
            .uri("/ratings")
            .insert_header((AUTHORIZATION, format!("Bearer {}", token)))
            .set_json(serde_json::json!({"content_type": "FORMATION", "content_id": 7, "value": 6}))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
    }
}
