use actix_web::{delete, get, post, put, web, HttpResponse};
use chrono::{NaiveDateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::{AuthUser, MaybeAuthUser, RequireFormator};
use crate::models::articles::{self, Entity as Articles, Column as ArticleColumn};
use crate::models::dto::{ContentFilter, Gated};
use crate::models::enums::ContentType;
use crate::services::content::{available_slug, ensure_category, ensure_price, ContentRef};
use crate::services::{access, cascade, history};

// Article sans son contenu (listes, et en-tête d'un article verrouillé)
#[derive(Debug, Serialize)]
pub struct ArticleSummary {
    pub id: i32,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub image_url: Option<String>,
    pub is_premium: bool,
    pub price: Decimal,
    pub author_id: i32,
    pub category_id: Option<i32>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<&articles::Model> for ArticleSummary {
    fn from(a: &articles::Model) -> Self {
        ArticleSummary {
            id: a.id,
            title: a.title.clone(),
            slug: a.slug.clone(),
            description: a.description.clone(),
            image_url: a.image_url.clone(),
            is_premium: a.is_premium,
            price: a.price,
            author_id: a.author_id,
            category_id: a.category_id,
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

#[derive(Deserialize, Validate)]
pub struct ArticleRequest {
    #[validate(length(min = 3, max = 200))]
    pub title: String,
    #[validate(length(max = 500))]
    pub description: String,
    #[validate(length(min = 1))]
    pub content: String,
    #[validate(url)]
    pub image_url: Option<String>,
    pub is_premium: bool,
    pub price: Decimal,
    pub category_id: Option<i32>,
}

async fn find_article(db: &DatabaseConnection, id: i32) -> AppResult<articles::Model> {
    Articles::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found("Article"))
}

/// GET /api/articles - Liste (PUBLIC)
#[get("")]
pub async fn list_articles(
    filter: web::Query<ContentFilter>,
    db: web::Data<DatabaseConnection>,
) -> AppResult<HttpResponse> {
    let mut query = Articles::find().order_by_desc(ArticleColumn::CreatedAt);
    if let Some(category) = filter.category {
        query = query.filter(ArticleColumn::CategoryId.eq(category));
    }
    if let Some(premium) = filter.premium {
        query = query.filter(ArticleColumn::IsPremium.eq(premium));
    }

    let articles = query.all(db.get_ref()).await?;
    let response: Vec<ArticleSummary> = articles.iter().map(ArticleSummary::from).collect();
    Ok(HttpResponse::Ok().json(response))
}

/// GET /api/articles/{slug} - Article, contenu masqué sans accès (PUBLIC)
#[get("/{slug}")]
pub async fn get_article(
    path: web::Path<String>,
    viewer: MaybeAuthUser,
    db: web::Data<DatabaseConnection>,
) -> AppResult<HttpResponse> {
    let slug = path.into_inner();
    let article = Articles::find()
        .filter(ArticleColumn::Slug.eq(&slug))
        .one(db.get_ref())
        .await?
        .ok_or_else(|| AppError::not_found("Article"))?;

    let viewer = viewer.0;
    let content = ContentRef::from(article.clone());
    let has_access = access::resolve_access(db.get_ref(), viewer.as_ref(), &content).await?;

    if let (true, Some(user)) = (has_access, &viewer) {
        history::record_view(db.get_ref(), user.user_id, ContentType::Article, article.id).await?;
    }

    Ok(HttpResponse::Ok().json(Gated {
        item: ArticleSummary::from(&article),
        has_access,
        body: has_access.then_some(article.content),
    }))
}

/// POST /api/articles - Publier (FORMATOR / ADMIN)
#[post("")]
pub async fn create_article(
    RequireFormator(author): RequireFormator,
    body: web::Json<ArticleRequest>,
    db: web::Data<DatabaseConnection>,
) -> AppResult<HttpResponse> {
    body.validate()?;
    ensure_price(body.price)?;
    ensure_category(db.get_ref(), body.category_id).await?;

    let body = body.into_inner();
    let now = Utc::now().naive_utc();
    let slug = available_slug(db.get_ref(), ContentType::Article, &body.title, None).await?;

    let article = articles::ActiveModel {
        title: Set(body.title),
        slug: Set(slug),
        description: Set(body.description),
        content: Set(body.content),
        image_url: Set(body.image_url),
        is_premium: Set(body.is_premium),
        price: Set(body.price),
        author_id: Set(author.user_id),
        category_id: Set(body.category_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db.get_ref())
    .await?;

    Ok(HttpResponse::Created().json(article))
}

/// PUT /api/articles/{id} - Modifier (auteur ou ADMIN)
#[put("/{id}")]
pub async fn update_article(
    auth_user: AuthUser,
    path: web::Path<i32>,
    body: web::Json<ArticleRequest>,
    db: web::Data<DatabaseConnection>,
) -> AppResult<HttpResponse> {
    let article = find_article(db.get_ref(), path.into_inner()).await?;
    if !auth_user.can_manage(article.author_id) {
        return Err(AppError::Forbidden("Only the author or an admin can edit this article".into()));
    }

    body.validate()?;
    ensure_price(body.price)?;
    ensure_category(db.get_ref(), body.category_id).await?;
    let body = body.into_inner();

    let slug = if body.title != article.title {
        available_slug(db.get_ref(), ContentType::Article, &body.title, Some(article.id)).await?
    } else {
        article.slug.clone()
    };

    let mut active: articles::ActiveModel = article.into();
    active.title = Set(body.title);
    active.slug = Set(slug);
    active.description = Set(body.description);
    active.content = Set(body.content);
    active.image_url = Set(body.image_url);
    active.is_premium = Set(body.is_premium);
    active.price = Set(body.price);
    active.category_id = Set(body.category_id);
    active.updated_at = Set(Utc::now().naive_utc());

    Ok(HttpResponse::Ok().json(active.update(db.get_ref()).await?))
}

/// DELETE /api/articles/{id} - Supprimer avec ses dépendances (auteur ou ADMIN)
#[delete("/{id}")]
pub async fn delete_article(
    auth_user: AuthUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> AppResult<HttpResponse> {
    let article = find_article(db.get_ref(), path.into_inner()).await?;
    if !auth_user.can_manage(article.author_id) {
        return Err(AppError::Forbidden("Only the author or an admin can delete this article".into()));
    }

    cascade::delete_article(db.get_ref(), article.id).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub fn articles_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/articles")
            .service(list_articles)
            .service(create_article)
            .service(get_article)
            .service(update_article)
            .service(delete_article)
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

    fn bearer(user_id: i32, role: Role) -> (actix_web::http::header::HeaderName, String) {
        let config = test_config();
        let token = jwt::generate_token(&config.jwt_secret, 1, user_id, "t@knowledger.fr", role).unwrap();
        (AUTHORIZATION, format!("Bearer {}", token))
    }

    fn article(author_id: i32, is_premium: bool) -> articles::Model {
        let now = Utc::now().naive_utc();
        articles::Model {
            id: 1,
            title: "Les bases".into(),
            slug: "les-bases".into(),
            description: "Intro".into(),
            content: "Texte complet".into(),
            image_url: None,
            is_premium,
            price: Decimal::new(300, 2),
            author_id,
            category_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[actix_web::test]
    async fn test_plain_user_cannot_publish() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(db))
                .app_data(web::Data::new(test_config()))
                .configure(articles_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/articles")
            .insert_header(bearer(2, Role::Premium))
            .set_json(serde_json::json!({
                "title": "Titre", "description": "", "content": "x",
                "image_url": null, "is_premium": false, "price": "0", "category_id": null
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 403);
    }

    #[actix_web::test]
    async fn test_delete_missing_article_is_404() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<articles::Model>::new()])
            .into_connection();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(db))
                .app_data(web::Data::new(test_config()))
                .configure(articles_routes),
        )
        .await;

        let req = test::TestRequest::delete()
            .uri("/articles/99")
            .insert_header(bearer(1, Role::Admin))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 404);
    }

    #[actix_web::test]
    async fn test_delete_someone_elses_article_is_403() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![article(1, false)]])
            .into_connection();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(db))
                .app_data(web::Data::new(test_config()))
                .configure(articles_routes),
        )
        .await;

        let req = test::TestRequest::delete()
            .uri("/articles/1")
            .insert_header(bearer(2, Role::Formator))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 403);
    }

    #[actix_web::test]
    async fn test_anonymous_sees_locked_premium_article() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![article(1, true)]])
            .into_connection();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(db))
                .app_data(web::Data::new(test_config()))
                .configure(articles_routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/articles/les-bases").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["has_access"], false);
        assert!(body["body"].is_null());
        assert_eq!(body["title"], "Les bases");
    }
}
