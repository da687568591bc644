use actix_web::{delete, get, post, web, HttpResponse};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait, sea_query::Expr,
};
use serde::Deserialize;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::RequireAdmin;
use crate::models::categories::{self, Entity as Categories, Column as CategoryColumn};
use crate::models::{articles, formations, videos};
use crate::utils::slug::slugify;

#[derive(Deserialize, Validate)]
pub struct CategoryRequest {
    #[validate(length(min = 2, max = 60))]
    pub name: String,
}

/// GET /api/categories (PUBLIC)
#[get("")]
pub async fn list_categories(db: web::Data<DatabaseConnection>) -> AppResult<HttpResponse> {
    let all = Categories::find()
        .order_by_asc(CategoryColumn::Name)
        .all(db.get_ref())
        .await?;
    Ok(HttpResponse::Ok().json(all))
}

/// POST /api/categories (ADMIN)
#[post("")]
pub async fn create_category(
    _admin: RequireAdmin,
    body: web::Json<CategoryRequest>,
    db: web::Data<DatabaseConnection>,
) -> AppResult<HttpResponse> {
    body.validate()?;
    let name = body.name.trim().to_string();
    let slug = slugify(&name);
    if slug.is_empty() {
        return Err(AppError::BadRequest("Invalid category name".into()));
    }

    let existing = Categories::find()
        .filter(CategoryColumn::Slug.eq(&slug))
        .one(db.get_ref())
        .await?;
    if existing.is_some() {
        return Err(AppError::Conflict("Category already exists".into()));
    }

    let category = categories::ActiveModel {
        name: Set(name),
        slug: Set(slug),
        ..Default::default()
    }
    .insert(db.get_ref())
    .await?;

    Ok(HttpResponse::Created().json(category))
}

/// DELETE /api/categories/{id} (ADMIN)
/// Les contenus de la catégorie sont conservés, sans catégorie.
#[delete("/{id}")]
pub async fn delete_category(
    _admin: RequireAdmin,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let txn = db.begin().await?;

    articles::Entity::update_many()
        .col_expr(articles::Column::CategoryId, Expr::value(Option::<i32>::None))
        .filter(articles::Column::CategoryId.eq(id))
        .exec(&txn)
        .await?;
    videos::Entity::update_many()
        .col_expr(videos::Column::CategoryId, Expr::value(Option::<i32>::None))
        .filter(videos::Column::CategoryId.eq(id))
        .exec(&txn)
        .await?;
    formations::Entity::update_many()
        .col_expr(formations::Column::CategoryId, Expr::value(Option::<i32>::None))
        .filter(formations::Column::CategoryId.eq(id))
        .exec(&txn)
        .await?;

    let result = Categories::delete_by_id(id).exec(&txn).await?;
    if result.rows_affected == 0 {
        return Err(AppError::not_found("Category"));
    }
    txn.commit().await?;

    Ok(HttpResponse::NoContent().finish())
}

pub fn categories_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/categories")
            .service(list_categories)
            .service(create_category)
            .service(delete_category)
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::models::enums::Role;
    use crate::utils::jwt;
    use actix_web::{http::header::AUTHORIZATION, test, App};
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn admin_header() -> (actix_web::http::header::HeaderName, String) {
        let config = test_config();
        let token = jwt::generate_token(&config.jwt_secret, 1, 1, "admin@knowledger.fr", Role::Admin).unwrap();
        (AUTHORIZATION, format!("Bearer {}", token))
    }

    #[actix_web::test]
    async fn test_delete_unknown_category_is_404() {
        let exec = |rows| MockExecResult { last_insert_id: 0, rows_affected: rows };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([exec(0), exec(0), exec(0), exec(0)])
            .into_connection();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(db))
                .app_data(web::Data::new(test_config()))
                .configure(categories_routes),
        )
        .await;

        let req = test::TestRequest::delete()
            .uri("/categories/12")
            .insert_header(admin_header())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 404);
    }
}
