use actix_web::{delete, get, post, put, web, HttpResponse};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::RequireAdmin;
use crate::models::admin_settings::{self, SETTINGS_ID};
use crate::models::dto::AdminStats;
use crate::models::enums::{QueryStatus, Role, SubscriptionStatus};
use crate::models::todos::{self, Entity as Todos, Column as TodoColumn};
use crate::models::users::{self, Entity as Users, Column as UserColumn};
use crate::models::{articles, formations, formator_queries, purchases, subscriptions, videos};
use crate::services::cascade;
use crate::services::subscription::{default_settings, load_settings};

#[derive(Deserialize)]
pub struct RoleRequest {
    pub role: Role,
}

#[derive(Deserialize, Validate)]
pub struct SettingsRequest {
    #[validate(length(min = 1, max = 100))]
    pub site_name: Option<String>,
    pub monthly_price: Option<Decimal>,
    pub yearly_price: Option<Decimal>,
    pub maintenance_mode: Option<bool>,
}

#[derive(Deserialize, Validate)]
pub struct TodoRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
}

#[derive(Deserialize, Validate)]
pub struct TodoUpdate {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub done: Option<bool>,
}

// ============================================================================
// UTILISATEURS
// ============================================================================

/// GET /api/admin/users
#[get("/users")]
pub async fn list_users(
    _admin: RequireAdmin,
    db: web::Data<DatabaseConnection>,
) -> AppResult<HttpResponse> {
    let users = Users::find()
        .order_by_asc(UserColumn::Id)
        .all(db.get_ref())
        .await?;
    Ok(HttpResponse::Ok().json(users))
}

/// PUT /api/admin/users/{id}/role
#[put("/users/{id}/role")]
pub async fn change_role(
    RequireAdmin(admin): RequireAdmin,
    path: web::Path<i32>,
    body: web::Json<RoleRequest>,
    db: web::Data<DatabaseConnection>,
) -> AppResult<HttpResponse> {
    let user_id = path.into_inner();
    if user_id == admin.user_id {
        return Err(AppError::BadRequest("You cannot change your own role".into()));
    }

    let user = Users::find_by_id(user_id)
        .one(db.get_ref())
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

    let mut active: users::ActiveModel = user.into();
    active.role = Set(body.role);
    let updated = active.update(db.get_ref()).await?;

    info!(user_id, role = updated.role.as_str(), admin_id = admin.user_id, "role changed");
    Ok(HttpResponse::Ok().json(updated))
}

/// DELETE /api/admin/users/{id} - Supprime le compte et tout ce qui en dépend
#[delete("/users/{id}")]
pub async fn delete_user(
    RequireAdmin(admin): RequireAdmin,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> AppResult<HttpResponse> {
    let user_id = path.into_inner();
    if user_id == admin.user_id {
        return Err(AppError::BadRequest("You cannot delete your own account here".into()));
    }

    cascade::delete_user(db.get_ref(), user_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

// ============================================================================
// STATISTIQUES
// ============================================================================

/// GET /api/admin/stats
#[get("/stats")]
pub async fn stats(
    _admin: RequireAdmin,
    db: web::Data<DatabaseConnection>,
) -> AppResult<HttpResponse> {
    let db = db.get_ref();
    let stats = AdminStats {
        users: Users::find().count(db).await?,
        premium_users: Users::find().filter(UserColumn::Role.eq(Role::Premium)).count(db).await?,
        formators: Users::find().filter(UserColumn::Role.eq(Role::Formator)).count(db).await?,
        articles: articles::Entity::find().count(db).await?,
        videos: videos::Entity::find().count(db).await?,
        formations: formations::Entity::find().count(db).await?,
        purchases: purchases::Entity::find().count(db).await?,
        active_subscriptions: subscriptions::Entity::find()
            .filter(subscriptions::Column::Status.eq(SubscriptionStatus::Active))
            .filter(subscriptions::Column::CurrentPeriodEnd.gt(Utc::now().naive_utc()))
            .count(db)
            .await?,
        pending_formator_queries: formator_queries::Entity::find()
            .filter(formator_queries::Column::Status.eq(QueryStatus::Pending))
            .count(db)
            .await?,
    };
    Ok(HttpResponse::Ok().json(stats))
}

// ============================================================================
// RÉGLAGES
// ============================================================================

/// GET /api/admin/settings
#[get("/settings")]
pub async fn get_settings(
    _admin: RequireAdmin,
    db: web::Data<DatabaseConnection>,
) -> AppResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(load_settings(db.get_ref()).await?))
}

/// PUT /api/admin/settings - Mise à jour partielle, la ligne est créée au premier appel
#[put("/settings")]
pub async fn update_settings(
    _admin: RequireAdmin,
    body: web::Json<SettingsRequest>,
    db: web::Data<DatabaseConnection>,
) -> AppResult<HttpResponse> {
    body.validate()?;
    let body = body.into_inner();
    for price in [body.monthly_price, body.yearly_price].into_iter().flatten() {
        if price <= Decimal::ZERO {
            return Err(AppError::BadRequest("Prices must be positive".into()));
        }
    }

    let stored = admin_settings::Entity::find_by_id(SETTINGS_ID).one(db.get_ref()).await?;
    let exists = stored.is_some();
    let mut settings = match stored {
        Some(s) => s,
        None => default_settings(),
    };

    if let Some(site_name) = body.site_name {
        settings.site_name = site_name;
    }
    if let Some(price) = body.monthly_price {
        settings.monthly_price = price;
    }
    if let Some(price) = body.yearly_price {
        settings.yearly_price = price;
    }
    if let Some(flag) = body.maintenance_mode {
        settings.maintenance_mode = flag;
    }
    settings.updated_at = Utc::now().naive_utc();

    let active = admin_settings::ActiveModel {
        id: Set(SETTINGS_ID),
        site_name: Set(settings.site_name),
        monthly_price: Set(settings.monthly_price),
        yearly_price: Set(settings.yearly_price),
        maintenance_mode: Set(settings.maintenance_mode),
        updated_at: Set(settings.updated_at),
    };
    let saved = if exists {
        active.update(db.get_ref()).await?
    } else {
        active.insert(db.get_ref()).await?
    };

    Ok(HttpResponse::Ok().json(saved))
}

// ============================================================================
// TODOS
// ============================================================================

#[get("/todos")]
pub async fn list_todos(
    _admin: RequireAdmin,
    db: web::Data<DatabaseConnection>,
) -> AppResult<HttpResponse> {
    let all = Todos::find()
        .order_by_asc(TodoColumn::Done)
        .order_by_desc(TodoColumn::CreatedAt)
        .all(db.get_ref())
        .await?;
    Ok(HttpResponse::Ok().json(all))
}

#[post("/todos")]
pub async fn create_todo(
    RequireAdmin(admin): RequireAdmin,
    body: web::Json<TodoRequest>,
    db: web::Data<DatabaseConnection>,
) -> AppResult<HttpResponse> {
    body.validate()?;
    let todo = todos::ActiveModel {
        title: Set(body.into_inner().title),
        done: Set(false),
        created_by: Set(admin.user_id),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db.get_ref())
    .await?;
    Ok(HttpResponse::Created().json(todo))
}

#[put("/todos/{id}")]
pub async fn update_todo(
    _admin: RequireAdmin,
    path: web::Path<i32>,
    body: web::Json<TodoUpdate>,
    db: web::Data<DatabaseConnection>,
) -> AppResult<HttpResponse> {
    body.validate()?;
    let body = body.into_inner();
    let todo = Todos::find_by_id(path.into_inner())
        .one(db.get_ref())
        .await?
        .ok_or_else(|| AppError::not_found("Todo"))?;

    let mut active: todos::ActiveModel = todo.into();
    if let Some(title) = body.title {
        active.title = Set(title);
    }
    if let Some(done) = body.done {
        active.done = Set(done);
    }
    Ok(HttpResponse::Ok().json(active.update(db.get_ref()).await?))
}

#[delete("/todos/{id}")]
pub async fn delete_todo(
    _admin: RequireAdmin,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> AppResult<HttpResponse> {
    let result = Todos::delete_by_id(path.into_inner()).exec(db.get_ref()).await?;
    if result.rows_affected == 0 {
        return Err(AppError::not_found("Todo"));
    }
    Ok(HttpResponse::NoContent().finish())
}

pub fn admin_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .service(list_users)
            .service(change_role)
            .service(delete_user)
            .service(stats)
            .service(get_settings)
            .service(update_settings)
            .service(list_todos)
            .service(create_todo)
            .service(update_todo)
            .service(delete_todo)
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::utils::jwt;
    use actix_web::{http::header::AUTHORIZATION, test, App};
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn bearer(user_id: i32, role: Role) -> (actix_web::http::header::HeaderName, String) {
        let token = jwt::generate_token(&test_config().jwt_secret, 1, user_id, "someone@knowledger.fr", role).unwrap();
        (AUTHORIZATION, format!("Bearer {}", token))
    }

    #[actix_web::test]
    async fn test_admin_routes_reject_other_roles() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(db))
                .app_data(web::Data::new(test_config()))
                .configure(admin_routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/admin/users").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 401);

        let req = test::TestRequest::get()
            .uri("/admin/stats")
            .insert_header(bearer(3, Role::Premium))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 403);
    }

    #[actix_web::test]
    async fn test_admin_cannot_delete_self() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(db))
                .app_data(web::Data::new(test_config()))
                .configure(admin_routes),
        )
        .await;

        let req = test::TestRequest::delete()
            .uri("/admin/users/1")
            .insert_header(bearer(1, Role::Admin))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 400);
    }

    #[actix_web::test]
    async fn test_settings_fall_back_to_defaults() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<admin_settings::Model>::new()])
            .into_connection();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(db))
                .app_data(web::Data::new(test_config()))
                .configure(admin_routes),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/admin/settings")
            .insert_header(bearer(1, Role::Admin))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["id"], SETTINGS_ID);
        assert_eq!(body["maintenance_mode"], false);
    }
}
