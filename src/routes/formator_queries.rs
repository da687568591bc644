use actix_web::{get, post, put, web, HttpResponse};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::{AuthUser, RequireAdmin};
use crate::models::enums::{QueryStatus, Role};
use crate::models::formator_queries::{self, Entity as FormatorQueries, Column as QueryColumn};
use crate::models::users;
use crate::services::notification::notify;

#[derive(Deserialize, Validate)]
pub struct FormatorQueryRequest {
    #[validate(length(min = 20, max = 3000))]
    pub motivation: String,
}

#[derive(Deserialize)]
pub struct DecisionRequest {
    pub accept: bool,
}

#[derive(Deserialize)]
pub struct StatusFilter {
    pub status: Option<QueryStatus>,
}

/// POST /api/formator-queries - Demande pour devenir formateur (connecté)
#[post("")]
pub async fn create_query(
    auth_user: AuthUser,
    body: web::Json<FormatorQueryRequest>,
    db: web::Data<DatabaseConnection>,
) -> AppResult<HttpResponse> {
    body.validate()?;

    if auth_user.role.can_publish() {
        return Err(AppError::BadRequest("Already allowed to publish".into()));
    }

    let pending = FormatorQueries::find()
        .filter(QueryColumn::UserId.eq(auth_user.user_id))
        .filter(QueryColumn::Status.eq(QueryStatus::Pending))
        .one(db.get_ref())
        .await?;
    if pending.is_some() {
        return Err(AppError::Conflict("A request is already pending".into()));
    }

    let query = formator_queries::ActiveModel {
        user_id: Set(auth_user.user_id),
        motivation: Set(body.into_inner().motivation),
        status: Set(QueryStatus::Pending),
        created_at: Set(Utc::now().naive_utc()),
        decided_at: Set(None),
        ..Default::default()
    }
    .insert(db.get_ref())
    .await?;

    Ok(HttpResponse::Created().json(query))
}

/// GET /api/formator-queries?status=PENDING (ADMIN)
#[get("")]
pub async fn list_queries(
    _admin: RequireAdmin,
    filter: web::Query<StatusFilter>,
    db: web::Data<DatabaseConnection>,
) -> AppResult<HttpResponse> {
    let mut select = FormatorQueries::find().order_by_asc(QueryColumn::CreatedAt);
    if let Some(status) = filter.status {
        select = select.filter(QueryColumn::Status.eq(status));
    }
    Ok(HttpResponse::Ok().json(select.all(db.get_ref()).await?))
}

/// PUT /api/formator-queries/{id} - Acceptation ou refus (ADMIN)
/// Acceptée : le demandeur passe FORMATOR et reçoit une notification.
#[put("/{id}")]
pub async fn decide_query(
    RequireAdmin(admin): RequireAdmin,
    path: web::Path<i32>,
    body: web::Json<DecisionRequest>,
    db: web::Data<DatabaseConnection>,
) -> AppResult<HttpResponse> {
    let txn = db.begin().await?;

    let query = FormatorQueries::find_by_id(path.into_inner())
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::not_found("Request"))?;
    if query.status != QueryStatus::Pending {
        return Err(AppError::Conflict("Request already decided".into()));
    }

    let user_id = query.user_id;
    let status = if body.accept { QueryStatus::Accepted } else { QueryStatus::Rejected };

    let mut active: formator_queries::ActiveModel = query.into();
    active.status = Set(status);
    active.decided_at = Set(Some(Utc::now().naive_utc()));
    let decided = active.update(&txn).await?;

    if body.accept {
        let user = users::Entity::find_by_id(user_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;
        // un ADMIN reste ADMIN
        if user.role != Role::Admin {
            let mut active: users::ActiveModel = user.into();
            active.role = Set(Role::Formator);
            active.update(&txn).await?;
        }
        notify(&txn, user_id, "Demande acceptée", "Vous pouvez maintenant publier des contenus.").await?;
    } else {
        notify(&txn, user_id, "Demande refusée", "Votre demande pour devenir formateur a été refusée.").await?;
    }

    txn.commit().await?;
    info!(query_id = decided.id, user_id, admin_id = admin.user_id, ?status, "formator request decided");
    Ok(HttpResponse::Ok().json(decided))
}

pub fn formator_queries_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/formator-queries")
            .service(create_query)
            .service(list_queries)
            .service(decide_query)
    );
}
