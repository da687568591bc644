use std::collections::HashMap;

use actix_web::{delete, get, post, put, web, HttpResponse};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::{AuthUser, RequireFormator};
use crate::models::parcours::{self, Entity as Parcours, Column as ParcoursColumn};
use crate::models::{formations, parcours_formations};
use crate::routes::formations::FormationSummary;
use crate::services::cascade;
use crate::services::content::{available_slug, ordered_links, SlugScope};

#[derive(Deserialize, Validate)]
pub struct ParcoursRequest {
    #[validate(length(min = 3, max = 200))]
    pub title: String,
    #[validate(length(max = 1000))]
    pub description: String,
    #[validate(url)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub formation_ids: Vec<i32>,
}

#[derive(Deserialize)]
pub struct ParcoursFormationsRequest {
    pub formation_ids: Vec<i32>,
}

#[derive(Serialize)]
pub struct ParcoursDetail {
    #[serde(flatten)]
    pub parcours: parcours::Model,
    pub formations: Vec<FormationSummary>,
}

async fn ordered_formations(db: &DatabaseConnection, parcours_id: i32) -> AppResult<Vec<formations::Model>> {
    let links = parcours_formations::Entity::find()
        .filter(parcours_formations::Column::ParcoursId.eq(parcours_id))
        .order_by_asc(parcours_formations::Column::Position)
        .all(db)
        .await?;
    if links.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<i32> = links.iter().map(|l| l.formation_id).collect();
    let mut by_id: HashMap<i32, formations::Model> = formations::Entity::find()
        .filter(formations::Column::Id.is_in(ids))
        .all(db)
        .await?
        .into_iter()
        .map(|f| (f.id, f))
        .collect();

    Ok(links.iter().filter_map(|l| by_id.remove(&l.formation_id)).collect())
}

/// Vérifie la liste demandée : pas de doublon, toutes les formations existent.
async fn checked_links<C: ConnectionTrait>(conn: &C, formation_ids: &[i32]) -> AppResult<Vec<(i32, i32)>> {
    let links = ordered_links(formation_ids)?;
    if !links.is_empty() {
        let found = formations::Entity::find()
            .filter(formations::Column::Id.is_in(formation_ids.to_vec()))
            .all(conn)
            .await?;
        if found.len() != links.len() {
            return Err(AppError::BadRequest("Unknown formation in list".into()));
        }
    }
    Ok(links)
}

/// Remplace les formations d'un parcours. À appeler dans une transaction.
async fn replace_formations<C: ConnectionTrait>(
    conn: &C,
    parcours_id: i32,
    links: Vec<(i32, i32)>,
) -> Result<(), DbErr> {
    parcours_formations::Entity::delete_many()
        .filter(parcours_formations::Column::ParcoursId.eq(parcours_id))
        .exec(conn)
        .await?;
    if !links.is_empty() {
        let rows = links.into_iter().map(|(formation_id, position)| parcours_formations::ActiveModel {
            parcours_id: Set(parcours_id),
            formation_id: Set(formation_id),
            position: Set(position),
            ..Default::default()
        });
        parcours_formations::Entity::insert_many(rows).exec(conn).await?;
    }
    Ok(())
}

async fn find_parcours(db: &DatabaseConnection, id: i32) -> AppResult<parcours::Model> {
    Parcours::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found("Parcours"))
}

/// GET /api/parcours (PUBLIC)
#[get("")]
pub async fn list_parcours(db: web::Data<DatabaseConnection>) -> AppResult<HttpResponse> {
    let all = Parcours::find()
        .order_by_desc(ParcoursColumn::CreatedAt)
        .all(db.get_ref())
        .await?;
    Ok(HttpResponse::Ok().json(all))
}

/// GET /api/parcours/{slug} - Parcours et ses formations ordonnées (PUBLIC)
#[get("/{slug}")]
pub async fn get_parcours(
    path: web::Path<String>,
    db: web::Data<DatabaseConnection>,
) -> AppResult<HttpResponse> {
    let parcours = Parcours::find()
        .filter(ParcoursColumn::Slug.eq(path.into_inner()))
        .one(db.get_ref())
        .await?
        .ok_or_else(|| AppError::not_found("Parcours"))?;

    let formations = ordered_formations(db.get_ref(), parcours.id).await?;
    Ok(HttpResponse::Ok().json(ParcoursDetail {
        parcours,
        formations: formations.iter().map(FormationSummary::from).collect(),
    }))
}

/// POST /api/parcours (FORMATOR / ADMIN)
#[post("")]
pub async fn create_parcours(
    RequireFormator(author): RequireFormator,
    body: web::Json<ParcoursRequest>,
    db: web::Data<DatabaseConnection>,
) -> AppResult<HttpResponse> {
    body.validate()?;
    let body = body.into_inner();

    // Liste vérifiée avant toute écriture : un refus ne laisse pas de parcours orphelin
    let links = checked_links(db.get_ref(), &body.formation_ids).await?;

    let txn = db.begin().await?;
    let slug = available_slug(&txn, SlugScope::Parcours, &body.title, None).await?;
    let parcours = parcours::ActiveModel {
        title: Set(body.title),
        slug: Set(slug),
        description: Set(body.description),
        image_url: Set(body.image_url),
        author_id: Set(author.user_id),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    replace_formations(&txn, parcours.id, links).await?;
    txn.commit().await?;

    Ok(HttpResponse::Created().json(parcours))
}

/// PUT /api/parcours/{id}/formations (auteur ou ADMIN)
#[put("/{id}/formations")]
pub async fn set_parcours_formations(
    auth_user: AuthUser,
    path: web::Path<i32>,
    body: web::Json<ParcoursFormationsRequest>,
    db: web::Data<DatabaseConnection>,
) -> AppResult<HttpResponse> {
    let parcours = find_parcours(db.get_ref(), path.into_inner()).await?;
    if !auth_user.can_manage(parcours.author_id) {
        return Err(AppError::Forbidden("Only the author or an admin can edit this parcours".into()));
    }

    let links = checked_links(db.get_ref(), &body.formation_ids).await?;
    let txn = db.begin().await?;
    replace_formations(&txn, parcours.id, links).await?;
    txn.commit().await?;

    let formations = ordered_formations(db.get_ref(), parcours.id).await?;
    Ok(HttpResponse::Ok().json(ParcoursDetail {
        parcours,
        formations: formations.iter().map(FormationSummary::from).collect(),
    }))
}

/// DELETE /api/parcours/{id} (auteur ou ADMIN)
#[delete("/{id}")]
pub async fn delete_parcours(
    auth_user: AuthUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> AppResult<HttpResponse> {
    let parcours = find_parcours(db.get_ref(), path.into_inner()).await?;
    if !auth_user.can_manage(parcours.author_id) {
        return Err(AppError::Forbidden("Only the author or an admin can delete this parcours".into()));
    }

    cascade::delete_parcours(db.get_ref(), parcours.id).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub fn parcours_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/parcours")
            .service(list_parcours)
            .service(create_parcours)
            .service(get_parcours)
            .service(set_parcours_formations)
            .service(delete_parcours)
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::models::enums::Role;
    use crate::utils::jwt;
    use actix_web::{http::header::AUTHORIZATION, test, App};
    use chrono::NaiveDateTime;
    use rust_decimal::Decimal;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn parcours_model(now: NaiveDateTime) -> parcours::Model {
        parcours::Model {
            id: 2,
            title: "Devenir développeur Rust".into(),
            slug: "devenir-developpeur-rust".into(),
            description: String::new(),
            image_url: None,
            author_id: 4,
            created_at: now,
        }
    }

    #[actix_web::test]
    async fn test_parcours_formations_in_position_order() {
        let now = Utc::now().naive_utc();
        let formation = |id: i32| formations::Model {
            id,
            title: format!("Formation {}", id),
            slug: format!("formation-{}", id),
            description: String::new(),
            image_url: None,
            is_premium: true,
            price: Decimal::new(2900, 2),
            author_id: 4,
            category_id: None,
            created_at: now,
            updated_at: now,
        };
        let link = |formation_id: i32, position: i32| parcours_formations::Model {
            id: position + 1,
            parcours_id: 2,
            formation_id,
            position,
        };

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![parcours_model(now)]])
            .append_query_results([vec![link(6, 0), link(3, 1)]])
            .append_query_results([vec![formation(3), formation(6)]])
            .into_connection();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(db))
                .app_data(web::Data::new(test_config()))
                .configure(parcours_routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/parcours/devenir-developpeur-rust").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        let ids: Vec<i64> = body["formations"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["id"].as_i64().unwrap())
            .collect();
        assert_eq!(body["slug"], "devenir-developpeur-rust");
        assert_eq!(ids, vec![6, 3]);
    }

    #[actix_web::test]
    async fn test_only_author_edits_parcours() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![parcours_model(Utc::now().naive_utc())]])
            .into_connection();
        let config = test_config();
        let token = jwt::generate_token(&config.jwt_secret, 1, 9, "autre@knowledger.fr", Role::Formator).unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(db))
                .app_data(web::Data::new(config))
                .configure(parcours_routes),
        )
        .await;

        let req = test::TestRequest::put()
            .uri("/parcours/2/formations")
            .insert_header((AUTHORIZATION, format!("Bearer {}", token)))
            .set_json(serde_json::json!({"formation_ids": [1, 2]}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 403);
    }

    #[actix_web::test]
    async fn test_unknown_formation_creates_nothing() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<formations::Model>::new()])
            .into_connection();
        let config = test_config();
        let token = jwt::generate_token(&config.jwt_secret, 1, 4, "form@knowledger.fr", Role::Formator).unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(db))
                .app_data(web::Data::new(config))
                .configure(parcours_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/parcours")
            .insert_header((AUTHORIZATION, format!("Bearer {}", token)))
            .set_json(serde_json::json!({
                "title": "Devenir développeur Rust",
                "description": "",
                "formation_ids": [404]
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        // une insertion préalable aurait épuisé le mock (500)
        assert_eq!(resp.status(), 400);
    }
}
