use std::collections::HashMap;

use actix_web::{delete, get, post, put, web, HttpResponse};
use chrono::{NaiveDateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::{AuthUser, MaybeAuthUser, RequireFormator};
use crate::models::dto::{ContentFilter, Gated};
use crate::models::enums::ContentType;
use crate::models::formations::{self, Entity as Formations, Column as FormationColumn};
use crate::models::{video_formations, videos};
use crate::routes::videos::VideoSummary;
use crate::services::content::{available_slug, ensure_category, ensure_price, ordered_links, ContentRef};
use crate::services::{access, cascade, history};

#[derive(Debug, Serialize)]
pub struct FormationSummary {
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
}

impl From<&formations::Model> for FormationSummary {
    fn from(f: &formations::Model) -> Self {
        FormationSummary {
            id: f.id,
            title: f.title.clone(),
            slug: f.slug.clone(),
            description: f.description.clone(),
            image_url: f.image_url.clone(),
            is_premium: f.is_premium,
            price: f.price,
            author_id: f.author_id,
            category_id: f.category_id,
            created_at: f.created_at,
        }
    }
}

// Programme d'une formation : toujours visible, URLs des médias à part
#[derive(Debug, Serialize)]
pub struct FormationDetail {
    #[serde(flatten)]
    pub formation: FormationSummary,
    pub videos: Vec<VideoSummary>,
}

#[derive(Deserialize, Validate)]
pub struct FormationRequest {
    #[validate(length(min = 3, max = 200))]
    pub title: String,
    #[validate(length(max = 1000))]
    pub description: String,
    #[validate(url)]
    pub image_url: Option<String>,
    pub is_premium: bool,
    pub price: Decimal,
    pub category_id: Option<i32>,
}

#[derive(Deserialize)]
pub struct FormationVideosRequest {
    pub video_ids: Vec<i32>,
}

async fn find_formation(db: &DatabaseConnection, id: i32) -> AppResult<formations::Model> {
    Formations::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found("Formation"))
}

async fn find_by_slug(db: &DatabaseConnection, slug: &str) -> AppResult<formations::Model> {
    Formations::find()
        .filter(FormationColumn::Slug.eq(slug))
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found("Formation"))
}

/// Vidéos d'une formation, dans l'ordre des positions.
pub async fn ordered_videos(db: &DatabaseConnection, formation_id: i32) -> AppResult<Vec<videos::Model>> {
    let links = video_formations::Entity::find()
        .filter(video_formations::Column::FormationId.eq(formation_id))
        .order_by_asc(video_formations::Column::Position)
        .all(db)
        .await?;
    if links.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<i32> = links.iter().map(|l| l.video_id).collect();
    let mut by_id: HashMap<i32, videos::Model> = videos::Entity::find()
        .filter(videos::Column::Id.is_in(ids))
        .all(db)
        .await?
        .into_iter()
        .map(|v| (v.id, v))
        .collect();

    Ok(links.iter().filter_map(|l| by_id.remove(&l.video_id)).collect())
}

/// GET /api/formations - Liste (PUBLIC)
#[get("")]
pub async fn list_formations(
    filter: web::Query<ContentFilter>,
    db: web::Data<DatabaseConnection>,
) -> AppResult<HttpResponse> {
    let mut query = Formations::find().order_by_desc(FormationColumn::CreatedAt);
    if let Some(category) = filter.category {
        query = query.filter(FormationColumn::CategoryId.eq(category));
    }
    if let Some(premium) = filter.premium {
        query = query.filter(FormationColumn::IsPremium.eq(premium));
    }

    let formations = query.all(db.get_ref()).await?;
    let response: Vec<FormationSummary> = formations.iter().map(FormationSummary::from).collect();
    Ok(HttpResponse::Ok().json(response))
}

/// GET /api/formations/{slug} - Programme + URLs des vidéos si accès (PUBLIC)
#[get("/{slug}")]
pub async fn get_formation(
    path: web::Path<String>,
    viewer: MaybeAuthUser,
    db: web::Data<DatabaseConnection>,
) -> AppResult<HttpResponse> {
    let formation = find_by_slug(db.get_ref(), &path.into_inner()).await?;
    let viewer = viewer.0;
    let formation_ref = ContentRef::from(formation.clone());
    let has_access = access::resolve_access(db.get_ref(), viewer.as_ref(), &formation_ref).await?;

    if let (true, Some(user)) = (has_access, &viewer) {
        history::record_view(db.get_ref(), user.user_id, ContentType::Formation, formation.id).await?;
    }

    let videos = ordered_videos(db.get_ref(), formation.id).await?;
    let playable = access::playable_videos(db.get_ref(), viewer.as_ref(), &formation_ref, has_access, &videos).await?;
    let urls: Vec<serde_json::Value> = videos
        .iter()
        .filter(|v| playable.contains(&v.id))
        .map(|v| serde_json::json!({ "video_id": v.id, "video_url": v.video_url }))
        .collect();

    Ok(HttpResponse::Ok().json(Gated {
        item: FormationDetail {
            formation: FormationSummary::from(&formation),
            videos: videos.iter().map(VideoSummary::from).collect(),
        },
        has_access,
        body: has_access.then_some(urls),
    }))
}

/// GET /api/formations/{slug}/videos - Vidéos complètes, dans l'ordre (accès requis)
#[get("/{slug}/videos")]
pub async fn get_formation_videos(
    path: web::Path<String>,
    viewer: MaybeAuthUser,
    db: web::Data<DatabaseConnection>,
) -> AppResult<HttpResponse> {
    let formation = find_by_slug(db.get_ref(), &path.into_inner()).await?;
    let viewer = viewer.0;
    let formation_ref = ContentRef::from(formation.clone());
    if !access::resolve_access(db.get_ref(), viewer.as_ref(), &formation_ref).await? {
        return Err(match viewer {
            None => AppError::Unauthorized("Login required".into()),
            Some(_) => AppError::Forbidden("Purchase or subscription required".into()),
        });
    }

    // Une vidéo premium n'est servie que si le visiteur y a accès
    let videos = ordered_videos(db.get_ref(), formation.id).await?;
    let playable = access::playable_videos(db.get_ref(), viewer.as_ref(), &formation_ref, true, &videos).await?;
    let response: Vec<Gated<VideoSummary, serde_json::Value>> = videos
        .iter()
        .map(|v| {
            let has_access = playable.contains(&v.id);
            Gated {
                item: VideoSummary::from(v),
                has_access,
                body: has_access.then(|| serde_json::json!({ "video_url": v.video_url })),
            }
        })
        .collect();
    Ok(HttpResponse::Ok().json(response))
}

/// POST /api/formations - Publier (FORMATOR / ADMIN)
#[post("")]
pub async fn create_formation(
    RequireFormator(author): RequireFormator,
    body: web::Json<FormationRequest>,
    db: web::Data<DatabaseConnection>,
) -> AppResult<HttpResponse> {
    body.validate()?;
    ensure_price(body.price)?;
    ensure_category(db.get_ref(), body.category_id).await?;

    let body = body.into_inner();
    let now = Utc::now().naive_utc();
    let slug = available_slug(db.get_ref(), ContentType::Formation, &body.title, None).await?;

    let formation = formations::ActiveModel {
        title: Set(body.title),
        slug: Set(slug),
        description: Set(body.description),
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

    Ok(HttpResponse::Created().json(formation))
}

/// PUT /api/formations/{id} - Modifier (auteur ou ADMIN)
#[put("/{id}")]
pub async fn update_formation(
    auth_user: AuthUser,
    path: web::Path<i32>,
    body: web::Json<FormationRequest>,
    db: web::Data<DatabaseConnection>,
) -> AppResult<HttpResponse> {
    let formation = find_formation(db.get_ref(), path.into_inner()).await?;
    if !auth_user.can_manage(formation.author_id) {
        return Err(AppError::Forbidden("Only the author or an admin can edit this formation".into()));
    }

    body.validate()?;
    ensure_price(body.price)?;
    ensure_category(db.get_ref(), body.category_id).await?;
    let body = body.into_inner();

    let slug = if body.title != formation.title {
        available_slug(db.get_ref(), ContentType::Formation, &body.title, Some(formation.id)).await?
    } else {
        formation.slug.clone()
    };

    let mut active: formations::ActiveModel = formation.into();
    active.title = Set(body.title);
    active.slug = Set(slug);
    active.description = Set(body.description);
    active.image_url = Set(body.image_url);
    active.is_premium = Set(body.is_premium);
    active.price = Set(body.price);
    active.category_id = Set(body.category_id);
    active.updated_at = Set(Utc::now().naive_utc());

    Ok(HttpResponse::Ok().json(active.update(db.get_ref()).await?))
}

/// PUT /api/formations/{id}/videos - Remplace la liste ordonnée des vidéos (auteur ou ADMIN)
#[put("/{id}/videos")]
pub async fn set_formation_videos(
    auth_user: AuthUser,
    path: web::Path<i32>,
    body: web::Json<FormationVideosRequest>,
    db: web::Data<DatabaseConnection>,
) -> AppResult<HttpResponse> {
    let formation = find_formation(db.get_ref(), path.into_inner()).await?;
    if !auth_user.can_manage(formation.author_id) {
        return Err(AppError::Forbidden("Only the author or an admin can edit this formation".into()));
    }

    let links = ordered_links(&body.video_ids)?;

    // Toutes les vidéos doivent exister
    let found = videos::Entity::find()
        .filter(videos::Column::Id.is_in(body.video_ids.clone()))
        .all(db.get_ref())
        .await?;
    if found.len() != links.len() {
        return Err(AppError::BadRequest("Unknown video in list".into()));
    }
    // Seul un ADMIN peut composer une formation avec les vidéos d'autres auteurs
    if !auth_user.is_admin() && found.iter().any(|v| v.author_id != auth_user.user_id) {
        return Err(AppError::Forbidden("Only your own videos can be added to a formation".into()));
    }

    let txn = db.begin().await?;
    video_formations::Entity::delete_many()
        .filter(video_formations::Column::FormationId.eq(formation.id))
        .exec(&txn)
        .await?;
    if !links.is_empty() {
        let rows = links.into_iter().map(|(video_id, position)| video_formations::ActiveModel {
            formation_id: Set(formation.id),
            video_id: Set(video_id),
            position: Set(position),
            ..Default::default()
        });
        video_formations::Entity::insert_many(rows).exec(&txn).await?;
    }
    txn.commit().await?;

    Ok(HttpResponse::Ok().json(ordered_videos(db.get_ref(), formation.id).await?
        .iter()
        .map(VideoSummary::from)
        .collect::<Vec<_>>()))
}

/// DELETE /api/formations/{id} - Supprimer, détache vidéos et parcours (auteur ou ADMIN)
#[delete("/{id}")]
pub async fn delete_formation(
    auth_user: AuthUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> AppResult<HttpResponse> {
    let formation = find_formation(db.get_ref(), path.into_inner()).await?;
    if !auth_user.can_manage(formation.author_id) {
        return Err(AppError::Forbidden("Only the author or an admin can delete this formation".into()));
    }

    cascade::delete_formation(db.get_ref(), formation.id).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub fn formations_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/formations")
            .service(list_formations)
            .service(create_formation)
            .service(get_formation_videos)
            .service(get_formation)
            .service(set_formation_videos)
            .service(update_formation)
            .service(delete_formation)
    );
}
