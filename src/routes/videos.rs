use actix_web::{delete, get, post, put, web, HttpResponse};
use chrono::{NaiveDateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::{AuthUser, MaybeAuthUser, RequireFormator};
use crate::models::dto::{ContentFilter, Gated};
use crate::models::enums::ContentType;
use crate::models::videos::{self, Entity as Videos, Column as VideoColumn};
use crate::services::content::{available_slug, ensure_category, ensure_price, ContentRef};
use crate::services::{access, cascade, history};

// Vidéo sans l'URL du média
#[derive(Debug, Serialize)]
pub struct VideoSummary {
    pub id: i32,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub thumbnail_url: Option<String>,
    pub duration_seconds: i32,
    pub is_premium: bool,
    pub price: Decimal,
    pub author_id: i32,
    pub category_id: Option<i32>,
    pub created_at: NaiveDateTime,
}

impl From<&videos::Model> for VideoSummary {
    fn from(v: &videos::Model) -> Self {
        VideoSummary {
            id: v.id,
            title: v.title.clone(),
            slug: v.slug.clone(),
            description: v.description.clone(),
            thumbnail_url: v.thumbnail_url.clone(),
            duration_seconds: v.duration_seconds,
            is_premium: v.is_premium,
            price: v.price,
            author_id: v.author_id,
            category_id: v.category_id,
            created_at: v.created_at,
        }
    }
}

#[derive(Deserialize, Validate)]
pub struct VideoRequest {
    #[validate(length(min = 3, max = 200))]
    pub title: String,
    #[validate(length(max = 1000))]
    pub description: String,
    #[validate(url)]
    pub video_url: String,
    #[validate(url)]
    pub thumbnail_url: Option<String>,
    #[validate(range(min = 0))]
    pub duration_seconds: i32,
    pub is_premium: bool,
    pub price: Decimal,
    pub category_id: Option<i32>,
}

async fn find_video(db: &DatabaseConnection, id: i32) -> AppResult<videos::Model> {
    Videos::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found("Video"))
}

/// GET /api/videos - Liste (PUBLIC)
#[get("")]
pub async fn list_videos(
    filter: web::Query<ContentFilter>,
    db: web::Data<DatabaseConnection>,
) -> AppResult<HttpResponse> {
    let mut query = Videos::find().order_by_desc(VideoColumn::CreatedAt);
    if let Some(category) = filter.category {
        query = query.filter(VideoColumn::CategoryId.eq(category));
    }
    if let Some(premium) = filter.premium {
        query = query.filter(VideoColumn::IsPremium.eq(premium));
    }

    let videos = query.all(db.get_ref()).await?;
    let response: Vec<VideoSummary> = videos.iter().map(VideoSummary::from).collect();
    Ok(HttpResponse::Ok().json(response))
}

/// GET /api/videos/{slug} - URL du média seulement avec accès (PUBLIC)
#[get("/{slug}")]
pub async fn get_video(
    path: web::Path<String>,
    viewer: MaybeAuthUser,
    db: web::Data<DatabaseConnection>,
) -> AppResult<HttpResponse> {
    let slug = path.into_inner();
    let video = Videos::find()
        .filter(VideoColumn::Slug.eq(&slug))
        .one(db.get_ref())
        .await?
        .ok_or_else(|| AppError::not_found("Video"))?;

    let viewer = viewer.0;
    let has_access = access::resolve_access(db.get_ref(), viewer.as_ref(), &ContentRef::from(video.clone())).await?;

    if let (true, Some(user)) = (has_access, &viewer) {
        history::record_view(db.get_ref(), user.user_id, ContentType::Video, video.id).await?;
    }

    Ok(HttpResponse::Ok().json(Gated {
        item: VideoSummary::from(&video),
        has_access,
        body: has_access.then_some(serde_json::json!({ "video_url": video.video_url })),
    }))
}

/// POST /api/videos - Publier (FORMATOR / ADMIN)
#[post("")]
pub async fn create_video(
    RequireFormator(author): RequireFormator,
    body: web::Json<VideoRequest>,
    db: web::Data<DatabaseConnection>,
) -> AppResult<HttpResponse> {
    body.validate()?;
    ensure_price(body.price)?;
    ensure_category(db.get_ref(), body.category_id).await?;

    let body = body.into_inner();
    let now = Utc::now().naive_utc();
    let slug = available_slug(db.get_ref(), ContentType::Video, &body.title, None).await?;

    let video = videos::ActiveModel {
        title: Set(body.title),
        slug: Set(slug),
        description: Set(body.description),
        video_url: Set(body.video_url),
        thumbnail_url: Set(body.thumbnail_url),
        duration_seconds: Set(body.duration_seconds),
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

    Ok(HttpResponse::Created().json(video))
}

/// PUT /api/videos/{id} - Modifier (auteur ou ADMIN)
#[put("/{id}")]
pub async fn update_video(
    auth_user: AuthUser,
    path: web::Path<i32>,
    body: web::Json<VideoRequest>,
    db: web::Data<DatabaseConnection>,
) -> AppResult<HttpResponse> {
    let video = find_video(db.get_ref(), path.into_inner()).await?;
    if !auth_user.can_manage(video.author_id) {
        return Err(AppError::Forbidden("Only the author or an admin can edit this video".into()));
    }

    body.validate()?;
    ensure_price(body.price)?;
    ensure_category(db.get_ref(), body.category_id).await?;
    let body = body.into_inner();

    let slug = if body.title != video.title {
        available_slug(db.get_ref(), ContentType::Video, &body.title, Some(video.id)).await?
    } else {
        video.slug.clone()
    };

    let mut active: videos::ActiveModel = video.into();
    active.title = Set(body.title);
    active.slug = Set(slug);
    active.description = Set(body.description);
    active.video_url = Set(body.video_url);
    active.thumbnail_url = Set(body.thumbnail_url);
    active.duration_seconds = Set(body.duration_seconds);
    active.is_premium = Set(body.is_premium);
    active.price = Set(body.price);
    active.category_id = Set(body.category_id);
    active.updated_at = Set(Utc::now().naive_utc());

    Ok(HttpResponse::Ok().json(active.update(db.get_ref()).await?))
}

/// DELETE /api/videos/{id} - Supprimer, retire aussi la vidéo des formations (auteur ou ADMIN)
#[delete("/{id}")]
pub async fn delete_video(
    auth_user: AuthUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> AppResult<HttpResponse> {
    let video = find_video(db.get_ref(), path.into_inner()).await?;
    if !auth_user.can_manage(video.author_id) {
        return Err(AppError::Forbidden("Only the author or an admin can delete this video".into()));
    }

    cascade::delete_video(db.get_ref(), video.id).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub fn videos_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/videos")
            .service(list_videos)
            .service(create_video)
            .service(get_video)
            .service(update_video)
            .service(delete_video)
    );
}
