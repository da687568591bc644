use std::collections::HashSet;

use rust_decimal::Decimal;
use sea_orm::*;

use crate::error::{AppError, AppResult};
use crate::models::enums::ContentType;
use crate::models::{articles, categories, formations, parcours, videos};
use crate::utils::slug::{slugify, unique_slug};

/// Vue commune d'un article, d'une vidéo ou d'une formation : ce qu'il faut
/// pour décider de l'accès, acheter, commenter ou noter.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentRef {
    pub content_type: ContentType,
    pub id: i32,
    pub title: String,
    pub author_id: i32,
    pub is_premium: bool,
    pub price: Decimal,
}

impl From<articles::Model> for ContentRef {
    fn from(a: articles::Model) -> Self {
        ContentRef {
            content_type: ContentType::Article,
            id: a.id,
            title: a.title,
            author_id: a.author_id,
            is_premium: a.is_premium,
            price: a.price,
        }
    }
}

impl From<videos::Model> for ContentRef {
    fn from(v: videos::Model) -> Self {
        ContentRef {
            content_type: ContentType::Video,
            id: v.id,
            title: v.title,
            author_id: v.author_id,
            is_premium: v.is_premium,
            price: v.price,
        }
    }
}

impl From<formations::Model> for ContentRef {
    fn from(f: formations::Model) -> Self {
        ContentRef {
            content_type: ContentType::Formation,
            id: f.id,
            title: f.title,
            author_id: f.author_id,
            is_premium: f.is_premium,
            price: f.price,
        }
    }
}

pub async fn find_content<C: ConnectionTrait>(
    conn: &C,
    content_type: ContentType,
    id: i32,
) -> Result<Option<ContentRef>, DbErr> {
    let found = match content_type {
        ContentType::Article => articles::Entity::find_by_id(id).one(conn).await?.map(ContentRef::from),
        ContentType::Video => videos::Entity::find_by_id(id).one(conn).await?.map(ContentRef::from),
        ContentType::Formation => formations::Entity::find_by_id(id).one(conn).await?.map(ContentRef::from),
    };
    Ok(found)
}

/// Table dans laquelle un slug doit être unique.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SlugScope {
    Content(ContentType),
    Parcours,
}

impl From<ContentType> for SlugScope {
    fn from(content_type: ContentType) -> Self {
        SlugScope::Content(content_type)
    }
}

/// Slug libre pour un titre dans la table visée.
/// `exclude_id` : ligne en cours de renommage, dont le slug actuel reste disponible.
pub async fn available_slug<C: ConnectionTrait>(
    conn: &C,
    scope: impl Into<SlugScope>,
    title: &str,
    exclude_id: Option<i32>,
) -> Result<String, DbErr> {
    let scope = scope.into();
    let mut base = slugify(title);
    if base.is_empty() {
        base = match scope {
            SlugScope::Content(_) => "contenu",
            SlugScope::Parcours => "parcours",
        }
        .to_string();
    }
    let prefix = format!("{}%", base);
    let exclude_id = exclude_id.unwrap_or(0);

    let taken: HashSet<String> = match scope {
        SlugScope::Content(ContentType::Article) => articles::Entity::find()
            .filter(articles::Column::Slug.like(&prefix))
            .filter(articles::Column::Id.ne(exclude_id))
            .all(conn)
            .await?
            .into_iter()
            .map(|a| a.slug)
            .collect(),
        SlugScope::Content(ContentType::Video) => videos::Entity::find()
            .filter(videos::Column::Slug.like(&prefix))
            .filter(videos::Column::Id.ne(exclude_id))
            .all(conn)
            .await?
            .into_iter()
            .map(|v| v.slug)
            .collect(),
        SlugScope::Content(ContentType::Formation) => formations::Entity::find()
            .filter(formations::Column::Slug.like(&prefix))
            .filter(formations::Column::Id.ne(exclude_id))
            .all(conn)
            .await?
            .into_iter()
            .map(|f| f.slug)
            .collect(),
        SlugScope::Parcours => parcours::Entity::find()
            .filter(parcours::Column::Slug.like(&prefix))
            .filter(parcours::Column::Id.ne(exclude_id))
            .all(conn)
            .await?
            .into_iter()
            .map(|p| p.slug)
            .collect(),
    };

    Ok(unique_slug(&base, &taken))
}

/// Vérifie qu'une catégorie référencée existe.
pub async fn ensure_category<C: ConnectionTrait>(conn: &C, category_id: Option<i32>) -> AppResult<()> {
    if let Some(id) = category_id {
        if categories::Entity::find_by_id(id).one(conn).await?.is_none() {
            return Err(AppError::BadRequest(format!("Unknown category {}", id)));
        }
    }
    Ok(())
}

pub fn ensure_price(price: Decimal) -> AppResult<()> {
    if price.is_sign_negative() {
        return Err(AppError::BadRequest("Price must be positive".into()));
    }
    Ok(())
}

/// Liste ordonnée -> (id, position) en partant de 0. Refuse les doublons.
pub fn ordered_links(ids: &[i32]) -> AppResult<Vec<(i32, i32)>> {
    let mut seen = HashSet::new();
    ids.iter()
        .enumerate()
        .map(|(position, &id)| {
            if !seen.insert(id) {
                return Err(AppError::BadRequest(format!("Duplicate id {} in ordered list", id)));
            }
            Ok((id, position as i32))
        })
        .collect()
}
