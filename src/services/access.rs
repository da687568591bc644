// ============================================================================
// ACCÈS AU CONTENU PREMIUM
// ============================================================================
//
// Un visiteur accède au contenu complet si :
//   - il l'a acheté, OU
//   - le contenu n'est pas premium, OU
//   - son rôle est PREMIUM, ADMIN ou FORMATOR
//
// Le rôle est relu en base (et l'abonnement rafraîchi) plutôt que pris
// dans le JWT, qui peut dater d'avant l'expiration de l'abonnement.
//
// ============================================================================

use std::collections::HashSet;

use sea_orm::*;

use crate::middleware::AuthUser;
use crate::models::enums::{ContentType, Role};
use crate::models::{purchases, users, videos};
use crate::services::content::ContentRef;
use crate::services::subscription;

pub fn has_access(has_purchased: bool, is_premium: bool, role: Option<Role>) -> bool {
    has_purchased || !is_premium || role.is_some_and(Role::unlocks_premium)
}

pub async fn has_purchased<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    content_type: ContentType,
    content_id: i32,
) -> Result<bool, DbErr> {
    let count = purchases::Entity::find()
        .filter(purchases::Column::UserId.eq(user_id))
        .filter(purchases::Column::ContentType.eq(content_type))
        .filter(purchases::Column::ContentId.eq(content_id))
        .count(conn)
        .await?;
    Ok(count > 0)
}

/// Rôle courant du visiteur, relu en base après rafraîchissement de l'abonnement.
async fn current_role(db: &DatabaseConnection, viewer: &AuthUser) -> Result<Option<Role>, DbErr> {
    match users::Entity::find_by_id(viewer.user_id).one(db).await? {
        Some(user) => Ok(Some(subscription::refresh(db, user).await?.0.role)),
        None => Ok(None),
    }
}

/// Applique `has_access` pour un visiteur (éventuellement anonyme).
pub async fn resolve_access(
    db: &DatabaseConnection,
    viewer: Option<&AuthUser>,
    content: &ContentRef,
) -> Result<bool, DbErr> {
    if !content.is_premium {
        return Ok(true);
    }
    let Some(viewer) = viewer else {
        return Ok(false);
    };

    let role = current_role(db, viewer).await?;
    if has_access(false, true, role) {
        return Ok(true);
    }

    let purchased = has_purchased(db, viewer.user_id, content.content_type, content.id).await?;
    Ok(has_access(purchased, true, role))
}

/// Vidéos d'une formation dont le média peut être servi au visiteur.
///
/// L'accès à une formation premium ouvre toutes ses vidéos. Sinon chaque
/// vidéo premium est jugée pour elle-même (rôle, ou achat de la vidéo).
pub async fn playable_videos(
    db: &DatabaseConnection,
    viewer: Option<&AuthUser>,
    formation: &ContentRef,
    formation_access: bool,
    videos: &[videos::Model],
) -> Result<HashSet<i32>, DbErr> {
    if formation.is_premium && formation_access {
        return Ok(videos.iter().map(|v| v.id).collect());
    }

    let mut playable: HashSet<i32> = videos.iter().filter(|v| !v.is_premium).map(|v| v.id).collect();
    let locked: Vec<i32> = videos.iter().filter(|v| v.is_premium).map(|v| v.id).collect();
    let Some(viewer) = viewer else {
        return Ok(playable);
    };
    if locked.is_empty() {
        return Ok(playable);
    }

    let role = current_role(db, viewer).await?;
    if has_access(false, true, role) {
        playable.extend(locked);
        return Ok(playable);
    }

    let bought = purchases::Entity::find()
        .filter(purchases::Column::UserId.eq(viewer.user_id))
        .filter(purchases::Column::ContentType.eq(ContentType::Video))
        .filter(purchases::Column::ContentId.is_in(locked))
        .all(db)
        .await?;
    playable.extend(bought.into_iter().map(|p| p.content_id));
    Ok(playable)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_content_open_to_everyone() {
        for role in [None, Some(Role::User), Some(Role::Premium), Some(Role::Formator), Some(Role::Admin)] {
            assert!(has_access(false, false, role));
            assert!(has_access(true, false, role));
        }
    }

    #[test]
    fn test_premium_content_role_matrix() {
        // (rôle, acheté, accès attendu)
        let cases = [
            (None, false, false),
            (None, true, true),
            (Some(Role::User), false, false),
            (Some(Role::User), true, true),
            (Some(Role::Premium), false, true),
            (Some(Role::Premium), true, true),
            (Some(Role::Formator), false, true),
            (Some(Role::Formator), true, true),
            (Some(Role::Admin), false, true),
            (Some(Role::Admin), true, true),
        ];

        for (role, purchased, expected) in cases {
            assert_eq!(
                has_access(purchased, true, role),
                expected,
                "role={:?} purchased={}",
                role,
                purchased
            );
        }
    }

    #[actix_web::test]
    async fn test_anonymous_viewer_locked_out_of_premium() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let content = ContentRef {
            content_type: ContentType::Video,
            id: 1,
            title: "Intro".into(),
            author_id: 2,
            is_premium: true,
            price: rust_decimal::Decimal::new(990, 2),
        };

        assert!(!resolve_access(&db, None, &content).await.unwrap());
        assert!(resolve_access(&db, None, &ContentRef { is_premium: false, ..content }).await.unwrap());
    }

    fn video(id: i32, is_premium: bool) -> videos::Model {
        let now = chrono::Utc::now().naive_utc();
        videos::Model {
            id,
            title: format!("Vidéo {}", id),
            slug: format!("video-{}", id),
            description: String::new(),
            video_url: format!("https://cdn.knowledger.fr/{}.mp4", id),
            thumbnail_url: None,
            duration_seconds: 60,
            is_premium,
            price: rust_decimal::Decimal::new(1999, 2),
            author_id: 1,
            category_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn formation_ref(is_premium: bool) -> ContentRef {
        ContentRef {
            content_type: ContentType::Formation,
            id: 3,
            title: "Rust".into(),
            author_id: 2,
            is_premium,
            price: rust_decimal::Decimal::ZERO,
        }
    }

    #[actix_web::test]
    async fn test_free_formation_does_not_open_premium_videos() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let videos = [video(8, false), video(9, true)];

        let playable = playable_videos(&db, None, &formation_ref(false), true, &videos).await.unwrap();
        assert!(playable.contains(&8));
        assert!(!playable.contains(&9));
    }

    #[actix_web::test]
    async fn test_premium_formation_access_opens_all_videos() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let videos = [video(8, false), video(9, true)];

        let playable = playable_videos(&db, None, &formation_ref(true), true, &videos).await.unwrap();
        assert_eq!(playable.len(), 2);
    }
}
