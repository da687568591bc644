// ============================================================================
// SUPPRESSIONS EN CASCADE
// ============================================================================
//
// Ordre fixe, lignes dépendantes d'abord, parent en dernier.
// Chaque suppression publique tourne dans UNE transaction : si une étape
// échoue, rien n'est supprimé.
//
//   contenu   : comments, ratings, history, purchases
//   vidéo     : + video_formations (video_id)
//   formation : + video_formations (formation_id), parcours_formations
//   user      : contenus écrits (cascade ci-dessus), parcours écrits, puis
//               comments, ratings, history, purchases, notifications,
//               subscriptions, two_factor_auth, formator_queries, todos
//
// ============================================================================

use sea_orm::*;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::enums::ContentType;
use crate::models::{
    articles, comments, formations, formator_queries, history, notifications, parcours,
    parcours_formations, purchases, ratings, subscriptions, todos, two_factor_auth, users,
    video_formations, videos,
};

pub async fn delete_article(db: &DatabaseConnection, id: i32) -> AppResult<()> {
    let txn = db.begin().await?;
    if !remove_content(&txn, ContentType::Article, id).await? {
        return Err(AppError::not_found("Article"));
    }
    txn.commit().await?;
    info!(article_id = id, "article deleted");
    Ok(())
}

pub async fn delete_video(db: &DatabaseConnection, id: i32) -> AppResult<()> {
    let txn = db.begin().await?;
    if !remove_content(&txn, ContentType::Video, id).await? {
        return Err(AppError::not_found("Video"));
    }
    txn.commit().await?;
    info!(video_id = id, "video deleted");
    Ok(())
}

pub async fn delete_formation(db: &DatabaseConnection, id: i32) -> AppResult<()> {
    let txn = db.begin().await?;
    if !remove_content(&txn, ContentType::Formation, id).await? {
        return Err(AppError::not_found("Formation"));
    }
    txn.commit().await?;
    info!(formation_id = id, "formation deleted");
    Ok(())
}

pub async fn delete_parcours(db: &DatabaseConnection, id: i32) -> AppResult<()> {
    let txn = db.begin().await?;
    if !remove_parcours(&txn, id).await? {
        return Err(AppError::not_found("Parcours"));
    }
    txn.commit().await?;
    Ok(())
}

pub async fn delete_user(db: &DatabaseConnection, id: i32) -> AppResult<()> {
    let txn = db.begin().await?;

    // 1. Contenus écrits par l'utilisateur
    let article_ids: Vec<i32> = articles::Entity::find()
        .filter(articles::Column::AuthorId.eq(id))
        .all(&txn)
        .await?
        .into_iter()
        .map(|a| a.id)
        .collect();
    for article_id in article_ids {
        remove_content(&txn, ContentType::Article, article_id).await?;
    }

    let video_ids: Vec<i32> = videos::Entity::find()
        .filter(videos::Column::AuthorId.eq(id))
        .all(&txn)
        .await?
        .into_iter()
        .map(|v| v.id)
        .collect();
    for video_id in video_ids {
        remove_content(&txn, ContentType::Video, video_id).await?;
    }

    let formation_ids: Vec<i32> = formations::Entity::find()
        .filter(formations::Column::AuthorId.eq(id))
        .all(&txn)
        .await?
        .into_iter()
        .map(|f| f.id)
        .collect();
    for formation_id in formation_ids {
        remove_content(&txn, ContentType::Formation, formation_id).await?;
    }

    let parcours_ids: Vec<i32> = parcours::Entity::find()
        .filter(parcours::Column::AuthorId.eq(id))
        .all(&txn)
        .await?
        .into_iter()
        .map(|p| p.id)
        .collect();
    for parcours_id in parcours_ids {
        remove_parcours(&txn, parcours_id).await?;
    }

    // 2. Lignes rattachées à l'utilisateur
    comments::Entity::delete_many().filter(comments::Column::UserId.eq(id)).exec(&txn).await?;
    ratings::Entity::delete_many().filter(ratings::Column::UserId.eq(id)).exec(&txn).await?;
    history::Entity::delete_many().filter(history::Column::UserId.eq(id)).exec(&txn).await?;
    purchases::Entity::delete_many().filter(purchases::Column::UserId.eq(id)).exec(&txn).await?;
    notifications::Entity::delete_many().filter(notifications::Column::UserId.eq(id)).exec(&txn).await?;
    subscriptions::Entity::delete_many().filter(subscriptions::Column::UserId.eq(id)).exec(&txn).await?;
    two_factor_auth::Entity::delete_many().filter(two_factor_auth::Column::UserId.eq(id)).exec(&txn).await?;
    formator_queries::Entity::delete_many().filter(formator_queries::Column::UserId.eq(id)).exec(&txn).await?;
    todos::Entity::delete_many().filter(todos::Column::CreatedBy.eq(id)).exec(&txn).await?;

    // 3. L'utilisateur
    let result = users::Entity::delete_by_id(id).exec(&txn).await?;
    if result.rows_affected == 0 {
        return Err(AppError::not_found("User"));
    }

    txn.commit().await?;
    info!(user_id = id, "user deleted");
    Ok(())
}

/// Supprime un contenu et ses dépendances. `false` si le contenu n'existait pas.
async fn remove_content<C: ConnectionTrait>(
    conn: &C,
    content_type: ContentType,
    id: i32,
) -> Result<bool, DbErr> {
    comments::Entity::delete_many()
        .filter(comments::Column::ContentType.eq(content_type))
        .filter(comments::Column::ContentId.eq(id))
        .exec(conn)
        .await?;
    ratings::Entity::delete_many()
        .filter(ratings::Column::ContentType.eq(content_type))
        .filter(ratings::Column::ContentId.eq(id))
        .exec(conn)
        .await?;
    history::Entity::delete_many()
        .filter(history::Column::ContentType.eq(content_type))
        .filter(history::Column::ContentId.eq(id))
        .exec(conn)
        .await?;
    purchases::Entity::delete_many()
        .filter(purchases::Column::ContentType.eq(content_type))
        .filter(purchases::Column::ContentId.eq(id))
        .exec(conn)
        .await?;

    let result = match content_type {
        ContentType::Article => articles::Entity::delete_by_id(id).exec(conn).await?,
        ContentType::Video => {
            video_formations::Entity::delete_many()
                .filter(video_formations::Column::VideoId.eq(id))
                .exec(conn)
                .await?;
            videos::Entity::delete_by_id(id).exec(conn).await?
        }
        ContentType::Formation => {
            video_formations::Entity::delete_many()
                .filter(video_formations::Column::FormationId.eq(id))
                .exec(conn)
                .await?;
            parcours_formations::Entity::delete_many()
                .filter(parcours_formations::Column::FormationId.eq(id))
                .exec(conn)
                .await?;
            formations::Entity::delete_by_id(id).exec(conn).await?
        }
    };

    Ok(result.rows_affected > 0)
}

async fn remove_parcours<C: ConnectionTrait>(conn: &C, id: i32) -> Result<bool, DbErr> {
    parcours_formations::Entity::delete_many()
        .filter(parcours_formations::Column::ParcoursId.eq(id))
        .exec(conn)
        .await?;
    let result = parcours::Entity::delete_by_id(id).exec(conn).await?;
    Ok(result.rows_affected > 0)
}
