pub mod health;
pub mod auth;
pub mod articles;
pub mod videos;
pub mod formations;
pub mod parcours;
pub mod categories;
pub mod comments;
pub mod ratings;
pub mod purchases;
pub mod subscriptions;
pub mod notifications;
pub mod history;
pub mod messages;
pub mod formator_queries;
pub mod admin;

use actix_web::web;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(health::health_check)
            .configure(auth::auth_routes)
            .configure(articles::articles_routes)
            .configure(videos::videos_routes)
            .configure(formations::formations_routes)
            .configure(parcours::parcours_routes)
            .configure(categories::categories_routes)
            .configure(comments::comments_routes)
            .configure(ratings::ratings_routes)
            .configure(purchases::purchases_routes)
            .configure(subscriptions::subscriptions_routes)
            .configure(notifications::notifications_routes)
            .configure(history::history_routes)
            .configure(messages::messages_routes)
            .configure(formator_queries::formator_queries_routes)
            .configure(admin::admin_routes)
    );
}
