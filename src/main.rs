mod config;
mod db;
mod error;
mod middleware;
mod models;
mod routes;
mod services;
mod utils;

use std::sync::Arc;

use actix_web::{middleware::{from_fn, Logger}, web, App, HttpServer};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;
use crate::services::delivery::{CodeSender, LogSender, RelaySender};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()));
        }
    };

    info!("connecting to database");
    let db = match db::establish_connection(&config.database_url).await {
        Ok(db) => db,
        Err(e) => {
            error!(error = %e, "failed to connect to database");
            return Err(std::io::Error::other(e.to_string()));
        }
    };
    info!("database connected");

    // Sans relais configuré, les codes 2FA sont seulement journalisés
    let sender: Arc<dyn CodeSender> = match &config.code_relay_url {
        Some(url) => Arc::new(RelaySender::new(url.clone())),
        None => Arc::new(LogSender),
    };

    let bind = (config.host.clone(), config.port);
    info!(host = %bind.0, port = bind.1, "starting server");

    let config = web::Data::new(config);
    let db = web::Data::new(db);
    let sender = web::Data::from(sender);

    HttpServer::new(move || {
        App::new()
            .wrap(from_fn(middleware::maintenance_guard))
            .wrap(Logger::default())
            .app_data(db.clone())
            .app_data(config.clone())
            .app_data(sender.clone())
            .configure(routes::configure_routes)
    })
        .bind(bind)?
        .run()
        .await
}
