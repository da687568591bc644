//! Mode maintenance (`admin_settings.maintenance_mode`).
//!
//! Pendant la maintenance, les lectures et la connexion restent ouvertes,
//! les écritures sont réservées aux ADMIN (503 pour les autres).

use actix_web::{
    body::MessageBody,
    dev::{ServiceRequest, ServiceResponse},
    http::Method,
    middleware::Next,
    web, Error,
};
use sea_orm::DatabaseConnection;

use super::auth::authenticate;
use crate::error::AppError;
use crate::services::subscription::load_settings;

// Connexion et 2FA restent ouvertes
const LOGIN_PATHS: [&str; 3] = ["/api/auth/login", "/api/auth/2fa/verify", "/api/auth/2fa/resend"];

fn is_read_only(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

pub async fn maintenance_guard(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    if is_read_only(req.method()) || LOGIN_PATHS.contains(&req.path()) {
        return next.call(req).await;
    }

    if let Some(db) = req.app_data::<web::Data<DatabaseConnection>>() {
        let settings = load_settings(db.get_ref()).await.map_err(AppError::from)?;
        if settings.maintenance_mode {
            let is_admin = authenticate(req.request())?.is_some_and(|user| user.is_admin());
            if !is_admin {
                return Err(AppError::Unavailable("Site under maintenance, try again later".into()).into());
            }
        }
    }

    next.call(req).await
}
