use actix_web::{dev::Payload, http::header::AUTHORIZATION, web, Error, FromRequest, HttpRequest};
use futures::future::{ready, Ready};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::error::AppError;
use crate::models::enums::Role;
use crate::utils::jwt;

/// Structure qui contient les infos de l'utilisateur authentifié
/// Utilisée comme extracteur dans les routes protégées
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: i32,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Auteur de la ressource ou admin
    pub fn can_manage(&self, owner_id: i32) -> bool {
        self.is_admin() || self.user_id == owner_id
    }
}

/// Utilisateur optionnel : routes publiques dont la réponse dépend du visiteur.
/// Un header Authorization présent mais invalide est tout de même rejeté (401).
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

/// Lit le bearer token. `Ok(None)` si aucun header Authorization.
pub(crate) fn authenticate(req: &HttpRequest) -> Result<Option<AuthUser>, AppError> {
    // 1. Extraire le header Authorization
    let Some(auth_header) = req.headers().get(AUTHORIZATION) else {
        return Ok(None);
    };

    // 2. Convertir le header en string
    let auth_str = auth_header
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid Authorization header".into()))?;

    // 3. Extraire le token (format: "Bearer <token>")
    let token = auth_str.strip_prefix("Bearer ").ok_or_else(|| {
        AppError::Unauthorized("Invalid Authorization format (expected: Bearer <token>)".into())
    })?;

    // 4. Vérifier le token JWT
    let config = req
        .app_data::<web::Data<AppConfig>>()
        .ok_or_else(|| AppError::Internal("AppConfig not registered".into()))?;

    let claims = jwt::verify_token(&config.jwt_secret, token)
        .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))?;

    Ok(Some(AuthUser {
        user_id: claims.sub,
        email: claims.email,
        role: claims.role,
    }))
}

pub(crate) fn require_user(req: &HttpRequest) -> Result<AuthUser, AppError> {
    authenticate(req)?.ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))
}

impl FromRequest for AuthUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(require_user(req).map_err(Into::into))
    }
}

impl FromRequest for MaybeAuthUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate(req).map(MaybeAuthUser).map_err(Into::into))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use actix_web::test::TestRequest;

    fn bearer(role: Role) -> String {
        let config = test_config();
        let token = jwt::generate_token(&config.jwt_secret, 1, 7, "lea@knowledger.fr", role).unwrap();
        format!("Bearer {}", token)
    }

    #[actix_web::test]
    async fn test_valid_token_extracts_user() {
        let req = TestRequest::default()
            .app_data(web::Data::new(test_config()))
            .insert_header((AUTHORIZATION, bearer(Role::Premium)))
            .to_http_request();

        let user = AuthUser::extract(&req).await.unwrap();
        assert_eq!(user.user_id, 7);
        assert_eq!(user.role, Role::Premium);
    }

    #[actix_web::test]
    async fn test_missing_header_is_unauthorized() {
        let req = TestRequest::default()
            .app_data(web::Data::new(test_config()))
            .to_http_request();

        let err = AuthUser::extract(&req).await.unwrap_err();
        assert_eq!(err.as_response_error().status_code(), 401);
    }

    #[actix_web::test]
    async fn test_optional_user_without_header() {
        let req = TestRequest::default()
            .app_data(web::Data::new(test_config()))
            .to_http_request();

        let MaybeAuthUser(user) = MaybeAuthUser::extract(&req).await.unwrap();
        assert!(user.is_none());
    }

    #[actix_web::test]
    async fn test_optional_user_with_garbage_token() {
        let req = TestRequest::default()
            .app_data(web::Data::new(test_config()))
            .insert_header((AUTHORIZATION, "Bearer nope"))
            .to_http_request();

        assert!(MaybeAuthUser::extract(&req).await.is_err());
    }

    #[test]
    fn test_can_manage() {
        let author = AuthUser { user_id: 3, email: "a@b.c".into(), role: Role::Formator };
        let admin = AuthUser { user_id: 9, email: "x@y.z".into(), role: Role::Admin };
        assert!(author.can_manage(3));
        assert!(!author.can_manage(4));
        assert!(admin.can_manage(4));
    }
}
