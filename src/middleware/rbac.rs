//! Extracteurs de contrôle d'accès par rôle.
//!
//! Chacun enveloppe [`AuthUser`] et rejette la requête (403) si le rôle
//! porté par le token ne suffit pas.

use actix_web::{dev::Payload, Error, FromRequest, HttpRequest};
use futures::future::{ready, Ready};

use super::auth::{require_user, AuthUser};
use crate::error::AppError;

/// Rôle ADMIN obligatoire.
pub struct RequireAdmin(pub AuthUser);

impl FromRequest for RequireAdmin {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let result = require_user(req).and_then(|user| {
            if user.is_admin() {
                Ok(RequireAdmin(user))
            } else {
                Err(AppError::Forbidden("Admin role required".into()))
            }
        });
        ready(result.map_err(Into::into))
    }
}

/// FORMATOR ou ADMIN : rôles autorisés à publier.
pub struct RequireFormator(pub AuthUser);

impl FromRequest for RequireFormator {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let result = require_user(req).and_then(|user| {
            if user.role.can_publish() {
                Ok(RequireFormator(user))
            } else {
                Err(AppError::Forbidden("Formator or Admin role required".into()))
            }
        });
        ready(result.map_err(Into::into))
    }
}
