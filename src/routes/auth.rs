use actix_web::{get, post, put, web, HttpResponse};
use chrono::{Duration, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::enums::{Role, TwoFactorChannel};
use crate::models::{two_factor_auth, users};
use crate::models::users::{Entity as Users, Column as UserColumn, ActiveModel as UserActiveModel};
use crate::services::delivery::CodeSender;
use crate::services::{subscription, two_factor};
use crate::services::two_factor::VerifyOutcome;
use crate::utils::{jwt, password};

// DTO pour l'inscription
#[derive(Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 2, max = 50))]
    pub username: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

// DTO pour la connexion
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct VerifyCodeRequest {
    pub user_id: i32,
    pub code: String,
}

#[derive(Deserialize)]
pub struct ResendCodeRequest {
    pub user_id: i32,
}

#[derive(Deserialize, Validate)]
pub struct TwoFactorSettingsRequest {
    pub enabled: bool,
    pub channel: TwoFactorChannel,
    #[validate(length(min = 6, max = 20))]
    pub phone: Option<String>,
}

// DTO pour changer le mot de passe
#[derive(Deserialize, Validate)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    #[validate(length(min = 8, max = 128))]
    pub new_password: String,
}

// Réponse après login/register
#[derive(Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user_id: i32,
    pub username: String,
    pub role: Role,
}

fn issue_token(config: &AppConfig, user: &users::Model) -> AppResult<AuthResponse> {
    let token = jwt::generate_token(&config.jwt_secret, config.jwt_ttl_hours, user.id, &user.email, user.role)
        .map_err(|e| AppError::Internal(format!("Failed to generate token: {}", e)))?;

    Ok(AuthResponse {
        token,
        user_id: user.id,
        username: user.username.clone(),
        role: user.role,
    })
}

async fn find_user(db: &DatabaseConnection, user_id: i32) -> AppResult<users::Model> {
    Users::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found("User"))
}

/// POST /auth/register - Créer un compte (PUBLIC)
#[post("/register")]
pub async fn register(
    body: web::Json<RegisterRequest>,
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
) -> AppResult<HttpResponse> {
    body.validate()?;
    let email = body.email.trim().to_lowercase();

    // 1. Vérifier si l'email est déjà pris
    let existing = Users::find()
        .filter(UserColumn::Email.eq(&email))
        .one(db.get_ref())
        .await?;
    if existing.is_some() {
        return Err(AppError::Conflict("Email already registered".into()));
    }

    // 2. Hash le mot de passe
    let password_hash = password::hash_password(&body.password)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;

    // 3. Créer l'utilisateur
    let user = UserActiveModel {
        email: Set(email),
        username: Set(body.username.trim().to_string()),
        password_hash: Set(password_hash),
        role: Set(Role::User),
        phone: Set(None),
        avatar_url: Set(None),
        two_factor_enabled: Set(false),
        two_factor_channel: Set(TwoFactorChannel::Email),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db.get_ref())
    .await?;

    info!(user_id = user.id, "user registered");

    // 4. Générer le JWT
    Ok(HttpResponse::Created().json(issue_token(&config, &user)?))
}

/// POST /auth/login - Se connecter (PUBLIC)
/// Avec la 2FA activée, renvoie `two_factor_required` et envoie un code au lieu du token.
#[post("/login")]
pub async fn login(
    body: web::Json<LoginRequest>,
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    sender: web::Data<dyn CodeSender>,
) -> AppResult<HttpResponse> {
    let invalid = || AppError::Unauthorized("Invalid email or password".into());

    // 1. Trouver l'utilisateur
    let user = Users::find()
        .filter(UserColumn::Email.eq(body.email.trim().to_lowercase()))
        .one(db.get_ref())
        .await?
        .ok_or_else(invalid)?;

    // 2. Vérifier le mot de passe
    let is_valid = password::verify_password(&body.password, &user.password_hash)
        .map_err(|e| AppError::Internal(format!("Password verification error: {}", e)))?;
    if !is_valid {
        return Err(invalid());
    }

    // 3. Second facteur
    if user.two_factor_enabled {
        let ttl = Duration::minutes(config.two_factor_ttl_minutes);
        let expires_at = two_factor::issue(db.get_ref(), sender.get_ref(), &user, ttl).await?;
        let (channel, _) = two_factor::destination(&user);

        return Ok(HttpResponse::Ok().json(serde_json::json!({
            "two_factor_required": true,
            "user_id": user.id,
            "channel": channel,
            "expires_at": expires_at,
        })));
    }

    Ok(HttpResponse::Ok().json(issue_token(&config, &user)?))
}

/// POST /auth/2fa/verify - Échanger un code 2FA contre un token (PUBLIC)
#[post("/2fa/verify")]
pub async fn verify_code(
    body: web::Json<VerifyCodeRequest>,
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
) -> AppResult<HttpResponse> {
    let outcome = two_factor::verify(db.get_ref(), body.user_id, &body.code, Utc::now().naive_utc()).await?;

    match outcome {
        VerifyOutcome::Valid => {
            let user = find_user(db.get_ref(), body.user_id).await?;
            Ok(HttpResponse::Ok().json(issue_token(&config, &user)?))
        }
        VerifyOutcome::Invalid => Err(AppError::Unauthorized("Invalid code".into())),
        VerifyOutcome::Expired => Err(AppError::Unauthorized("Code expired".into())),
        VerifyOutcome::Missing => Err(AppError::Unauthorized("No pending code".into())),
    }
}

/// POST /auth/2fa/resend - Renvoyer un code, seulement si une connexion est en attente (PUBLIC)
#[post("/2fa/resend")]
pub async fn resend_code(
    body: web::Json<ResendCodeRequest>,
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    sender: web::Data<dyn CodeSender>,
) -> AppResult<HttpResponse> {
    let pending = two_factor_auth::Entity::find()
        .filter(two_factor_auth::Column::UserId.eq(body.user_id))
        .one(db.get_ref())
        .await?;
    if pending.is_none() {
        return Err(AppError::BadRequest("No pending login for this user".into()));
    }

    let user = find_user(db.get_ref(), body.user_id).await?;
    let ttl = Duration::minutes(config.two_factor_ttl_minutes);
    let expires_at = two_factor::issue(db.get_ref(), sender.get_ref(), &user, ttl).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "expires_at": expires_at,
    })))
}

/// PUT /auth/2fa - Activer/désactiver la 2FA et choisir le canal (PROTÉGÉE)
#[put("/2fa")]
pub async fn update_two_factor(
    auth_user: AuthUser,
    body: web::Json<TwoFactorSettingsRequest>,
    db: web::Data<DatabaseConnection>,
) -> AppResult<HttpResponse> {
    body.validate()?;
    let user = find_user(db.get_ref(), auth_user.user_id).await?;

    let phone = body.phone.clone().or_else(|| user.phone.clone());
    if body.enabled && body.channel == TwoFactorChannel::Sms && phone.is_none() {
        return Err(AppError::BadRequest("A phone number is required for SMS codes".into()));
    }

    let mut active: UserActiveModel = user.into();
    active.two_factor_enabled = Set(body.enabled);
    active.two_factor_channel = Set(body.channel);
    active.phone = Set(phone);
    let user = active.update(db.get_ref()).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "two_factor_enabled": user.two_factor_enabled,
        "channel": user.two_factor_channel,
    })))
}

/// GET /auth/me - Profil courant + abonnement rafraîchi (PROTÉGÉE)
#[get("/me")]
pub async fn me(
    auth_user: AuthUser,
    db: web::Data<DatabaseConnection>,
) -> AppResult<HttpResponse> {
    let user = find_user(db.get_ref(), auth_user.user_id).await?;
    let (user, subscription) = subscription::refresh(db.get_ref(), user).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "user": user,
        "subscription": subscription,
    })))
}

/// POST /auth/change-password - Changer son mot de passe (PROTÉGÉE)
#[post("/change-password")]
pub async fn change_password(
    auth_user: AuthUser,
    body: web::Json<ChangePasswordRequest>,
    db: web::Data<DatabaseConnection>,
) -> AppResult<HttpResponse> {
    body.validate()?;

    // 1. Récupérer l'utilisateur
    let user = find_user(db.get_ref(), auth_user.user_id).await?;

    // 2. Vérifier l'ancien mot de passe
    let is_valid = password::verify_password(&body.current_password, &user.password_hash)
        .map_err(|e| AppError::Internal(format!("Password verification error: {}", e)))?;
    if !is_valid {
        return Err(AppError::Unauthorized("Current password is incorrect".into()));
    }

    // 3. Hasher le nouveau mot de passe
    let new_password_hash = password::hash_password(&body.new_password)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;

    // 4. Mettre à jour le mot de passe dans la BD
    let mut active_model: UserActiveModel = user.into();
    active_model.password_hash = Set(new_password_hash);
    active_model.update(db.get_ref()).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Password changed successfully"
    })))
}

pub fn auth_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .service(register)
            .service(login)
            .service(verify_code)
            .service(resend_code)
            .service(update_two_factor)
            .service(me)
            .service(change_password)
    );
}
