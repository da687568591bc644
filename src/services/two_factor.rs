use chrono::{Duration, NaiveDateTime, Utc};
use rand::Rng;
use sea_orm::*;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};
use crate::models::enums::TwoFactorChannel;
use crate::models::{two_factor_auth, users};
use crate::services::delivery::{CodeDelivery, CodeSender};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    Valid,
    Invalid,
    Expired,
    Missing,
}

/// Code aléatoire à 6 chiffres, zéros initiaux conservés.
pub fn generate_code() -> String {
    format!("{:06}", rand::thread_rng().gen_range(0..1_000_000))
}

pub fn is_valid(expires_at: NaiveDateTime, now: NaiveDateTime) -> bool {
    now < expires_at
}

fn codes_match(expected: &str, submitted: &str) -> bool {
    expected.as_bytes().ct_eq(submitted.trim().as_bytes()).into()
}

/// Destination effective : SMS seulement si un numéro est renseigné.
pub fn destination(user: &users::Model) -> (TwoFactorChannel, String) {
    match (user.two_factor_channel, &user.phone) {
        (TwoFactorChannel::Sms, Some(phone)) if !phone.is_empty() => (TwoFactorChannel::Sms, phone.clone()),
        _ => (TwoFactorChannel::Email, user.email.clone()),
    }
}

/// Émet un nouveau code (remplace le précédent) et l'envoie.
pub async fn issue(
    db: &DatabaseConnection,
    sender: &dyn CodeSender,
    user: &users::Model,
    ttl: Duration,
) -> AppResult<NaiveDateTime> {
    let code = generate_code();
    let now = Utc::now().naive_utc();
    let expires_at = now + ttl;

    let existing = two_factor_auth::Entity::find()
        .filter(two_factor_auth::Column::UserId.eq(user.id))
        .one(db)
        .await?;

    match existing {
        Some(row) => {
            let mut active: two_factor_auth::ActiveModel = row.into();
            active.code = Set(code.clone());
            active.expires_at = Set(expires_at);
            active.created_at = Set(now);
            active.update(db).await?;
        }
        None => {
            two_factor_auth::ActiveModel {
                user_id: Set(user.id),
                code: Set(code.clone()),
                expires_at: Set(expires_at),
                created_at: Set(now),
                ..Default::default()
            }
            .insert(db)
            .await?;
        }
    }

    let (channel, to) = destination(user);
    sender
        .send(&CodeDelivery { channel, to, code })
        .await
        .map_err(|e| AppError::Internal(format!("Failed to deliver 2FA code: {}", e)))?;

    debug!(user_id = user.id, ?channel, "2FA code sent");
    Ok(expires_at)
}

/// Vérifie le code soumis. Un code expiré ou valide est consommé.
pub async fn verify(
    db: &DatabaseConnection,
    user_id: i32,
    submitted: &str,
    now: NaiveDateTime,
) -> Result<VerifyOutcome, DbErr> {
    let Some(row) = two_factor_auth::Entity::find()
        .filter(two_factor_auth::Column::UserId.eq(user_id))
        .one(db)
        .await?
    else {
        return Ok(VerifyOutcome::Missing);
    };

    if !is_valid(row.expires_at, now) {
        two_factor_auth::Entity::delete_by_id(row.id).exec(db).await?;
        return Ok(VerifyOutcome::Expired);
    }

    if !codes_match(&row.code, submitted) {
        warn!(user_id, "wrong 2FA code");
        return Ok(VerifyOutcome::Invalid);
    }

    two_factor_auth::Entity::delete_by_id(row.id).exec(db).await?;
    Ok(VerifyOutcome::Valid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::Role;
    use crate::services::delivery::testing::RecordingSender;

    fn user(channel: TwoFactorChannel, phone: Option<&str>) -> users::Model {
        users::Model {
            id: 5,
            email: "zoe@knowledger.fr".into(),
            username: "zoe".into(),
            password_hash: String::new(),
            role: Role::User,
            phone: phone.map(str::to_string),
            avatar_url: None,
            two_factor_enabled: true,
            two_factor_channel: channel,
            created_at: Utc::now().naive_utc(),
        }
    }

    fn code_row(code: &str, expires_at: NaiveDateTime) -> two_factor_auth::Model {
        two_factor_auth::Model {
            id: 1,
            user_id: 5,
            code: code.into(),
            expires_at,
            created_at: expires_at - Duration::minutes(10),
        }
    }

    #[test]
    fn test_generate_code_is_six_digits() {
        for _ in 0..200 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_expiry_is_strict() {
        let now = Utc::now().naive_utc();
        assert!(is_valid(now + Duration::seconds(1), now));
        assert!(!is_valid(now, now));
        assert!(!is_valid(now - Duration::seconds(1), now));
    }

    #[test]
    fn test_destination_falls_back_to_email() {
        assert_eq!(destination(&user(TwoFactorChannel::Sms, Some("+33600000000"))).0, TwoFactorChannel::Sms);
        assert_eq!(
            destination(&user(TwoFactorChannel::Sms, None)),
            (TwoFactorChannel::Email, "zoe@knowledger.fr".to_string())
        );
        assert_eq!(destination(&user(TwoFactorChannel::Email, Some("+33600000000"))).0, TwoFactorChannel::Email);
    }

    #[actix_web::test]
    async fn test_issue_inserts_and_sends() {
        let now = Utc::now().naive_utc();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<two_factor_auth::Model>::new()])
            .append_query_results([vec![code_row("000000", now + Duration::minutes(10))]])
            .into_connection();
        let sender = RecordingSender::default();

        let expires_at = issue(&db, &sender, &user(TwoFactorChannel::Email, None), Duration::minutes(10))
            .await
            .unwrap();

        assert!(expires_at > now);
        let sent = sender.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "zoe@knowledger.fr");
        assert_eq!(sent[0].code.len(), 6);
    }

    #[actix_web::test]
    async fn test_verify_outcomes() {
        let now = Utc::now().naive_utc();
        let exec = || MockExecResult { last_insert_id: 0, rows_affected: 1 };

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<two_factor_auth::Model>::new()])
            .into_connection();
        assert_eq!(verify(&db, 5, "123456", now).await.unwrap(), VerifyOutcome::Missing);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![code_row("123456", now + Duration::minutes(5))]])
            .into_connection();
        assert_eq!(verify(&db, 5, "654321", now).await.unwrap(), VerifyOutcome::Invalid);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![code_row("123456", now - Duration::seconds(1))]])
            .append_exec_results([exec()])
            .into_connection();
        assert_eq!(verify(&db, 5, "123456", now).await.unwrap(), VerifyOutcome::Expired);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![code_row("012345", now + Duration::minutes(5))]])
            .append_exec_results([exec()])
            .into_connection();
        assert_eq!(verify(&db, 5, " 012345 ", now).await.unwrap(), VerifyOutcome::Valid);
    }
}
