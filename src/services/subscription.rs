use chrono::{Duration, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::*;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::enums::{Role, SubscriptionPlan, SubscriptionStatus};
use crate::models::{admin_settings, subscriptions, users};
use crate::services::notification::notify;

pub fn period_end(plan: SubscriptionPlan, from: NaiveDateTime) -> NaiveDateTime {
    match plan {
        SubscriptionPlan::Monthly => from + Duration::days(30),
        SubscriptionPlan::Yearly => from + Duration::days(365),
    }
}

/// Statut effectif à l'instant `now` : ACTIVE / CANCELED passés la fin de période deviennent EXPIRED.
pub fn evaluate(status: SubscriptionStatus, period_end: NaiveDateTime, now: NaiveDateTime) -> SubscriptionStatus {
    match status {
        SubscriptionStatus::Active | SubscriptionStatus::Canceled if now >= period_end => SubscriptionStatus::Expired,
        other => other,
    }
}

pub fn price_for(plan: SubscriptionPlan, settings: &admin_settings::Model) -> Decimal {
    match plan {
        SubscriptionPlan::Monthly => settings.monthly_price,
        SubscriptionPlan::Yearly => settings.yearly_price,
    }
}

/// Réglages par défaut si la ligne admin_settings n'a pas encore été créée.
pub fn default_settings() -> admin_settings::Model {
    admin_settings::Model {
        id: admin_settings::SETTINGS_ID,
        site_name: "KnowLedger".to_string(),
        monthly_price: Decimal::new(999, 2),
        yearly_price: Decimal::new(9990, 2),
        maintenance_mode: false,
        updated_at: Utc::now().naive_utc(),
    }
}

pub async fn load_settings<C: ConnectionTrait>(conn: &C) -> Result<admin_settings::Model, DbErr> {
    Ok(admin_settings::Entity::find_by_id(admin_settings::SETTINGS_ID)
        .one(conn)
        .await?
        .unwrap_or_else(default_settings))
}

/// Souscrit (ou renouvelle) un abonnement et passe un compte USER en PREMIUM.
pub async fn subscribe(
    db: &DatabaseConnection,
    user_id: i32,
    plan: SubscriptionPlan,
) -> AppResult<subscriptions::Model> {
    let now = Utc::now().naive_utc();
    let txn = db.begin().await?;

    let user = users::Entity::find_by_id(user_id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

    let settings = load_settings(&txn).await?;
    let amount = price_for(plan, &settings);

    let existing = subscriptions::Entity::find()
        .filter(subscriptions::Column::UserId.eq(user_id))
        .one(&txn)
        .await?;

    let subscription = match existing {
        Some(current) => {
            if evaluate(current.status, current.current_period_end, now) == SubscriptionStatus::Active {
                return Err(AppError::Conflict("Subscription already active".into()));
            }
            let mut active: subscriptions::ActiveModel = current.into();
            active.plan = Set(plan);
            active.status = Set(SubscriptionStatus::Active);
            active.amount = Set(amount);
            active.current_period_end = Set(period_end(plan, now));
            active.updated_at = Set(now);
            active.update(&txn).await?
        }
        None => {
            subscriptions::ActiveModel {
                user_id: Set(user_id),
                plan: Set(plan),
                status: Set(SubscriptionStatus::Active),
                amount: Set(amount),
                current_period_end: Set(period_end(plan, now)),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(&txn)
            .await?
        }
    };

    if user.role == Role::User {
        let mut active: users::ActiveModel = user.into();
        active.role = Set(Role::Premium);
        active.update(&txn).await?;
    }

    notify(
        &txn,
        user_id,
        "Abonnement activé",
        &format!("Votre abonnement premium est actif jusqu'au {}.", subscription.current_period_end.format("%d/%m/%Y")),
    )
    .await?;

    txn.commit().await?;
    info!(user_id, ?plan, "subscription activated");
    Ok(subscription)
}

/// ACTIVE -> CANCELED. L'accès premium reste ouvert jusqu'à la fin de période.
pub async fn cancel(db: &DatabaseConnection, user_id: i32) -> AppResult<subscriptions::Model> {
    let now = Utc::now().naive_utc();
    let current = subscriptions::Entity::find()
        .filter(subscriptions::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found("Subscription"))?;

    if evaluate(current.status, current.current_period_end, now) != SubscriptionStatus::Active {
        return Err(AppError::BadRequest("Subscription is not active".into()));
    }

    let mut active: subscriptions::ActiveModel = current.into();
    active.status = Set(SubscriptionStatus::Canceled);
    active.updated_at = Set(now);
    Ok(active.update(db).await?)
}

/// Relit l'état de l'abonnement, enregistre son expiration et rétrograde
/// PREMIUM -> USER quand la période est terminée.
pub async fn refresh(
    db: &DatabaseConnection,
    user: users::Model,
) -> Result<(users::Model, Option<subscriptions::Model>), DbErr> {
    let now = Utc::now().naive_utc();
    let Some(current) = subscriptions::Entity::find()
        .filter(subscriptions::Column::UserId.eq(user.id))
        .one(db)
        .await?
    else {
        return Ok((user, None));
    };

    let effective = evaluate(current.status, current.current_period_end, now);
    if effective == current.status {
        return Ok((user, Some(current)));
    }

    let txn = db.begin().await?;

    let mut sub: subscriptions::ActiveModel = current.into();
    sub.status = Set(effective);
    sub.updated_at = Set(now);
    let current = sub.update(&txn).await?;

    let user = if user.role == Role::Premium {
        let mut active: users::ActiveModel = user.into();
        active.role = Set(Role::User);
        let user = active.update(&txn).await?;
        notify(&txn, user.id, "Abonnement expiré", "Votre abonnement premium est arrivé à échéance.").await?;
        user
    } else {
        user
    };

    txn.commit().await?;
    info!(user_id = user.id, "subscription expired");
    Ok((user, Some(current)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(day: u32) -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2026, 1, day)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_period_end() {
        assert_eq!(period_end(SubscriptionPlan::Monthly, at(1)), at(31));
        assert_eq!(period_end(SubscriptionPlan::Yearly, at(1)) - at(1), Duration::days(365));
    }

    #[test]
    fn test_evaluate_transitions() {
        let end = at(10);
        assert_eq!(evaluate(SubscriptionStatus::Active, end, at(9)), SubscriptionStatus::Active);
        assert_eq!(evaluate(SubscriptionStatus::Active, end, at(10)), SubscriptionStatus::Expired);
        assert_eq!(evaluate(SubscriptionStatus::Canceled, end, at(9)), SubscriptionStatus::Canceled);
        assert_eq!(evaluate(SubscriptionStatus::Canceled, end, at(11)), SubscriptionStatus::Expired);
        assert_eq!(evaluate(SubscriptionStatus::Expired, end, at(1)), SubscriptionStatus::Expired);
    }

    #[test]
    fn test_price_for_plan() {
        let settings = default_settings();
        assert_eq!(price_for(SubscriptionPlan::Monthly, &settings), Decimal::new(999, 2));
        assert_eq!(price_for(SubscriptionPlan::Yearly, &settings), Decimal::new(9990, 2));
    }

    fn premium_user() -> users::Model {
        users::Model {
            id: 3,
            email: "max@knowledger.fr".into(),
            username: "max".into(),
            password_hash: String::new(),
            role: Role::Premium,
            phone: None,
            avatar_url: None,
            two_factor_enabled: false,
            two_factor_channel: crate::models::enums::TwoFactorChannel::Email,
            created_at: at(1),
        }
    }

    fn subscription(status: SubscriptionStatus, end: NaiveDateTime) -> subscriptions::Model {
        subscriptions::Model {
            id: 1,
            user_id: 3,
            plan: SubscriptionPlan::Monthly,
            status,
            amount: Decimal::new(999, 2),
            current_period_end: end,
            created_at: at(1),
            updated_at: at(1),
        }
    }

    #[actix_web::test]
    async fn test_refresh_keeps_running_subscription() {
        let end = Utc::now().naive_utc() + Duration::days(3);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![subscription(SubscriptionStatus::Active, end)]])
            .into_connection();

        let (user, sub) = refresh(&db, premium_user()).await.unwrap();
        assert_eq!(user.role, Role::Premium);
        assert_eq!(sub.unwrap().status, SubscriptionStatus::Active);
    }

    #[actix_web::test]
    async fn test_refresh_demotes_expired_premium() {
        let end = Utc::now().naive_utc() - Duration::days(1);
        let mut demoted = premium_user();
        demoted.role = Role::User;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![subscription(SubscriptionStatus::Active, end)]])
            .append_query_results([vec![subscription(SubscriptionStatus::Expired, end)]])
            .append_query_results([vec![demoted]])
            .append_query_results([vec![crate::models::notifications::Model {
                id: 1,
                user_id: 3,
                title: "Abonnement expiré".into(),
                body: String::new(),
                read: false,
                created_at: end,
            }]])
            .into_connection();

        let (user, sub) = refresh(&db, premium_user()).await.unwrap();
        assert_eq!(user.role, Role::User);
        assert_eq!(sub.unwrap().status, SubscriptionStatus::Expired);
    }

    fn notification() -> crate::models::notifications::Model {
        crate::models::notifications::Model {
            id: 1,
            user_id: 3,
            title: "Abonnement activé".into(),
            body: String::new(),
            read: false,
            created_at: at(1),
        }
    }

    #[actix_web::test]
    async fn test_subscribe_twice_is_conflict() {
        let end = Utc::now().naive_utc() + Duration::days(10);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![premium_user()]])
            .append_query_results([Vec::<admin_settings::Model>::new()])
            .append_query_results([vec![subscription(SubscriptionStatus::Active, end)]])
            .into_connection();

        let err = subscribe(&db, 3, SubscriptionPlan::Monthly).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[actix_web::test]
    async fn test_subscribe_promotes_user_to_premium() {
        let end = Utc::now().naive_utc() + Duration::days(30);
        let mut user = premium_user();
        user.role = Role::User;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![user.clone()]])
            .append_query_results([Vec::<admin_settings::Model>::new()])
            .append_query_results([Vec::<subscriptions::Model>::new()])
            .append_query_results([vec![subscription(SubscriptionStatus::Active, end)]])
            .append_query_results([vec![premium_user()]])
            .append_query_results([vec![notification()]])
            .into_connection();

        let sub = subscribe(&db, 3, SubscriptionPlan::Monthly).await.unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Active);

        let log = db.into_transaction_log();
        assert_eq!(log.len(), 1);
        let sql = format!("{:?}", log[0]);
        assert!(sql.contains("PREMIUM"), "le rôle passe à PREMIUM dans la même transaction");
    }

    #[actix_web::test]
    async fn test_cancel_requires_active_subscription() {
        let end = Utc::now().naive_utc() + Duration::days(10);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![subscription(SubscriptionStatus::Canceled, end)]])
            .into_connection();

        let err = cancel(&db, 3).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[actix_web::test]
    async fn test_cancel_keeps_period_end() {
        let end = Utc::now().naive_utc() + Duration::days(10);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![subscription(SubscriptionStatus::Active, end)]])
            .append_query_results([vec![subscription(SubscriptionStatus::Canceled, end)]])
            .into_connection();

        let sub = cancel(&db, 3).await.unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Canceled);
        assert_eq!(sub.current_period_end, end);
    }
}
