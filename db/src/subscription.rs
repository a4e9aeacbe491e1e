use chrono::{DateTime, Utc};
use common::error::{AppError, Res};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    dtos::subscription::{GatewaySubscriptionUpdate, SubscriptionCreateRequest},
    models::subscription::{ActiveSubscription, SubscriptionTier, TierPrice, UserSubscription},
};

pub async fn get_active_tiers<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
) -> Res<Vec<SubscriptionTier>> {
    sqlx::query_as::<_, SubscriptionTier>(
        "SELECT * FROM subscription_tiers WHERE is_active ORDER BY price_cents",
    )
    .fetch_all(executor)
    .await
    .map_err(AppError::from)
}

pub async fn get_tier_prices<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    tier_id: Uuid,
) -> Res<Vec<TierPrice>> {
    sqlx::query_as::<_, TierPrice>("SELECT * FROM tier_prices WHERE tier_id = $1")
        .bind(tier_id)
        .fetch_all(executor)
        .await
        .map_err(AppError::from)
}

/// Prices of every active tier.
pub async fn get_active_tier_prices<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
) -> Res<Vec<TierPrice>> {
    sqlx::query_as::<_, TierPrice>(
        r#"
        SELECT p.* FROM tier_prices p
        JOIN subscription_tiers t ON t.id = p.tier_id
        WHERE t.is_active
        "#,
    )
    .fetch_all(executor)
    .await
    .map_err(AppError::from)
}

pub async fn get_tier<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    tier_id: Uuid,
) -> Res<SubscriptionTier> {
    sqlx::query_as::<_, SubscriptionTier>("SELECT * FROM subscription_tiers WHERE id = $1")
        .bind(tier_id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Subscription tier {}", tier_id)))
}

/// Latest subscription of the user that is active and ends after `now`.
pub async fn get_active_subscription<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Res<Option<ActiveSubscription>> {
    sqlx::query_as::<_, ActiveSubscription>(
        r#"
        SELECT s.*, t.tier_type, t.name AS tier_name
        FROM user_subscriptions s
        JOIN subscription_tiers t ON t.id = s.tier_id
        WHERE s.user_id = $1 AND s.is_active AND s.end_date > $2
        ORDER BY s.end_date DESC
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .bind(now)
    .fetch_optional(executor)
    .await
    .map_err(AppError::from)
}

/// The subscription created for a payment, used to make activation idempotent.
pub async fn get_subscription_by_payment<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    payment_id: &str,
) -> Res<Option<UserSubscription>> {
    sqlx::query_as::<_, UserSubscription>(
        "SELECT * FROM user_subscriptions WHERE payment_id = $1",
    )
    .bind(payment_id)
    .fetch_optional(executor)
    .await
    .map_err(AppError::from)
}

/// Marks every active subscription of the user as expired at `now`.
pub async fn expire_active_subscriptions<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Res<u64> {
    let result = sqlx::query(
        r#"
        UPDATE user_subscriptions
        SET is_active = FALSE, status = 'expired', end_date = LEAST(end_date, $2)
        WHERE user_id = $1 AND is_active
        "#,
    )
    .bind(user_id)
    .bind(now)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

pub async fn expire_subscription<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    subscription_id: Uuid,
    now: DateTime<Utc>,
) -> Res<()> {
    sqlx::query(
        r#"
        UPDATE user_subscriptions
        SET is_active = FALSE, status = 'expired', end_date = $2
        WHERE id = $1
        "#,
    )
    .bind(subscription_id)
    .bind(now)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn cancel_subscription<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    subscription_id: Uuid,
    now: DateTime<Utc>,
) -> Res<UserSubscription> {
    sqlx::query_as::<_, UserSubscription>(
        r#"
        UPDATE user_subscriptions
        SET is_active = FALSE, status = 'canceled', end_date = $2
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(subscription_id)
    .bind(now)
    .fetch_optional(executor)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Subscription {}", subscription_id)))
}

pub async fn cancel_by_stripe_id<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    stripe_subscription_id: &str,
    now: DateTime<Utc>,
) -> Res<Option<UserSubscription>> {
    sqlx::query_as::<_, UserSubscription>(
        r#"
        UPDATE user_subscriptions
        SET is_active = FALSE, status = 'canceled', end_date = $2
        WHERE stripe_subscription_id = $1
        RETURNING *
        "#,
    )
    .bind(stripe_subscription_id)
    .bind(now)
    .fetch_optional(executor)
    .await
    .map_err(AppError::from)
}

pub async fn update_from_gateway<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    update: GatewaySubscriptionUpdate,
) -> Res<Option<UserSubscription>> {
    let is_active = update.status == crate::models::subscription::SubscriptionStatus::Active;
    sqlx::query_as::<_, UserSubscription>(
        r#"
        UPDATE user_subscriptions
        SET status = $2, end_date = $3, is_active = $4
        WHERE stripe_subscription_id = $1
        RETURNING *
        "#,
    )
    .bind(update.stripe_subscription_id)
    .bind(update.status)
    .bind(update.end_date)
    .bind(is_active)
    .fetch_optional(executor)
    .await
    .map_err(AppError::from)
}

pub async fn insert_subscription<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    data: SubscriptionCreateRequest,
) -> Res<UserSubscription> {
    sqlx::query_as::<_, UserSubscription>(
        r#"
        INSERT INTO user_subscriptions (
            user_id, tier_id, start_date, end_date, is_active, status,
            payment_status, payment_id, stripe_subscription_id
        )
        VALUES ($1, $2, $3, $4, TRUE, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(data.user_id)
    .bind(data.tier_id)
    .bind(data.start_date)
    .bind(data.end_date)
    .bind(data.status)
    .bind(data.payment_status)
    .bind(data.payment_id)
    .bind(data.stripe_subscription_id)
    .fetch_one(executor)
    .await
    .map_err(AppError::from)
}
