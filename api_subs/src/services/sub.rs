use cache::{CacheKey, CacheStore, Entity, Ttl};
use chrono::{DateTime, Utc};
use common::{
    env_config::Config,
    error::{AppError, Res},
};
use db::{
    dtos::{
        payment::PaymentCreateRequest,
        subscription::{GatewaySubscriptionUpdate, SubscriptionCreateRequest},
    },
    models::{
        activity::ActivityAction,
        payment::PaymentRecord,
        subscription::{
            ActiveSubscription, PaymentStatus, SubscriptionStatus, SubscriptionTier,
            UserSubscription,
        },
    },
};
use serde_json::json;
use sqlx::PgPool;
use stripe::Client;
use uuid::Uuid;

use crate::{
    dtos::sub::TierView,
    entitlement::{self, Entitlement, Feature, PlanLimits, PlanUsage},
    pricing::{self, PriceCurrency, PriceQuote},
};

/// Everything the activation routine needs from a completed payment.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivationRequest {
    pub user_id: Uuid,
    pub tier_id: Uuid,
    /// Payment intent id, or the checkout session id when there is none.
    pub payment_reference: String,
    pub stripe_subscription_id: Option<String>,
    pub amount_cents: Option<i64>,
    pub currency: Option<String>,
}

pub fn plan_limits(config: &Config) -> PlanLimits {
    PlanLimits {
        free: config.limits.free_plan_limit,
        one_time: config.limits.one_time_plan_limit,
    }
}

/// Active tiers with their regional prices, cached for the long TTL.
pub async fn get_tiers(
    pool: &PgPool,
    cache: &dyn CacheStore,
    config: &Config,
) -> Res<Vec<TierView>> {
    cache::get_or_load(
        cache,
        &CacheKey::Tiers,
        Ttl::Long.duration(&config.cache),
        || async {
            let tiers = db::subscription::get_active_tiers(pool).await?;
            let prices = db::subscription::get_active_tier_prices(pool).await?;
            Ok::<_, AppError>(tiers
                .into_iter()
                .map(|tier| TierView {
                    prices: pricing::quote_all(&tier, &prices),
                    tier,
                })
                .collect())
        },
    )
    .await
}

/// A purchasable tier priced in the requested currency, or the configured
/// checkout currency when none is given.
pub async fn checkout_quote(
    pool: &PgPool,
    config: &Config,
    tier_id: Uuid,
    currency: Option<&str>,
) -> Res<(SubscriptionTier, PriceQuote)> {
    let tier = db::subscription::get_tier(pool, tier_id).await?;
    if !tier.is_active {
        return Err(AppError::NotFound("Subscription tier not found".to_string()));
    }

    let currency: PriceCurrency = currency.unwrap_or(&config.checkout_currency).parse()?;
    let prices = db::subscription::get_tier_prices(pool, tier.id).await?;
    let quote = pricing::quote(&tier, &prices, currency);
    Ok((tier, quote))
}

/// The user's valid subscription, cached for the short TTL.
pub async fn get_active_subscription(
    pool: &PgPool,
    cache: &dyn CacheStore,
    config: &Config,
    user_id: Uuid,
) -> Res<Option<ActiveSubscription>> {
    let now = Utc::now();
    let cached: Option<ActiveSubscription> = cache::get_or_load(
        cache,
        &CacheKey::ActiveSubscription(user_id),
        Ttl::Short.duration(&config.cache),
        || db::subscription::get_active_subscription(pool, user_id, now),
    )
    .await?;

    // a cached entry may have run out since it was stored
    Ok(cached.filter(|s| s.is_valid_at(now)))
}

pub async fn plan_usage(
    pool: &PgPool,
    user_id: Uuid,
    subscription: Option<&ActiveSubscription>,
) -> Res<PlanUsage> {
    let total = db::meal_plan::count_meal_plans(pool, user_id, None).await?;
    let since_subscription_start = match subscription {
        Some(active) => {
            db::meal_plan::count_meal_plans(pool, user_id, Some(active.subscription.start_date))
                .await?
        }
        None => 0,
    };
    Ok(PlanUsage {
        total,
        since_subscription_start,
    })
}

/// Loads what the decision needs and evaluates it.
pub async fn check_entitlement(
    pool: &PgPool,
    cache: &dyn CacheStore,
    config: &Config,
    user_id: Uuid,
    feature: Feature,
) -> Res<Entitlement> {
    if feature.allowed_tiers().is_none() {
        return Ok(Entitlement::Allow);
    }

    let subscription = get_active_subscription(pool, cache, config, user_id).await?;
    let usage = if feature == Feature::MealPlanning {
        plan_usage(pool, user_id, subscription.as_ref()).await?
    } else {
        PlanUsage::default()
    };

    Ok(entitlement::decide(
        feature,
        subscription.as_ref(),
        usage,
        &plan_limits(config),
        Utc::now(),
    ))
}

/// Replaces the user's active subscriptions with a new one for the paid tier.
pub async fn activate_subscription(
    pool: &PgPool,
    cache: &dyn CacheStore,
    req: ActivationRequest,
) -> Res<UserSubscription> {
    activate_subscription_at(pool, cache, req, Utc::now()).await
}

pub async fn activate_subscription_at(
    pool: &PgPool,
    cache: &dyn CacheStore,
    req: ActivationRequest,
    now: DateTime<Utc>,
) -> Res<UserSubscription> {
    let mut tx = pool.begin().await?;

    // a redelivered webhook must not replace the plan it already created
    if let Some(existing) =
        db::subscription::get_subscription_by_payment(&mut *tx, &req.payment_reference).await?
    {
        log::info!(
            "Payment {} already activated subscription {}, skipping",
            req.payment_reference,
            existing.id
        );
        return Ok(existing);
    }

    let tier = db::subscription::get_tier(&mut *tx, req.tier_id).await?;
    let replaced = db::subscription::expire_active_subscriptions(&mut *tx, req.user_id, now).await?;

    let subscription = db::subscription::insert_subscription(
        &mut *tx,
        SubscriptionCreateRequest {
            user_id: req.user_id,
            tier_id: tier.id,
            start_date: now,
            end_date: now + tier.tier_type.access_period(),
            status: SubscriptionStatus::Active,
            payment_status: PaymentStatus::Paid,
            payment_id: Some(req.payment_reference.clone()),
            stripe_subscription_id: req.stripe_subscription_id.clone(),
        },
    )
    .await?;

    db::payment::insert_payment(
        &mut *tx,
        PaymentCreateRequest {
            user_id: req.user_id,
            subscription_id: Some(subscription.id),
            amount_cents: req.amount_cents.unwrap_or(tier.price_cents),
            currency: req
                .currency
                .clone()
                .unwrap_or_else(|| tier.currency.clone())
                .to_uppercase(),
            transaction_id: req.payment_reference.clone(),
            status: "completed".to_string(),
        },
    )
    .await?;

    db::activity::insert_activity(
        &mut *tx,
        req.user_id,
        ActivityAction::Subscription,
        json!({
            "tier": tier.name,
            "tier_type": tier.tier_type,
            "payment_id": req.payment_reference,
            "replaced": replaced,
        }),
    )
    .await?;

    tx.commit().await?;

    log::info!(
        "Activated {} subscription {} for user {}",
        tier.tier_type,
        subscription.id,
        req.user_id
    );

    cache::invalidate(
        cache,
        Entity::Subscription {
            owner: req.user_id,
            id: subscription.id,
        },
    )
    .await;

    Ok(subscription)
}

/// Cancels the user's active subscription, at Stripe too when it is recurring.
pub async fn cancel_subscription(
    pool: &PgPool,
    cache: &dyn CacheStore,
    config: &Config,
    client: &Client,
    user_id: Uuid,
) -> Res<UserSubscription> {
    let active = get_active_subscription(pool, cache, config, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("No active subscription".to_string()))?;

    if let Some(stripe_id) = active
        .subscription
        .stripe_subscription_id
        .as_deref()
        .filter(|id| id.starts_with("sub_"))
    {
        super::pay::cancel_stripe_subscription(client, stripe_id).await?;
    }

    let canceled =
        db::subscription::cancel_subscription(pool, active.subscription.id, Utc::now()).await?;

    db::activity::insert_activity(
        pool,
        user_id,
        ActivityAction::CancelSubscription,
        json!({ "tier": active.tier_name }),
    )
    .await?;

    cache::invalidate(
        cache,
        Entity::Subscription {
            owner: user_id,
            id: canceled.id,
        },
    )
    .await;

    Ok(canceled)
}

/// Applies a status change pushed by the gateway for a recurring subscription.
pub async fn sync_gateway_subscription(
    pool: &PgPool,
    cache: &dyn CacheStore,
    update: GatewaySubscriptionUpdate,
) -> Res<()> {
    let stripe_id = update.stripe_subscription_id.clone();
    match db::subscription::update_from_gateway(pool, update).await? {
        Some(subscription) => {
            cache::invalidate(
                cache,
                Entity::Subscription {
                    owner: subscription.user_id,
                    id: subscription.id,
                },
            )
            .await;
        }
        None => log::warn!("No local subscription for Stripe subscription {}", stripe_id),
    }
    Ok(())
}

pub async fn end_gateway_subscription(
    pool: &PgPool,
    cache: &dyn CacheStore,
    stripe_subscription_id: &str,
) -> Res<()> {
    match db::subscription::cancel_by_stripe_id(pool, stripe_subscription_id, Utc::now()).await? {
        Some(subscription) => {
            cache::invalidate(
                cache,
                Entity::Subscription {
                    owner: subscription.user_id,
                    id: subscription.id,
                },
            )
            .await;
        }
        None => log::warn!(
            "No local subscription for Stripe subscription {}",
            stripe_subscription_id
        ),
    }
    Ok(())
}

pub async fn get_payments(pool: &PgPool, user_id: Uuid) -> Res<Vec<PaymentRecord>> {
    db::payment::get_payments_by_user(pool, user_id).await
}
