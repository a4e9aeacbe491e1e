use std::sync::Arc;

use actix_web::{Responder, get, post, web};
use cache::SharedCache;
use common::{
    env_config::Config,
    error::{AppError, Res},
    http::Success,
    jwt::JwtClaims,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    dtos::sub::{
        CheckoutRequest, CheckoutResponse, CurrentSubscriptionResponse, EntitlementResponse,
        PaymentsResponse, TiersResponse,
    },
    entitlement::Feature,
    services,
};

/// Lists the subscription tiers that can currently be bought.
///
/// # Output
/// - Success: `{ "tiers": [ { id, name, tier_type, price_cents, currency, ...,
///   "prices": [ { "currency": "GBP", "symbol": "£", "amount_cents": 599, "display": "£5.99" } ] } ] }`
///
/// # Frontend Example
/// ```javascript
/// const response = await fetch('/api/tiers');
/// const { tiers } = await response.json();
/// tiers.forEach(t => console.log(t.name, t.prices.find(p => p.currency === 'USD').display));
/// ```
#[get("")]
pub async fn get_tiers(
    pool: web::Data<Arc<PgPool>>,
    cache: web::Data<SharedCache>,
    config: web::Data<Arc<Config>>,
) -> Res<impl Responder> {
    let tiers = services::sub::get_tiers(&pool, &***cache, &config).await?;
    Success::ok(TiersResponse { tiers })
}

/// Returns the user's active subscription, or `null` when there is none.
///
/// # Frontend Example
/// ```javascript
/// const response = await fetch('/api/dashboard/sub/current', {
///   headers: { 'Authorization': `Bearer ${token}` }
/// });
/// const { subscription } = await response.json();
/// if (subscription) console.log(subscription.tier_type, subscription.end_date);
/// ```
#[get("/current")]
pub async fn get_current(
    claims: web::ReqData<JwtClaims>,
    pool: web::Data<Arc<PgPool>>,
    cache: web::Data<SharedCache>,
    config: web::Data<Arc<Config>>,
) -> Res<impl Responder> {
    let subscription =
        services::sub::get_active_subscription(&pool, &***cache, &config, claims.user_id).await?;
    Success::ok(CurrentSubscriptionResponse { subscription })
}

/// Evaluates whether the user may use a feature.
///
/// # Input
/// - `feature`: one of `meal_planning`, `assistant_chat`, `detailed_nutrition`, `recipe_details`
///
/// # Output
/// - Success: `{ "feature": "assistant_chat", "decision": "allow" }` or
///   `{ "feature": "...", "decision": "deny", "requires_upgrade": true, "message": "..." }`
/// - Error: 400 for an unknown feature
#[get("/entitlements/{feature}")]
pub async fn get_entitlement(
    claims: web::ReqData<JwtClaims>,
    path: web::Path<String>,
    pool: web::Data<Arc<PgPool>>,
    cache: web::Data<SharedCache>,
    config: web::Data<Arc<Config>>,
) -> Res<impl Responder> {
    let feature: Feature = path.into_inner().parse()?;
    let entitlement =
        services::sub::check_entitlement(&pool, &***cache, &config, claims.user_id, feature)
            .await?;
    Success::ok(EntitlementResponse {
        feature,
        entitlement,
    })
}

/// Creates a Stripe checkout session for a tier.
///
/// # Input
/// - `tier_id`: path parameter
/// - body: `{ "success_url": "...", "cancel_url": "...", "currency": "usd" }`;
///   `currency` is optional and one of `gbp`, `usd`, `eur`, `ngn`
///
/// # Output
/// - Success: `{ "session_id": "cs_...", "url": "https://checkout.stripe.com/...", "price": { ... } }`
/// - Error: 404 when the tier does not exist or is retired, 400 for an unsupported currency
///
/// # Frontend Example
/// ```javascript
/// const response = await fetch(`/api/dashboard/sub/checkout/${tierId}`, {
///   method: 'POST',
///   headers: {
///     'Authorization': `Bearer ${token}`,
///     'Content-Type': 'application/json'
///   },
///   body: JSON.stringify({
///     success_url: `${location.origin}/billing/success`,
///     cancel_url: `${location.origin}/billing`
///   })
/// });
/// const { url } = await response.json();
/// window.location.href = url;
/// ```
#[post("/checkout/{tier_id}")]
pub async fn post_checkout(
    claims: web::ReqData<JwtClaims>,
    path: web::Path<Uuid>,
    pool: web::Data<Arc<PgPool>>,
    config: web::Data<Arc<Config>>,
    req: web::Json<CheckoutRequest>,
) -> Res<impl Responder> {
    let (tier, price) = services::sub::checkout_quote(
        &pool,
        &config,
        path.into_inner(),
        req.currency.as_deref(),
    )
    .await?;

    let client = services::pay::stripe_client(&config);
    let session =
        services::pay::create_checkout_session(&client, &tier, claims.user_id, &price, &req)
            .await?;

    let url = session
        .url
        .ok_or_else(|| AppError::Internal("Checkout session has no URL".to_string()))?;
    Success::created(CheckoutResponse {
        session_id: session.id.to_string(),
        url,
        price,
    })
}

/// Cancels the active subscription. Recurring subscriptions are canceled at Stripe too.
#[post("/cancel")]
pub async fn post_cancel(
    claims: web::ReqData<JwtClaims>,
    pool: web::Data<Arc<PgPool>>,
    cache: web::Data<SharedCache>,
    config: web::Data<Arc<Config>>,
) -> Res<impl Responder> {
    let client = services::pay::stripe_client(&config);
    let subscription =
        services::sub::cancel_subscription(&pool, &***cache, &config, &client, claims.user_id)
            .await?;
    Success::ok(subscription)
}

#[get("/payments")]
pub async fn get_payments(
    claims: web::ReqData<JwtClaims>,
    pool: web::Data<Arc<PgPool>>,
) -> Res<impl Responder> {
    let payments = services::sub::get_payments(&pool, claims.user_id).await?;
    Success::ok(PaymentsResponse { payments })
}
