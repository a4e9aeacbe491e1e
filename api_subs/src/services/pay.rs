use std::collections::HashMap;

use cache::CacheStore;
use chrono::{TimeZone, Utc};
use common::{
    env_config::Config,
    error::{AppError, Res},
};
use db::{
    dtos::subscription::GatewaySubscriptionUpdate,
    models::subscription::{SubscriptionStatus, SubscriptionTier},
};
use sqlx::PgPool;
use stripe::{
    CheckoutSession, Client, CreateCheckoutSession, Event, EventObject, EventType,
    Subscription, SubscriptionId, Webhook,
};
use uuid::Uuid;

use crate::{
    dtos::sub::CheckoutRequest,
    misc::pay::{checkout_mode, checkout_recurring},
    pricing::PriceQuote,
    services::sub::{self, ActivationRequest},
};

/// Stripe client for the configured secret key.
pub fn stripe_client(config: &Config) -> Client {
    Client::new(config.stripe_secret_key.as_str())
}

/// Creates a checkout session for a tier.
/// The user and tier ids travel in the session metadata and come back
/// with the `checkout.session.completed` webhook.
pub async fn create_checkout_session(
    client: &Client,
    tier: &SubscriptionTier,
    user_id: Uuid,
    price: &PriceQuote,
    req: &CheckoutRequest,
) -> Res<CheckoutSession> {
    let user_id_str = user_id.to_string();
    let metadata = HashMap::from([
        ("user_id".to_string(), user_id_str.clone()),
        ("tier_id".to_string(), tier.id.to_string()),
        ("tier_type".to_string(), tier.tier_type.to_string()),
        ("currency".to_string(), price.currency.to_string()),
    ]);

    let params = CreateCheckoutSession {
        payment_method_types: Some(vec![stripe::CreateCheckoutSessionPaymentMethodTypes::Card]),
        line_items: Some(vec![stripe::CreateCheckoutSessionLineItems {
            price_data: Some(stripe::CreateCheckoutSessionLineItemsPriceData {
                currency: price.currency.stripe(),
                product_data: Some(stripe::CreateCheckoutSessionLineItemsPriceDataProductData {
                    name: tier.name.clone(),
                    description: Some(tier.description.clone()).filter(|d| !d.is_empty()),
                    ..Default::default()
                }),
                recurring: checkout_recurring(tier.tier_type),
                unit_amount: Some(price.amount_cents),
                ..Default::default()
            }),
            quantity: Some(1),
            ..Default::default()
        }]),
        mode: Some(checkout_mode(tier.tier_type)),
        success_url: Some(req.success_url.as_str()),
        cancel_url: Some(req.cancel_url.as_str()),
        client_reference_id: Some(user_id_str.as_str()),
        metadata: Some(metadata),
        ..Default::default()
    };
    CheckoutSession::create(client, params)
        .await
        .map_err(AppError::from)
}

pub async fn cancel_stripe_subscription(client: &Client, subscription_id: &str) -> Res<()> {
    let sub_id = subscription_id
        .parse::<SubscriptionId>()
        .map_err(|e| AppError::BadRequest(format!("Invalid subscription ID: {}", e)))?;
    Subscription::cancel(client, &sub_id, stripe::CancelSubscription::new())
        .await
        .map_err(AppError::from)?;
    Ok(())
}

/// Creates an event for the webhook based on the request payload and signature.
/// Requires a webhook secret key.
pub fn construct_event(payload: &str, signature: &str, webhook_secret: &str) -> Res<Event> {
    match Webhook::construct_event(payload, signature, webhook_secret) {
        Ok(event) => Ok(event),
        Err(e) => {
            log::error!("Error constructing webhook event: {}", e);
            Err(AppError::BadRequest(format!("Webhook Error: {}", e)))
        }
    }
}

/// Reads the activation inputs out of checkout session metadata.
pub fn activation_from_metadata(
    metadata: &HashMap<String, String>,
    payment_reference: String,
) -> Res<ActivationRequest> {
    let read_id = |key: &str| -> Res<Uuid> {
        let raw = metadata
            .get(key)
            .ok_or_else(|| AppError::BadRequest(format!("Missing {} in session metadata", key)))?;
        Uuid::parse_str(raw)
            .map_err(|e| AppError::BadRequest(format!("Invalid {} in session metadata: {}", key, e)))
    };

    Ok(ActivationRequest {
        user_id: read_id("user_id")?,
        tier_id: read_id("tier_id")?,
        payment_reference,
        stripe_subscription_id: None,
        amount_cents: None,
        currency: None,
    })
}

/// Processes the webhook event.
pub async fn process_webhook_event(pool: &PgPool, cache: &dyn CacheStore, event: Event) -> Res<()> {
    log::info!("Processing webhook event: {}", event.type_);

    match event.type_ {
        EventType::CheckoutSessionCompleted => {
            if let EventObject::CheckoutSession(session) = event.data.object {
                log::info!("Checkout session completed: {}", session.id);

                let payment_reference = session
                    .payment_intent
                    .as_ref()
                    .map(|pi| pi.id().to_string())
                    .unwrap_or_else(|| session.id.to_string());
                let metadata = session.metadata.clone().unwrap_or_default();

                let mut req = activation_from_metadata(&metadata, payment_reference)?;
                req.stripe_subscription_id = session
                    .subscription
                    .as_ref()
                    .map(|s| s.id().to_string());
                req.amount_cents = session.amount_total;
                req.currency = session.currency.map(|c| c.to_string());

                sub::activate_subscription(pool, cache, req).await?;
            }
        }
        EventType::CustomerSubscriptionUpdated => {
            if let EventObject::Subscription(subscription) = event.data.object {
                log::info!("Subscription updated: {}", subscription.id);
                let end_date = Utc
                    .timestamp_opt(subscription.current_period_end, 0)
                    .single()
                    .ok_or_else(|| {
                        AppError::BadRequest("Invalid current_period_end".to_string())
                    })?;
                sub::sync_gateway_subscription(
                    pool,
                    cache,
                    GatewaySubscriptionUpdate {
                        stripe_subscription_id: subscription.id.to_string(),
                        status: SubscriptionStatus::from_gateway(&subscription.status.to_string()),
                        end_date,
                    },
                )
                .await?;
            }
        }
        EventType::CustomerSubscriptionDeleted => {
            if let EventObject::Subscription(subscription) = event.data.object {
                log::info!("Subscription deleted: {}", subscription.id);
                sub::end_gateway_subscription(pool, cache, subscription.id.as_str()).await?;
            }
        }
        _ => {
            log::info!("Unhandled event type: {}", event.type_);
        }
    }

    Ok(())
}
