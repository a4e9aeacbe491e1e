use std::sync::Arc;

use actix_web::{HttpRequest, HttpResponse, post, web};
use cache::SharedCache;
use common::env_config::Config;
use serde_json::json;
use sqlx::PgPool;

use crate::services;

/// Stripe webhook.
///
/// The raw body is verified against the `stripe-signature` header before any
/// processing. A missing or invalid signature and any processing failure are
/// answered with 400 so that Stripe retries the delivery.
#[post("/webhook")]
pub async fn post_webhook(
    req: HttpRequest,
    payload: String,
    pool: web::Data<Arc<PgPool>>,
    cache: web::Data<SharedCache>,
    config: web::Data<Arc<Config>>,
) -> HttpResponse {
    let Some(signature) = req
        .headers()
        .get("stripe-signature")
        .and_then(|h| h.to_str().ok())
    else {
        log::warn!("Webhook request without stripe-signature header");
        return HttpResponse::BadRequest().json(json!({
            "success": false,
            "error": "Missing stripe-signature header"
        }));
    };

    let event =
        match services::pay::construct_event(&payload, signature, &config.stripe_webhook_secret) {
            Ok(event) => event,
            Err(e) => {
                return HttpResponse::BadRequest()
                    .json(json!({ "success": false, "error": e.to_string() }));
            }
        };

    match services::pay::process_webhook_event(&pool, &***cache, event).await {
        Ok(()) => HttpResponse::Ok().json(json!({ "received": true })),
        Err(e) => {
            log::error!("Error processing webhook: {}", e);
            HttpResponse::BadRequest().json(json!({ "success": false, "error": e.to_string() }))
        }
    }
}
