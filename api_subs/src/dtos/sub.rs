use db::models::{
    payment::PaymentRecord,
    subscription::{ActiveSubscription, SubscriptionTier},
};
use serde::{Deserialize, Serialize};

use crate::{
    entitlement::{Entitlement, Feature},
    pricing::PriceQuote,
};

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub success_url: String,
    pub cancel_url: String,
    /// ISO code; the configured checkout currency when omitted.
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub session_id: String,
    pub url: String,
    pub price: PriceQuote,
}

/// A tier with its price in every supported currency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierView {
    #[serde(flatten)]
    pub tier: SubscriptionTier,
    pub prices: Vec<PriceQuote>,
}

#[derive(Debug, Serialize)]
pub struct TiersResponse {
    pub tiers: Vec<TierView>,
}

#[derive(Debug, Serialize)]
pub struct CurrentSubscriptionResponse {
    pub subscription: Option<ActiveSubscription>,
}

#[derive(Debug, Serialize)]
pub struct EntitlementResponse {
    pub feature: Feature,
    #[serde(flatten)]
    pub entitlement: Entitlement,
}

#[derive(Debug, Serialize)]
pub struct PaymentsResponse {
    pub payments: Vec<PaymentRecord>,
}
