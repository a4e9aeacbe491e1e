use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::subscription::{PaymentStatus, SubscriptionStatus};

pub struct SubscriptionCreateRequest {
    pub user_id: Uuid,
    pub tier_id: Uuid,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: SubscriptionStatus,
    pub payment_status: PaymentStatus,
    pub payment_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
}

/// State pushed by the payment gateway for a recurring subscription.
pub struct GatewaySubscriptionUpdate {
    pub stripe_subscription_id: String,
    pub status: SubscriptionStatus,
    pub end_date: DateTime<Utc>,
}
