use std::{fmt, str::FromStr};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "tier_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TierType {
    OneTime,
    Weekly,
    Monthly,
}

impl TierType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TierType::OneTime => "one_time",
            TierType::Weekly => "weekly",
            TierType::Monthly => "monthly",
        }
    }

    /// Length of the access window bought by one payment.
    pub fn access_period(&self) -> Duration {
        match self {
            TierType::OneTime => Duration::days(365),
            TierType::Weekly => Duration::days(7),
            TierType::Monthly => Duration::days(30),
        }
    }

    pub fn is_recurring(&self) -> bool {
        !matches!(self, TierType::OneTime)
    }
}

impl fmt::Display for TierType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TierType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "one_time" | "pay_once" => Ok(TierType::OneTime),
            "weekly" => Ok(TierType::Weekly),
            "monthly" => Ok(TierType::Monthly),
            other => Err(format!("unknown tier type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "subscription_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Canceled,
    Expired,
    PastDue,
}

impl SubscriptionStatus {
    /// Maps a payment gateway status string onto the local status.
    pub fn from_gateway(status: &str) -> Self {
        match status {
            "active" | "trialing" => SubscriptionStatus::Active,
            "past_due" | "unpaid" | "incomplete" => SubscriptionStatus::PastDue,
            "incomplete_expired" => SubscriptionStatus::Expired,
            _ => SubscriptionStatus::Canceled,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Paid,
    Pending,
    Failed,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct SubscriptionTier {
    pub id: Uuid,
    pub name: String,
    pub tier_type: TierType,
    pub description: String,
    pub price_cents: i64,
    pub currency: String,
    /// 0 means unlimited.
    pub meal_plan_limit: i32,
    pub assistant_chat: bool,
    pub detailed_nutrition: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Fixed price of a tier in one currency, in minor units.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, Serialize, Deserialize)]
pub struct TierPrice {
    pub tier_id: Uuid,
    /// Lowercase ISO code.
    pub currency: String,
    pub amount_cents: i64,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct UserSubscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub tier_id: Uuid,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_active: bool,
    pub status: SubscriptionStatus,
    pub payment_status: PaymentStatus,
    pub payment_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl UserSubscription {
    /// Active and ending strictly after `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.end_date > now
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }
}

/// A subscription together with the tier type it grants.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct ActiveSubscription {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub subscription: UserSubscription,
    pub tier_type: TierType,
    pub tier_name: String,
}

impl ActiveSubscription {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.subscription.is_valid_at(now)
    }
}
