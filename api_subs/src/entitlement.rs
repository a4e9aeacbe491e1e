//! Feature gating by subscription tier.
//!
//! [`decide`] is the only place that maps a feature onto the tiers allowed to
//! use it. Free users and one-time buyers are additionally capped by the
//! number of meal plans they created.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use common::error::{AppError, Res};
use db::models::subscription::{ActiveSubscription, TierType};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    MealPlanning,
    AssistantChat,
    DetailedNutrition,
    RecipeDetails,
}

impl Feature {
    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::MealPlanning => "meal_planning",
            Feature::AssistantChat => "assistant_chat",
            Feature::DetailedNutrition => "detailed_nutrition",
            Feature::RecipeDetails => "recipe_details",
        }
    }

    /// Tiers that unlock the feature; `None` when every signed-in user may use it.
    pub fn allowed_tiers(&self) -> Option<&'static [TierType]> {
        match self {
            Feature::AssistantChat | Feature::DetailedNutrition => {
                Some(&[TierType::Weekly, TierType::Monthly])
            }
            Feature::MealPlanning => Some(&[TierType::OneTime, TierType::Weekly, TierType::Monthly]),
            Feature::RecipeDetails => None,
        }
    }

    /// Whether users without a subscription get a capped free allowance.
    fn has_free_allowance(&self) -> bool {
        matches!(self, Feature::MealPlanning)
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Feature {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "meal_planning" => Ok(Feature::MealPlanning),
            "assistant_chat" => Ok(Feature::AssistantChat),
            "detailed_nutrition" => Ok(Feature::DetailedNutrition),
            "recipe_details" => Ok(Feature::RecipeDetails),
            other => Err(AppError::Validation(format!("Unknown feature: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PlanLimits {
    pub free: i64,
    pub one_time: i64,
}

/// Meal plans the user has created, overall and since the current subscription started.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanUsage {
    pub total: i64,
    pub since_subscription_start: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Entitlement {
    Allow,
    Deny {
        requires_upgrade: bool,
        message: String,
    },
}

impl Entitlement {
    fn upgrade(message: impl Into<String>) -> Self {
        Entitlement::Deny {
            requires_upgrade: true,
            message: message.into(),
        }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, Entitlement::Allow)
    }

    /// Turns a denial into [`AppError::UpgradeRequired`].
    pub fn into_result(self) -> Res<()> {
        match self {
            Entitlement::Allow => Ok(()),
            Entitlement::Deny { message, .. } => Err(AppError::UpgradeRequired(message)),
        }
    }
}

fn tier_requirement(allowed: &[TierType]) -> &'static str {
    if allowed.contains(&TierType::OneTime) {
        "premium"
    } else {
        "weekly"
    }
}

pub fn decide(
    feature: Feature,
    subscription: Option<&ActiveSubscription>,
    usage: PlanUsage,
    limits: &PlanLimits,
    now: DateTime<Utc>,
) -> Entitlement {
    let Some(allowed) = feature.allowed_tiers() else {
        return Entitlement::Allow;
    };

    let subscription = subscription.filter(|s| s.is_valid_at(now));

    match subscription {
        None if feature.has_free_allowance() => {
            if usage.total < limits.free {
                Entitlement::Allow
            } else {
                Entitlement::upgrade(format!(
                    "You have used all {} free meal plans. This feature requires a {} subscription",
                    limits.free,
                    tier_requirement(allowed)
                ))
            }
        }
        None => Entitlement::upgrade(format!(
            "This feature requires a {} subscription",
            tier_requirement(allowed)
        )),
        Some(active) if !allowed.contains(&active.tier_type) => Entitlement::upgrade(format!(
            "This feature requires a {} subscription",
            tier_requirement(allowed)
        )),
        Some(active)
            if active.tier_type == TierType::OneTime
                && feature.has_free_allowance()
                && usage.since_subscription_start >= limits.one_time =>
        {
            Entitlement::upgrade(
                "Your one-time meal plan has been used. This feature requires a weekly subscription",
            )
        }
        Some(_) => Entitlement::Allow,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use db::models::subscription::{PaymentStatus, SubscriptionStatus, UserSubscription};
    use uuid::Uuid;

    const LIMITS: PlanLimits = PlanLimits {
        free: 3,
        one_time: 1,
    };

    fn active(tier_type: TierType, now: DateTime<Utc>) -> ActiveSubscription {
        ActiveSubscription {
            subscription: UserSubscription {
                id: Uuid::new_v4(),
                user_id: Uuid::new_v4(),
                tier_id: Uuid::new_v4(),
                start_date: now - Duration::days(1),
                end_date: now + Duration::days(6),
                is_active: true,
                status: SubscriptionStatus::Active,
                payment_status: PaymentStatus::Paid,
                payment_id: Some("pi_123".to_string()),
                stripe_subscription_id: None,
                created_at: now - Duration::days(1),
            },
            tier_type,
            tier_name: tier_type.to_string(),
        }
    }

    fn usage(total: i64, since: i64) -> PlanUsage {
        PlanUsage {
            total,
            since_subscription_start: since,
        }
    }

    #[test]
    fn free_user_is_capped_at_three_plans() {
        let now = Utc::now();
        assert!(decide(Feature::MealPlanning, None, usage(2, 0), &LIMITS, now).is_allowed());

        let denied = decide(Feature::MealPlanning, None, usage(3, 0), &LIMITS, now);
        assert!(matches!(
            denied,
            Entitlement::Deny {
                requires_upgrade: true,
                ..
            }
        ));
    }

    #[test]
    fn one_time_purchase_covers_a_single_plan() {
        let now = Utc::now();
        let sub = active(TierType::OneTime, now);
        assert!(decide(Feature::MealPlanning, Some(&sub), usage(7, 0), &LIMITS, now).is_allowed());
        assert!(!decide(Feature::MealPlanning, Some(&sub), usage(8, 1), &LIMITS, now).is_allowed());
    }

    #[test]
    fn recurring_tiers_are_unlimited() {
        let now = Utc::now();
        for tier in [TierType::Weekly, TierType::Monthly] {
            let sub = active(tier, now);
            assert!(
                decide(Feature::MealPlanning, Some(&sub), usage(50, 50), &LIMITS, now).is_allowed()
            );
        }
    }

    #[test]
    fn chat_and_nutrition_need_a_recurring_tier() {
        let now = Utc::now();
        let one_time = active(TierType::OneTime, now);
        let weekly = active(TierType::Weekly, now);
        for feature in [Feature::AssistantChat, Feature::DetailedNutrition] {
            let denied = decide(feature, None, PlanUsage::default(), &LIMITS, now);
            assert_eq!(
                denied,
                Entitlement::Deny {
                    requires_upgrade: true,
                    message: "This feature requires a weekly subscription".to_string(),
                }
            );
            assert!(!decide(feature, Some(&one_time), PlanUsage::default(), &LIMITS, now).is_allowed());
            assert!(decide(feature, Some(&weekly), PlanUsage::default(), &LIMITS, now).is_allowed());
        }
    }

    #[test]
    fn expired_subscription_counts_as_none() {
        let now = Utc::now();
        let mut sub = active(TierType::Weekly, now);
        sub.subscription.end_date = now;
        assert!(!decide(Feature::AssistantChat, Some(&sub), PlanUsage::default(), &LIMITS, now).is_allowed());
        assert!(!decide(Feature::MealPlanning, Some(&sub), usage(3, 3), &LIMITS, now).is_allowed());
    }

    #[test]
    fn recipe_details_are_not_gated() {
        let now = Utc::now();
        assert!(decide(Feature::RecipeDetails, None, usage(99, 0), &LIMITS, now).is_allowed());
    }

    #[test]
    fn denial_maps_to_upgrade_error() {
        let now = Utc::now();
        let err = decide(Feature::AssistantChat, None, PlanUsage::default(), &LIMITS, now)
            .into_result()
            .unwrap_err();
        assert!(err.requires_upgrade());
    }

    #[test]
    fn feature_names_round_trip() {
        for feature in [
            Feature::MealPlanning,
            Feature::AssistantChat,
            Feature::DetailedNutrition,
            Feature::RecipeDetails,
        ] {
            assert_eq!(feature.as_str().parse::<Feature>().unwrap(), feature);
        }
        assert!("gemini_chat".parse::<Feature>().is_err());
    }
}
