use std::fmt;

use uuid::Uuid;

/// Every key the service caches under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    MealPlans(Uuid),
    Recipes(Uuid),
    LatestGroceryList(Uuid),
    ActiveSubscription(Uuid),
    RecipeDetail { recipe_id: Uuid, user_id: Uuid },
    Tiers,
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::MealPlans(user_id) => write!(f, "user_meal_plans_{user_id}"),
            CacheKey::Recipes(user_id) => write!(f, "user_recipes_{user_id}"),
            CacheKey::LatestGroceryList(user_id) => write!(f, "latest_grocery_list_{user_id}"),
            CacheKey::ActiveSubscription(user_id) => write!(f, "active_subscription_{user_id}"),
            CacheKey::RecipeDetail { recipe_id, user_id } => {
                write!(f, "recipe_detail_{recipe_id}_{user_id}")
            }
            CacheKey::Tiers => f.write_str("active_subscription_tiers"),
        }
    }
}

/// A written entity, identified by type, owner and id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    /// Meal plans change plan counts, so they also drop the entitlement view.
    MealPlan { owner: Uuid, id: Uuid },
    Recipe { owner: Uuid, id: Uuid },
    GroceryList { owner: Uuid, id: Uuid },
    Subscription { owner: Uuid, id: Uuid },
    Tier { id: Uuid },
}

impl Entity {
    pub fn keys(&self) -> Vec<CacheKey> {
        match *self {
            Entity::MealPlan { owner, .. } => vec![
                CacheKey::MealPlans(owner),
                CacheKey::Recipes(owner),
                CacheKey::LatestGroceryList(owner),
                CacheKey::ActiveSubscription(owner),
            ],
            Entity::Recipe { owner, id } => vec![
                CacheKey::Recipes(owner),
                CacheKey::RecipeDetail {
                    recipe_id: id,
                    user_id: owner,
                },
            ],
            Entity::GroceryList { owner, .. } => vec![CacheKey::LatestGroceryList(owner)],
            Entity::Subscription { owner, .. } => vec![CacheKey::ActiveSubscription(owner)],
            Entity::Tier { .. } => vec![CacheKey::Tiers],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_names_are_stable() {
        let user = Uuid::nil();
        assert_eq!(
            CacheKey::MealPlans(user).to_string(),
            "user_meal_plans_00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(CacheKey::Tiers.to_string(), "active_subscription_tiers");
    }

    #[test]
    fn meal_plan_writes_drop_all_owner_listings() {
        let owner = Uuid::new_v4();
        let keys = Entity::MealPlan {
            owner,
            id: Uuid::new_v4(),
        }
        .keys();
        assert_eq!(
            keys,
            vec![
                CacheKey::MealPlans(owner),
                CacheKey::Recipes(owner),
                CacheKey::LatestGroceryList(owner),
                CacheKey::ActiveSubscription(owner),
            ]
        );
    }
}
