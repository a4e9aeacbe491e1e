use std::sync::Arc;

use api_subs::{
    entitlement::{self, Feature},
    services::sub,
};
use async_trait::async_trait;
use cache::SharedCache;
use chrono::Utc;
use common::{env_config::Config, error::Res};
use db::{
    dtos::meal_plan::{GroceryListCreateRequest, MealPlanCreateRequest},
    models::{activity::ActivityAction, subscription::TierType},
};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::pipeline::{NewPlan, PlanAccess, PlanStore, SavedPlan};

/// [`PlanStore`] backed by Postgres, with subscription lookups going through the cache.
pub struct PgPlanStore {
    pool: Arc<PgPool>,
    cache: SharedCache,
    config: Arc<Config>,
}

impl PgPlanStore {
    pub fn new(pool: Arc<PgPool>, cache: SharedCache, config: Arc<Config>) -> Self {
        PgPlanStore {
            pool,
            cache,
            config,
        }
    }
}

#[async_trait]
impl PlanStore for PgPlanStore {
    async fn meal_planning_access(&self, user_id: Uuid) -> Res<PlanAccess> {
        let subscription =
            sub::get_active_subscription(&self.pool, &*self.cache, &self.config, user_id).await?;
        let usage = sub::plan_usage(&self.pool, user_id, subscription.as_ref()).await?;

        let entitlement = entitlement::decide(
            Feature::MealPlanning,
            subscription.as_ref(),
            usage,
            &sub::plan_limits(&self.config),
            Utc::now(),
        );
        let one_time_subscription = subscription
            .filter(|active| active.tier_type == TierType::OneTime)
            .map(|active| active.subscription.id);

        Ok(PlanAccess {
            entitlement,
            one_time_subscription,
        })
    }

    async fn save_plan(&self, user_id: Uuid, plan: NewPlan) -> Res<SavedPlan> {
        let mut tx = self.pool.begin().await?;

        let meal_plan = db::meal_plan::insert_meal_plan(
            &mut *tx,
            MealPlanCreateRequest {
                user_id,
                name: plan.name,
                description: plan.description,
            },
        )
        .await?;

        let grocery_list = db::grocery_list::insert_grocery_list(
            &mut *tx,
            GroceryListCreateRequest {
                user_id,
                meal_plan_id: Some(meal_plan.id),
                items: plan.grocery_items,
            },
        )
        .await?;

        db::activity::insert_activity(
            &mut *tx,
            user_id,
            ActivityAction::CreateMeal,
            json!({ "meal_plan_type": plan.diet, "meal_plan_id": meal_plan.id }),
        )
        .await?;

        tx.commit().await?;

        Ok(SavedPlan {
            meal_plan_id: meal_plan.id,
            grocery_list_id: grocery_list.id,
        })
    }

    async fn expire_subscription(&self, subscription_id: Uuid) -> Res<()> {
        db::subscription::expire_subscription(&*self.pool, subscription_id, Utc::now()).await
    }
}
