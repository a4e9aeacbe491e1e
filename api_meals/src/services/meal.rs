use std::collections::HashSet;

use cache::{CacheKey, CacheStore, Entity, Ttl};
use common::{env_config::Config, error::Res};
use db::models::{
    activity::{Activity, ActivityAction},
    grocery_list::GroceryList,
    meal_plan::MealPlan,
};
use generator::parser;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::dtos::meal::{PlanDetailResponse, SlotRecipe};

const DEFAULT_ACTIVITY_LIMIT: i64 = 20;
const MAX_ACTIVITY_LIMIT: i64 = 100;

/// The user's plans, newest first, cached for the medium TTL.
pub async fn list_plans(
    pool: &PgPool,
    cache: &dyn CacheStore,
    config: &Config,
    user_id: Uuid,
) -> Res<Vec<MealPlan>> {
    cache::get_or_load(
        cache,
        &CacheKey::MealPlans(user_id),
        Ttl::Medium.duration(&config.cache),
        || db::meal_plan::get_meal_plans_by_user(pool, user_id),
    )
    .await
}

/// A plan with its days parsed back out of the stored text.
pub async fn get_plan_detail(
    pool: &PgPool,
    user_id: Uuid,
    meal_plan_id: Uuid,
) -> Res<PlanDetailResponse> {
    let meal_plan = db::meal_plan::get_meal_plan(pool, meal_plan_id, user_id).await?;
    let grocery_list =
        db::grocery_list::get_grocery_list_for_plan(pool, meal_plan_id, user_id).await?;
    let recipes = db::recipe::get_recipes_for_plan(pool, meal_plan_id, user_id).await?;

    Ok(PlanDetailResponse {
        days: parser::structure_days(&meal_plan.description, false),
        grocery_list: grocery_list
            .map(|list| list.item_list())
            .unwrap_or_default(),
        recipes: recipes
            .into_iter()
            .filter_map(|recipe| {
                Some(SlotRecipe {
                    day_index: recipe.day_index?,
                    meal_type: recipe.meal_type?,
                    recipe_id: recipe.id,
                    title: recipe.title,
                })
            })
            .collect(),
        meal_plan,
    })
}

/// Cache entities dropped when a plan and its cascaded recipes are deleted.
pub fn plan_deletion_entities(
    owner: Uuid,
    meal_plan_id: Uuid,
    recipe_ids: &[Uuid],
) -> Vec<Entity> {
    let mut entities = vec![Entity::MealPlan {
        owner,
        id: meal_plan_id,
    }];
    entities.extend(recipe_ids.iter().map(|&id| Entity::Recipe { owner, id }));
    entities
}

/// Deletes the plan; its slot recipes go with it.
pub async fn delete_plan(
    pool: &PgPool,
    cache: &dyn CacheStore,
    user_id: Uuid,
    meal_plan_id: Uuid,
) -> Res<()> {
    let mut tx = pool.begin().await?;

    let meal_plan = db::meal_plan::get_meal_plan(&mut *tx, meal_plan_id, user_id).await?;
    let recipe_ids: Vec<Uuid> = db::recipe::get_recipes_for_plan(&mut *tx, meal_plan_id, user_id)
        .await?
        .into_iter()
        .map(|recipe| recipe.id)
        .collect();
    db::meal_plan::delete_meal_plan(&mut *tx, meal_plan_id, user_id).await?;
    db::activity::insert_activity(
        &mut *tx,
        user_id,
        ActivityAction::DeleteMeal,
        json!({ "meal_plan_id": meal_plan_id, "name": meal_plan.name }),
    )
    .await?;

    tx.commit().await?;
    log::info!(
        "Deleted meal plan {} of user {} with {} recipes",
        meal_plan_id,
        user_id,
        recipe_ids.len()
    );

    cache::invalidate_all(
        cache,
        &plan_deletion_entities(user_id, meal_plan_id, &recipe_ids),
    )
    .await;
    Ok(())
}

pub async fn latest_grocery_list(
    pool: &PgPool,
    cache: &dyn CacheStore,
    config: &Config,
    user_id: Uuid,
) -> Res<Option<GroceryList>> {
    cache::get_or_load(
        cache,
        &CacheKey::LatestGroceryList(user_id),
        Ttl::Medium.duration(&config.cache),
        || db::grocery_list::get_latest_grocery_list(pool, user_id),
    )
    .await
}

pub async fn grocery_lists(pool: &PgPool, user_id: Uuid) -> Res<Vec<GroceryList>> {
    db::grocery_list::get_grocery_lists_by_user(pool, user_id).await
}

/// Items that appear in more than one list are reported once, first occurrence wins.
pub fn merge_items(lists: &[GroceryList]) -> Vec<String> {
    let mut seen = HashSet::new();
    lists
        .iter()
        .flat_map(GroceryList::item_list)
        .filter(|item| seen.insert(item.to_lowercase()))
        .collect()
}

pub fn activity_limit(requested: Option<i64>) -> i64 {
    requested
        .unwrap_or(DEFAULT_ACTIVITY_LIMIT)
        .clamp(1, MAX_ACTIVITY_LIMIT)
}

pub async fn recent_activity(pool: &PgPool, user_id: Uuid, limit: i64) -> Res<Vec<Activity>> {
    db::activity::get_recent_activity(pool, user_id, limit).await
}
