use api_subs::{entitlement::Feature, services::sub};
use cache::{CacheKey, CacheStore, Entity, Ttl};
use common::{
    env_config::Config,
    error::{AppError, Res},
};
use db::{
    dtos::recipe::{RecipeCreateRequest, RecipeSlot, RecipeUpdateRequest},
    models::{activity::ActivityAction, recipe::Recipe},
};
use generator::{
    assist,
    completion::CompletionClient,
    parser::{self, GeneratedRecipe, MealSlot},
};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::dtos::recipe::{RecipeCreateBody, RecipeView, SlotRecipeResponse};

const MIN_TITLE_LEN: usize = 3;

pub fn validate_title(title: &str) -> Res<String> {
    let title = title.trim();
    if title.chars().count() < MIN_TITLE_LEN {
        return Err(AppError::Validation(format!(
            "Recipe title must be at least {} characters",
            MIN_TITLE_LEN
        )));
    }
    Ok(title.to_string())
}

fn require_text(value: &str, field: &str) -> Res<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::Validation(format!("{} must not be empty", field)));
    }
    Ok(value.to_string())
}

pub fn recipe_view(mut recipe: Recipe, nutrition_allowed: bool) -> RecipeView {
    if !nutrition_allowed {
        recipe.nutrition_info = None;
    }
    RecipeView {
        ingredients_list: recipe.ingredient_list(),
        instructions_list: recipe.instruction_list(),
        nutrition_locked: !nutrition_allowed,
        recipe,
    }
}

async fn nutrition_allowed(
    pool: &PgPool,
    cache: &dyn CacheStore,
    config: &Config,
    user_id: Uuid,
) -> Res<bool> {
    Ok(
        sub::check_entitlement(pool, cache, config, user_id, Feature::DetailedNutrition)
            .await?
            .is_allowed(),
    )
}

pub async fn list_recipes(
    pool: &PgPool,
    cache: &dyn CacheStore,
    config: &Config,
    user_id: Uuid,
) -> Res<Vec<Recipe>> {
    cache::get_or_load(
        cache,
        &CacheKey::Recipes(user_id),
        Ttl::Medium.duration(&config.cache),
        || db::recipe::get_recipes_by_user(pool, user_id),
    )
    .await
}

pub async fn get_recipe(
    pool: &PgPool,
    cache: &dyn CacheStore,
    config: &Config,
    user_id: Uuid,
    recipe_id: Uuid,
) -> Res<RecipeView> {
    let recipe = cache::get_or_load(
        cache,
        &CacheKey::RecipeDetail { recipe_id, user_id },
        Ttl::Long.duration(&config.cache),
        || db::recipe::get_recipe(pool, recipe_id, user_id),
    )
    .await?;

    let allowed = nutrition_allowed(pool, cache, config, user_id).await?;
    Ok(recipe_view(recipe, allowed))
}

pub async fn create_recipe(
    pool: &PgPool,
    cache: &dyn CacheStore,
    user_id: Uuid,
    body: RecipeCreateBody,
) -> Res<Recipe> {
    let data = RecipeCreateRequest {
        user_id,
        slot: None,
        title: validate_title(&body.title)?,
        description: body.description.trim().to_string(),
        ingredients: require_text(&body.ingredients, "ingredients")?,
        instructions: require_text(&body.instructions, "instructions")?,
        prep_time: body.prep_time,
        cook_time: body.cook_time,
        servings: body.servings,
        difficulty: body.difficulty,
        nutrition_info: None,
        tips: None,
        is_ai_generated: false,
    };

    insert_with_activity(pool, cache, data).await
}

pub async fn update_recipe(
    pool: &PgPool,
    cache: &dyn CacheStore,
    user_id: Uuid,
    recipe_id: Uuid,
    mut data: RecipeUpdateRequest,
) -> Res<Recipe> {
    if let Some(title) = data.title.as_deref() {
        data.title = Some(validate_title(title)?);
    }
    if let Some(servings) = data.servings {
        if servings < 1 {
            return Err(AppError::Validation("servings must be at least 1".to_string()));
        }
    }

    let mut tx = pool.begin().await?;
    let recipe = db::recipe::update_recipe(&mut *tx, recipe_id, user_id, data).await?;
    db::activity::insert_activity(
        &mut *tx,
        user_id,
        ActivityAction::UpdateRecipe,
        json!({ "recipe_id": recipe.id, "title": recipe.title }),
    )
    .await?;
    tx.commit().await?;

    cache::invalidate(
        cache,
        Entity::Recipe {
            owner: user_id,
            id: recipe.id,
        },
    )
    .await;
    Ok(recipe)
}

pub async fn delete_recipe(
    pool: &PgPool,
    cache: &dyn CacheStore,
    user_id: Uuid,
    recipe_id: Uuid,
) -> Res<()> {
    let mut tx = pool.begin().await?;
    let recipe = db::recipe::get_recipe(&mut *tx, recipe_id, user_id).await?;
    db::recipe::delete_recipe(&mut *tx, recipe_id, user_id).await?;
    db::activity::insert_activity(
        &mut *tx,
        user_id,
        ActivityAction::DeleteRecipe,
        json!({ "recipe_id": recipe_id, "title": recipe.title }),
    )
    .await?;
    tx.commit().await?;

    cache::invalidate(
        cache,
        Entity::Recipe {
            owner: user_id,
            id: recipe_id,
        },
    )
    .await;
    Ok(())
}

/// Recipe of one meal of a plan, generated and stored on first request.
pub async fn slot_recipe(
    pool: &PgPool,
    cache: &dyn CacheStore,
    config: &Config,
    client: &dyn CompletionClient,
    user_id: Uuid,
    slot: (Uuid, i32, String),
) -> Res<SlotRecipeResponse> {
    let (meal_plan_id, day_index, meal_type) = slot;
    let meal_slot = MealSlot::from_label(&meal_type)
        .ok_or_else(|| AppError::Validation(format!("Unknown meal type: {}", meal_type)))?;
    let slot = RecipeSlot {
        meal_plan_id,
        day_index,
        meal_type: meal_slot.as_str().to_string(),
    };

    let meal_plan = db::meal_plan::get_meal_plan(pool, meal_plan_id, user_id).await?;
    let allowed = nutrition_allowed(pool, cache, config, user_id).await?;

    if let Some(existing) = db::recipe::get_recipe_for_slot(pool, &slot).await? {
        return Ok(SlotRecipeResponse {
            recipe: recipe_view(existing, allowed),
            is_newly_generated: false,
        });
    }

    sub::check_entitlement(pool, cache, config, user_id, Feature::RecipeDetails)
        .await?
        .into_result()?;

    let days = parser::structure_days(&meal_plan.description, false);
    let meal_name = usize::try_from(day_index)
        .ok()
        .and_then(|index| days.get(index))
        .and_then(|day| day.meals.get(meal_slot))
        .filter(|meal| *meal != meal_slot.filler())
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "No {} planned for day {} of meal plan {}",
                meal_slot, day_index, meal_plan_id
            ))
        })?
        .to_string();

    let generated = assist::generate_recipe(client, &meal_name).await?;
    let data = generated_recipe_request(user_id, slot.clone(), generated);

    match insert_with_activity(pool, cache, data).await {
        Ok(recipe) => Ok(SlotRecipeResponse {
            recipe: recipe_view(recipe, allowed),
            is_newly_generated: true,
        }),
        // a concurrent request filled the slot first
        Err(e) => match db::recipe::get_recipe_for_slot(pool, &slot).await? {
            Some(existing) => Ok(SlotRecipeResponse {
                recipe: recipe_view(existing, allowed),
                is_newly_generated: false,
            }),
            None => Err(e),
        },
    }
}

pub fn generated_recipe_request(
    user_id: Uuid,
    slot: RecipeSlot,
    generated: GeneratedRecipe,
) -> RecipeCreateRequest {
    let servings = generated.servings_count();
    RecipeCreateRequest {
        user_id,
        slot: Some(slot),
        title: generated.title.trim().to_string(),
        description: generated.description,
        ingredients: serde_json::to_string(&generated.ingredients).unwrap_or_default(),
        instructions: serde_json::to_string(&generated.instructions).unwrap_or_default(),
        prep_time: generated.prep_time,
        cook_time: generated.cook_time,
        servings,
        difficulty: generated.difficulty,
        nutrition_info: generated.nutrition_info,
        tips: (!generated.tips.is_empty()).then(|| json!(generated.tips)),
        is_ai_generated: true,
    }
}

async fn insert_with_activity(
    pool: &PgPool,
    cache: &dyn CacheStore,
    data: RecipeCreateRequest,
) -> Res<Recipe> {
    let user_id = data.user_id;
    let mut tx = pool.begin().await?;
    let recipe = db::recipe::insert_recipe(&mut *tx, data).await?;
    db::activity::insert_activity(
        &mut *tx,
        user_id,
        ActivityAction::CreateRecipe,
        json!({
            "recipe_id": recipe.id,
            "title": recipe.title,
            "is_ai_generated": recipe.is_ai_generated,
        }),
    )
    .await?;
    tx.commit().await?;

    cache::invalidate(
        cache,
        Entity::Recipe {
            owner: user_id,
            id: recipe.id,
        },
    )
    .await;
    Ok(recipe)
}
