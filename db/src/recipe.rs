use common::error::{AppError, Res};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    dtos::recipe::{RecipeCreateRequest, RecipeSlot, RecipeUpdateRequest},
    models::recipe::Recipe,
};

pub async fn insert_recipe<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    data: RecipeCreateRequest,
) -> Res<Recipe> {
    let (meal_plan_id, day_index, meal_type) = match data.slot {
        Some(slot) => (Some(slot.meal_plan_id), Some(slot.day_index), Some(slot.meal_type)),
        None => (None, None, None),
    };

    sqlx::query_as::<_, Recipe>(
        r#"
        INSERT INTO recipes (
            user_id, meal_plan_id, day_index, meal_type, title, description,
            ingredients, instructions, prep_time, cook_time, servings, difficulty,
            nutrition_info, tips, is_ai_generated
        )
        VALUES (
            $1, $2, $3, $4, $5, $6, $7, $8,
            COALESCE($9, '30 mins'), COALESCE($10, '45 mins'), COALESCE($11, 3),
            COALESCE($12, 'Intermediate'), $13, $14, $15
        )
        RETURNING *
        "#,
    )
    .bind(data.user_id)
    .bind(meal_plan_id)
    .bind(day_index)
    .bind(meal_type)
    .bind(data.title)
    .bind(data.description)
    .bind(data.ingredients)
    .bind(data.instructions)
    .bind(data.prep_time)
    .bind(data.cook_time)
    .bind(data.servings)
    .bind(data.difficulty)
    .bind(data.nutrition_info)
    .bind(data.tips)
    .bind(data.is_ai_generated)
    .fetch_one(executor)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            AppError::BadRequest("A recipe already exists for this meal slot".to_string())
        }
        e => AppError::from(e),
    })
}

pub async fn get_recipes_by_user<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
) -> Res<Vec<Recipe>> {
    sqlx::query_as::<_, Recipe>("SELECT * FROM recipes WHERE user_id = $1 ORDER BY created_at DESC")
        .bind(user_id)
        .fetch_all(executor)
        .await
        .map_err(AppError::from)
}

pub async fn get_recipe<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    recipe_id: Uuid,
    user_id: Uuid,
) -> Res<Recipe> {
    sqlx::query_as::<_, Recipe>("SELECT * FROM recipes WHERE id = $1 AND user_id = $2")
        .bind(recipe_id)
        .bind(user_id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Recipe {}", recipe_id)))
}

/// Recipes attached to the slots of a plan, in day order.
pub async fn get_recipes_for_plan<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    meal_plan_id: Uuid,
    user_id: Uuid,
) -> Res<Vec<Recipe>> {
    sqlx::query_as::<_, Recipe>(
        "SELECT * FROM recipes WHERE meal_plan_id = $1 AND user_id = $2 ORDER BY day_index, meal_type",
    )
    .bind(meal_plan_id)
    .bind(user_id)
    .fetch_all(executor)
    .await
    .map_err(AppError::from)
}

pub async fn get_recipe_for_slot<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    slot: &RecipeSlot,
) -> Res<Option<Recipe>> {
    sqlx::query_as::<_, Recipe>(
        "SELECT * FROM recipes WHERE meal_plan_id = $1 AND day_index = $2 AND meal_type = $3",
    )
    .bind(slot.meal_plan_id)
    .bind(slot.day_index)
    .bind(&slot.meal_type)
    .fetch_optional(executor)
    .await
    .map_err(AppError::from)
}

pub async fn update_recipe<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    recipe_id: Uuid,
    user_id: Uuid,
    data: RecipeUpdateRequest,
) -> Res<Recipe> {
    sqlx::query_as::<_, Recipe>(
        r#"
        UPDATE recipes SET
            title = COALESCE($3, title),
            description = COALESCE($4, description),
            ingredients = COALESCE($5, ingredients),
            instructions = COALESCE($6, instructions),
            prep_time = COALESCE($7, prep_time),
            cook_time = COALESCE($8, cook_time),
            servings = COALESCE($9, servings),
            difficulty = COALESCE($10, difficulty),
            updated_at = NOW()
        WHERE id = $1 AND user_id = $2
        RETURNING *
        "#,
    )
    .bind(recipe_id)
    .bind(user_id)
    .bind(data.title)
    .bind(data.description)
    .bind(data.ingredients)
    .bind(data.instructions)
    .bind(data.prep_time)
    .bind(data.cook_time)
    .bind(data.servings)
    .bind(data.difficulty)
    .fetch_optional(executor)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Recipe {}", recipe_id)))
}

pub async fn delete_recipe<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    recipe_id: Uuid,
    user_id: Uuid,
) -> Res<()> {
    let result = sqlx::query("DELETE FROM recipes WHERE id = $1 AND user_id = $2")
        .bind(recipe_id)
        .bind(user_id)
        .execute(executor)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Recipe {}", recipe_id)));
    }
    Ok(())
}
