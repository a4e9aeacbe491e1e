use common::error::{AppError, Res};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{dtos::meal_plan::GroceryListCreateRequest, models::grocery_list::GroceryList};

pub async fn insert_grocery_list<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    data: GroceryListCreateRequest,
) -> Res<GroceryList> {
    sqlx::query_as::<_, GroceryList>(
        r#"
        INSERT INTO grocery_lists (user_id, meal_plan_id, items)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(data.user_id)
    .bind(data.meal_plan_id)
    .bind(data.items)
    .fetch_one(executor)
    .await
    .map_err(AppError::from)
}

pub async fn get_latest_grocery_list<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
) -> Res<Option<GroceryList>> {
    sqlx::query_as::<_, GroceryList>(
        "SELECT * FROM grocery_lists WHERE user_id = $1 ORDER BY created_at DESC LIMIT 1",
    )
    .bind(user_id)
    .fetch_optional(executor)
    .await
    .map_err(AppError::from)
}

pub async fn get_grocery_lists_by_user<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
) -> Res<Vec<GroceryList>> {
    sqlx::query_as::<_, GroceryList>(
        "SELECT * FROM grocery_lists WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(executor)
    .await
    .map_err(AppError::from)
}

pub async fn get_grocery_list_for_plan<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    meal_plan_id: Uuid,
    user_id: Uuid,
) -> Res<Option<GroceryList>> {
    sqlx::query_as::<_, GroceryList>(
        r#"
        SELECT * FROM grocery_lists
        WHERE meal_plan_id = $1 AND user_id = $2
        ORDER BY created_at DESC
        LIMIT 1
        "#,
    )
    .bind(meal_plan_id)
    .bind(user_id)
    .fetch_optional(executor)
    .await
    .map_err(AppError::from)
}
