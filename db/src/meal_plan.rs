use chrono::{DateTime, Utc};
use common::error::{AppError, Res};
use sqlx::{Executor, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{dtos::meal_plan::MealPlanCreateRequest, models::meal_plan::MealPlan};

pub async fn insert_meal_plan<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    data: MealPlanCreateRequest,
) -> Res<MealPlan> {
    sqlx::query_as::<_, MealPlan>(
        r#"
        INSERT INTO meal_plans (user_id, name, description)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(data.user_id)
    .bind(data.name)
    .bind(data.description)
    .fetch_one(executor)
    .await
    .map_err(AppError::from)
}

pub async fn get_meal_plans_by_user<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
) -> Res<Vec<MealPlan>> {
    sqlx::query_as::<_, MealPlan>(
        "SELECT * FROM meal_plans WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(executor)
    .await
    .map_err(AppError::from)
}

/// Fetches a plan owned by `user_id`; plans of other users are reported as missing.
pub async fn get_meal_plan<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    meal_plan_id: Uuid,
    user_id: Uuid,
) -> Res<MealPlan> {
    sqlx::query_as::<_, MealPlan>("SELECT * FROM meal_plans WHERE id = $1 AND user_id = $2")
        .bind(meal_plan_id)
        .bind(user_id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Meal plan {}", meal_plan_id)))
}

pub async fn delete_meal_plan<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    meal_plan_id: Uuid,
    user_id: Uuid,
) -> Res<()> {
    let result = sqlx::query("DELETE FROM meal_plans WHERE id = $1 AND user_id = $2")
        .bind(meal_plan_id)
        .bind(user_id)
        .execute(executor)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Meal plan {}", meal_plan_id)));
    }
    Ok(())
}

/// Counts the user's plans, optionally only those created at or after `since`.
pub async fn count_meal_plans<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
    since: Option<DateTime<Utc>>,
) -> Res<i64> {
    let mut qb: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT COUNT(*) FROM meal_plans WHERE user_id = ");
    qb.push_bind(user_id);

    if let Some(since) = since {
        qb.push(" AND created_at >= ").push_bind(since);
    }

    qb.build_query_scalar::<i64>()
        .fetch_one(executor)
        .await
        .map_err(AppError::from)
}
