use common::error::{AppError, Res};
use sqlx::{Executor, Postgres, types::JsonValue};
use uuid::Uuid;

use crate::models::activity::{Activity, ActivityAction};

pub async fn insert_activity<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
    action: ActivityAction,
    details: JsonValue,
) -> Res<()> {
    sqlx::query("INSERT INTO user_activity (user_id, action, details) VALUES ($1, $2, $3)")
        .bind(user_id)
        .bind(action.as_str())
        .bind(details)
        .execute(executor)
        .await
        .map_err(AppError::from)?;

    Ok(())
}

pub async fn get_recent_activity<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
    limit: i64,
) -> Res<Vec<Activity>> {
    sqlx::query_as::<_, Activity>(
        "SELECT * FROM user_activity WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2",
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(executor)
    .await
    .map_err(AppError::from)
}
