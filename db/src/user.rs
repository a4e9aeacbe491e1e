use common::error::{AppError, Res};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::models::user::User;

/// Records the identity on first sight and refreshes `last_seen_at` afterwards.
pub async fn upsert_user<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
    email: Option<&str>,
) -> Res<User> {
    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, email)
        VALUES ($1, $2)
        ON CONFLICT (id) DO UPDATE
        SET email = COALESCE(EXCLUDED.email, users.email), last_seen_at = NOW()
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(email)
    .fetch_one(executor)
    .await
    .map_err(AppError::from)
}

pub async fn get_user_by_id<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
) -> Res<User> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {}", user_id)))
}
