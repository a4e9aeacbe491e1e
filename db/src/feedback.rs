use common::error::{AppError, Res};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    dtos::feedback::FeedbackCreateRequest,
    models::feedback::{Feedback, FeedbackStats},
};

pub async fn insert_feedback<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    req: FeedbackCreateRequest,
) -> Res<Feedback> {
    sqlx::query_as::<_, Feedback>(
        r#"
        INSERT INTO user_feedback (user_id, feedback_type, subject, message)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(req.user_id)
    .bind(req.feedback_type.as_str())
    .bind(req.subject)
    .bind(req.message)
    .fetch_one(executor)
    .await
    .map_err(AppError::from)
}

/// Flips `is_resolved` and returns the updated entry.
pub async fn toggle_resolved<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    feedback_id: Uuid,
) -> Res<Feedback> {
    sqlx::query_as::<_, Feedback>(
        "UPDATE user_feedback SET is_resolved = NOT is_resolved WHERE id = $1 RETURNING *",
    )
    .bind(feedback_id)
    .fetch_optional(executor)
    .await?
    .ok_or_else(|| AppError::NotFound("Feedback not found".to_string()))
}

pub async fn get_recent_feedback<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    limit: i64,
) -> Res<Vec<Feedback>> {
    sqlx::query_as::<_, Feedback>("SELECT * FROM user_feedback ORDER BY created_at DESC LIMIT $1")
        .bind(limit)
        .fetch_all(executor)
        .await
        .map_err(AppError::from)
}

pub async fn get_feedback_stats<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
) -> Res<FeedbackStats> {
    let (total, resolved): (i64, i64) = sqlx::query_as(
        "SELECT COUNT(*), COUNT(*) FILTER (WHERE is_resolved) FROM user_feedback",
    )
    .fetch_one(executor)
    .await?;
    Ok(FeedbackStats::new(total, resolved))
}
