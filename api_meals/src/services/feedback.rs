use common::{
    env_config::Config,
    error::{AppError, Res},
};
use db::{
    dtos::feedback::FeedbackCreateRequest,
    models::{activity::ActivityAction, feedback::Feedback},
};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::dtos::feedback::{FeedbackBody, FeedbackOverviewResponse, FeedbackStatusResponse};

const MAX_SUBJECT_LEN: usize = 200;
const MAX_MESSAGE_LEN: usize = 5000;
const RECENT_FEEDBACK_LIMIT: i64 = 50;

pub fn validate_feedback(user_id: Uuid, body: FeedbackBody) -> Res<FeedbackCreateRequest> {
    let feedback_type = body.feedback_type.parse()?;

    let subject = body.subject.trim();
    if subject.is_empty() || subject.chars().count() > MAX_SUBJECT_LEN {
        return Err(AppError::Validation(format!(
            "subject must be between 1 and {} characters",
            MAX_SUBJECT_LEN
        )));
    }
    let message = body.message.trim();
    if message.is_empty() || message.chars().count() > MAX_MESSAGE_LEN {
        return Err(AppError::Validation(format!(
            "message must be between 1 and {} characters",
            MAX_MESSAGE_LEN
        )));
    }

    Ok(FeedbackCreateRequest {
        user_id,
        feedback_type,
        subject: subject.to_string(),
        message: message.to_string(),
    })
}

pub fn ensure_staff(config: &Config, user_id: Uuid) -> Res<()> {
    if config.is_staff(user_id) {
        Ok(())
    } else {
        Err(AppError::Forbidden("Staff access required".to_string()))
    }
}

/// Stores the feedback and records the submission in the activity log.
pub async fn submit_feedback(pool: &PgPool, user_id: Uuid, body: FeedbackBody) -> Res<Feedback> {
    let req = validate_feedback(user_id, body)?;
    let details = json!({
        "feedback_type": req.feedback_type,
        "subject": req.subject,
    });

    let mut tx = pool.begin().await?;
    let feedback = db::feedback::insert_feedback(&mut *tx, req).await?;
    db::activity::insert_activity(&mut *tx, user_id, ActivityAction::Feedback, details).await?;
    tx.commit().await?;

    log::info!(
        "User {} submitted {} feedback {}",
        user_id,
        feedback.feedback_type,
        feedback.id
    );
    Ok(feedback)
}

pub async fn toggle_resolved(
    pool: &PgPool,
    config: &Config,
    user_id: Uuid,
    feedback_id: Uuid,
) -> Res<FeedbackStatusResponse> {
    ensure_staff(config, user_id)?;

    let feedback = db::feedback::toggle_resolved(pool, feedback_id).await?;
    let feedback_stats = db::feedback::get_feedback_stats(pool).await?;
    log::info!(
        "Staff {} marked feedback {} resolved={}",
        user_id,
        feedback_id,
        feedback.is_resolved
    );

    Ok(FeedbackStatusResponse {
        success: true,
        is_resolved: feedback.is_resolved,
        feedback_stats,
    })
}

pub async fn overview(
    pool: &PgPool,
    config: &Config,
    user_id: Uuid,
) -> Res<FeedbackOverviewResponse> {
    ensure_staff(config, user_id)?;

    Ok(FeedbackOverviewResponse {
        feedback_stats: db::feedback::get_feedback_stats(pool).await?,
        recent_feedback: db::feedback::get_recent_feedback(pool, RECENT_FEEDBACK_LIMIT).await?,
    })
}
