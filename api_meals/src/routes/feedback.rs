use std::sync::Arc;

use actix_web::{Responder, get, post, web};
use common::{env_config::Config, error::Res, http::Success, jwt::JwtClaims};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{dtos::feedback::FeedbackBody, services};

/// Submits feedback. Limited to a few submissions per user per hour.
///
/// # Input
/// - `feedback_type`: `bug`, `feature`, `improvement` or `other`
/// - `subject`: up to 200 characters
/// - `message`: not empty
///
/// # Output
/// - Success (201): the stored feedback
/// - 400 when validation fails, 429 when the limit is reached
///
/// # Frontend Example
/// ```javascript
/// await fetch('/api/dashboard/feedback', {
///   method: 'POST',
///   headers: { 'Authorization': `Bearer ${token}`, 'Content-Type': 'application/json' },
///   body: JSON.stringify({ feedback_type: 'feature', subject: 'Yoruba recipes', message: '...' })
/// });
/// ```
pub async fn post_feedback(
    claims: web::ReqData<JwtClaims>,
    pool: web::Data<Arc<PgPool>>,
    body: web::Json<FeedbackBody>,
) -> Res<impl Responder> {
    let feedback =
        services::feedback::submit_feedback(&pool, claims.user_id, body.into_inner()).await?;
    Success::created(feedback)
}

/// Staff only. Totals and the 50 most recent entries.
#[get("/review")]
pub async fn get_review(
    claims: web::ReqData<JwtClaims>,
    pool: web::Data<Arc<PgPool>>,
    config: web::Data<Arc<Config>>,
) -> Res<impl Responder> {
    let overview = services::feedback::overview(&pool, &config, claims.user_id).await?;
    Success::ok(overview)
}

/// Staff only. Toggles the resolved flag of one entry.
///
/// # Output
/// - Success: `{ success: true, is_resolved, feedback_stats: { total, resolved, unresolved } }`
/// - 403 for non-staff users, 404 when the entry does not exist
#[post("/{id}/resolve")]
pub async fn post_resolve(
    claims: web::ReqData<JwtClaims>,
    path: web::Path<Uuid>,
    pool: web::Data<Arc<PgPool>>,
    config: web::Data<Arc<Config>>,
) -> Res<impl Responder> {
    let status =
        services::feedback::toggle_resolved(&pool, &config, claims.user_id, path.into_inner())
            .await?;
    Success::ok(status)
}
