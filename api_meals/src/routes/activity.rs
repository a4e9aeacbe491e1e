use std::sync::Arc;

use actix_web::{Responder, get, web};
use common::{error::Res, http::Success, jwt::JwtClaims};
use sqlx::PgPool;

use crate::{
    dtos::meal::{ActivityQuery, ActivityResponse},
    services,
};

/// Recent actions of the user, newest first. `limit` defaults to 20, at most 100.
#[get("")]
pub async fn get_activity(
    claims: web::ReqData<JwtClaims>,
    query: web::Query<ActivityQuery>,
    pool: web::Data<Arc<PgPool>>,
) -> Res<impl Responder> {
    let limit = services::meal::activity_limit(query.limit);
    let activities = services::meal::recent_activity(&pool, claims.user_id, limit).await?;
    Success::ok(ActivityResponse { activities })
}
