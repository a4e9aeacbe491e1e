use std::sync::Arc;

use actix_web::{Responder, get, web};
use common::{http::Success, jwt::JwtClaims};
use sqlx::PgPool;

use crate::services;

/// Endpoint to retrieve the current authenticated user's information.
///
/// Users are managed by the identity provider; the first call with a new token
/// records the user locally, later calls refresh `last_seen_at`.
///
/// # Input
/// - `claims`: The JWT claims extracted from the authentication token, containing the user ID
/// - `pool`: A database connection pool for storing user data
///
/// # Output
/// - Success: Returns a JSON object with the user's record
/// - Error: Returns 401 Unauthorized if no valid token is provided
///
/// # Frontend Example
/// ```javascript
/// const response = await fetch('/api/dashboard/me', {
///   headers: {
///     'Authorization': `Bearer ${localStorage.getItem('authToken')}`
///   }
/// });
///
/// if (response.ok) {
///   const user = await response.json();
///   // {
///   //   id: "a1b2c3d4-...",
///   //   email: "user@example.com",
///   //   created_at: "2025-01-01T12:00:00Z",
///   //   last_seen_at: "2025-01-03T08:30:00Z"
///   // }
/// }
/// ```
#[get("")]
pub async fn get_me(
    claims: web::ReqData<JwtClaims>,
    pool: web::Data<Arc<PgPool>>,
) -> impl Responder {
    let user = services::user::get_or_register(&pool, &claims).await?;
    Success::ok(user)
}
