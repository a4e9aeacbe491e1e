use common::{error::Res, jwt::JwtClaims};
use db::models::user::User;
use sqlx::PgPool;

/// Local user record for the token holder, created on first sight.
pub async fn get_or_register(pool: &PgPool, claims: &JwtClaims) -> Res<User> {
    db::user::upsert_user(pool, claims.user_id, claims.email.as_deref()).await
}
