use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    env_config::JwtConfig,
    error::{AppError, Res},
};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtClaims {
    pub user_id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    pub exp: usize,
}

pub struct ClaimsSpec {
    pub user_id: Uuid,
    pub email: Option<String>,
}

/// Generates JWT token for the given identity and JWT configuration options.
/// Tokens normally come from the identity provider; this is used by tooling and tests.
pub fn generate_jwt(spec: ClaimsSpec, config: &JwtConfig) -> Res<String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(config.expiration_hours))
        .ok_or_else(|| AppError::Internal("JWT expiration out of range".to_string()))?
        .timestamp();

    let claims = JwtClaims {
        user_id: spec.user_id,
        email: spec.email,
        exp: expiration as usize,
    };

    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(AppError::from)
}

/// Extracts claims object from JWT token.
/// Requires JWT secret.
pub fn validate_jwt(token: &str, secret: &str) -> Res<JwtClaims> {
    let token_data = jsonwebtoken::decode::<JwtClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

/// Returns the token part of a `Bearer <token>` header value.
pub fn bearer_token(header_value: &str) -> Option<&str> {
    header_value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret".to_string(),
            expiration_hours: 1,
        }
    }

    #[test]
    fn issued_token_validates_with_same_secret() {
        let user_id = Uuid::new_v4();
        let token = generate_jwt(
            ClaimsSpec {
                user_id,
                email: Some("ada@example.com".to_string()),
            },
            &config(),
        )
        .unwrap();

        let claims = validate_jwt(&token, "test-secret").unwrap();
        assert_eq!(claims.user_id, user_id);
        assert_eq!(claims.email.as_deref(), Some("ada@example.com"));

        assert!(validate_jwt(&token, "other-secret").is_err());
    }

    #[test]
    fn bearer_prefix_is_required() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("Bearer   "), None);
        assert_eq!(bearer_token("Basic abc"), None);
    }
}
