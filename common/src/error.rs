use actix_web::HttpResponse;
use thiserror::Error;

pub type Res<T> = std::result::Result<T, AppError>;

/// Message shown to users when the completion provider fails.
pub const SERVICE_FAILURE_MESSAGE: &str =
    "We couldn't generate a response right now. Please try again later.";

/// Message shown to users when the completion output breaks the format contract.
pub const FORMAT_FAILURE_MESSAGE: &str = "invalid response format";

#[derive(Error, Debug)]
pub enum AppError {
    // === CONVERSION ERRORS ===
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JWT error: {0}")]
    JWT(#[from] jsonwebtoken::errors::Error),

    #[error("Reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Stripe error: {0}")]
    Stripe(#[from] stripe::StripeError),

    // === APPLICATION ERRORS ===
    #[error("Authorization error: {0}")]
    Unauthorized(String),

    #[error("Resource conflict: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Too Many Requests: {0}")]
    TooManyRequests(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("{0}")]
    Internal(String),

    // === GENERATION ERRORS ===
    /// The user's tier does not cover the requested feature.
    #[error("{0}")]
    UpgradeRequired(String),

    /// The external completion service failed (network, timeout, quota).
    #[error("Service error: {0}")]
    Service(String),

    /// The completion output did not follow the expected contract.
    #[error("Format error: {0}")]
    Format(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// True for denials the frontend should answer with an upgrade prompt.
    pub fn requires_upgrade(&self) -> bool {
        matches!(self, AppError::UpgradeRequired(_))
    }

    /// Message that is safe to hand back to the user in a `{success: false}` body.
    pub fn user_message(&self) -> String {
        match self {
            AppError::UpgradeRequired(message) | AppError::Validation(message) => {
                message.clone()
            }
            AppError::Service(_) => SERVICE_FAILURE_MESSAGE.to_string(),
            AppError::Format(_) => FORMAT_FAILURE_MESSAGE.to_string(),
            AppError::Unauthorized(_)
            | AppError::Forbidden(_)
            | AppError::NotFound(_)
            | AppError::BadRequest(_)
            | AppError::TooManyRequests(_) => self.to_string(),
            _ => {
                if cfg!(debug_assertions) {
                    self.to_string()
                } else {
                    "Internal server error".to_string()
                }
            }
        }
    }

    pub fn to_http_response(&self) -> HttpResponse {
        let is_dev = cfg!(debug_assertions);

        let to_internal_json = |err_msg: &str| {
            if is_dev {
                serde_json::json!({ "success": false, "error": err_msg })
            } else {
                serde_json::json!({ "success": false, "error": "Internal server error" })
            }
        };
        let to_json = || serde_json::json!({ "success": false, "error": self.to_string() });

        match self {
            // === CONVERSION ERRORS ===
            AppError::Database(error) => {
                log::error!("Database error: {}", error);
                HttpResponse::InternalServerError().json(to_internal_json(&error.to_string()))
            }
            AppError::JWT(_) => HttpResponse::Unauthorized().json(to_json()),
            AppError::Reqwest(error) => {
                log::error!("Reqwest error: {}", error);
                HttpResponse::InternalServerError().json(to_internal_json(&error.to_string()))
            }
            AppError::Stripe(error) => {
                log::error!("Stripe error: {}", error);
                HttpResponse::InternalServerError().json(to_internal_json(&error.to_string()))
            }

            // === APPLICATION ERRORS ===
            AppError::Unauthorized(_) => HttpResponse::Unauthorized().json(to_json()),
            AppError::Forbidden(_) => HttpResponse::Forbidden().json(to_json()),
            AppError::NotFound(_) => HttpResponse::NotFound().json(to_json()),
            AppError::BadRequest(_) => HttpResponse::BadRequest().json(to_json()),
            AppError::TooManyRequests(_) => HttpResponse::TooManyRequests().json(to_json()),
            AppError::Cache(error) => {
                log::error!("Cache error: {}", error);
                HttpResponse::InternalServerError().json(to_internal_json(error))
            }
            AppError::Internal(error) => {
                log::error!("Internal error: {}", error);
                HttpResponse::InternalServerError().json(to_internal_json(error))
            }

            // === GENERATION ERRORS ===
            AppError::UpgradeRequired(message) => {
                HttpResponse::Forbidden().json(serde_json::json!({
                    "success": false,
                    "requires_upgrade": true,
                    "error": message,
                }))
            }
            AppError::Service(error) => {
                log::error!("Completion service error: {}", error);
                HttpResponse::BadGateway().json(
                    serde_json::json!({ "success": false, "error": SERVICE_FAILURE_MESSAGE }),
                )
            }
            AppError::Format(error) => {
                log::warn!("Completion format error: {}", error);
                HttpResponse::BadGateway().json(
                    serde_json::json!({ "success": false, "error": FORMAT_FAILURE_MESSAGE }),
                )
            }
            AppError::Validation(message) => HttpResponse::BadRequest()
                .json(serde_json::json!({ "success": false, "error": message })),
        }
    }
}

impl actix_web::ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        self.to_http_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;

    #[test]
    fn statuses_follow_error_kind() {
        let cases = [
            (AppError::UpgradeRequired("x".into()), StatusCode::FORBIDDEN),
            (AppError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (AppError::Service("x".into()), StatusCode::BAD_GATEWAY),
            (AppError::Format("x".into()), StatusCode::BAD_GATEWAY),
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AppError::TooManyRequests("x".into()), StatusCode::TOO_MANY_REQUESTS),
        ];
        for (error, status) in cases {
            assert_eq!(error.to_http_response().status(), status, "{error:?}");
        }
    }

    #[test]
    fn user_messages_hide_provider_details() {
        let service = AppError::Service("connection reset by 10.0.0.3".into());
        assert_eq!(service.user_message(), SERVICE_FAILURE_MESSAGE);

        let format = AppError::Format("no marker".into());
        assert_eq!(format.user_message(), "invalid response format");

        let denied = AppError::UpgradeRequired("This feature requires a weekly subscription".into());
        assert!(denied.requires_upgrade());
        assert_eq!(
            denied.user_message(),
            "This feature requires a weekly subscription"
        );
        assert!(!format.requires_upgrade());
    }
}
