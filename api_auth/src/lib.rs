use std::sync::Arc;

use actix_web::web;
use common::env_config::Config;
use middleware::auth::AuthMiddleware;

pub mod middleware {
    pub mod auth;
}
pub mod routes {
    pub mod user;
}
mod services {
    pub(crate) mod user;
}

// Auth middleware
pub fn auth_middleware(config: Arc<Config>) -> AuthMiddleware {
    AuthMiddleware::new(config.jwt_config.secret.clone())
}

pub fn mount_user() -> actix_web::Scope {
    web::scope("/me").service(routes::user::get_me)
}
