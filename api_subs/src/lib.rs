use actix_web::web::{self};
use entitlement::Feature;
use middleware::guard::FeatureGuard;

pub mod entitlement;
pub mod pricing;

pub mod routes {
    pub mod pay;
    pub mod sub;
}

pub mod middleware {
    pub mod guard;
}

pub mod services {
    pub mod pay;
    pub mod sub;
}

pub mod dtos {
    pub mod sub;
}

mod misc {
    pub(crate) mod pay;
}

pub fn mount_subs() -> actix_web::Scope {
    web::scope("/sub")
        .service(routes::sub::get_current)
        .service(routes::sub::get_entitlement)
        .service(routes::sub::post_checkout)
        .service(routes::sub::post_cancel)
        .service(routes::sub::get_payments)
}
pub fn mount_tiers() -> actix_web::Scope {
    web::scope("/tiers").service(routes::sub::get_tiers)
}
pub fn mount_webhook() -> actix_web::Scope {
    web::scope("/pay").service(routes::pay::post_webhook)
}

pub fn feature_guard(feature: Feature) -> FeatureGuard {
    FeatureGuard::new(feature)
}
