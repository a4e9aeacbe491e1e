use std::{future::Future, pin::Pin, rc::Rc, sync::Arc};

use actix_web::{
    Error, HttpMessage,
    body::BoxBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    web,
};
use cache::SharedCache;
use common::{env_config::Config, error::AppError, jwt::JwtClaims};
use futures::future::{Ready, ok};
use sqlx::PgPool;

use crate::{
    entitlement::{Entitlement, Feature},
    services,
};

/// Rejects requests from users whose subscription does not unlock `feature`.
/// Must be wrapped inside the auth middleware so that [`JwtClaims`] are present.
pub struct FeatureGuard {
    feature: Feature,
}

impl FeatureGuard {
    pub fn new(feature: Feature) -> Self {
        FeatureGuard { feature }
    }
}

impl<S, B> Transform<S, ServiceRequest> for FeatureGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Transform = FeatureGuardService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(FeatureGuardService {
            service: Rc::new(service),
            feature: self.feature,
        })
    }
}

pub struct FeatureGuardService<S> {
    service: Rc<S>,
    feature: Feature,
}

impl<S, B> Service<ServiceRequest> for FeatureGuardService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = Rc::clone(&self.service);
        let feature = self.feature;

        Box::pin(async move {
            let user_id = req.extensions().get::<JwtClaims>().map(|c| c.user_id);
            let Some(user_id) = user_id else {
                return Ok(req.error_response(AppError::Unauthorized(
                    "No authorization token provided".to_string(),
                )));
            };

            let pool = req.app_data::<web::Data<Arc<PgPool>>>().cloned();
            let cache = req.app_data::<web::Data<SharedCache>>().cloned();
            let config = req.app_data::<web::Data<Arc<Config>>>().cloned();
            let (Some(pool), Some(cache), Some(config)) = (pool, cache, config) else {
                return Ok(req.error_response(AppError::Internal(
                    "Feature guard is missing application data".to_string(),
                )));
            };

            let decision =
                services::sub::check_entitlement(&pool, &***cache, &config, user_id, feature)
                    .await
                    .and_then(Entitlement::into_result);
            match decision {
                Ok(()) => srv.call(req).await.map(|res| res.map_into_boxed_body()),
                Err(e) => {
                    if e.requires_upgrade() {
                        log::info!("User {} denied {}", user_id, feature);
                    }
                    Ok(req.error_response(e))
                }
            }
        })
    }
}
