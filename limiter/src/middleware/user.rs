use actix_web::{
    Error, HttpMessage,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use common::{error::AppError, jwt::JwtClaims};
use governor::{Quota, RateLimiter, clock::QuantaClock, state::keyed::DashMapStateStore};
use std::{future::Future, num::NonZeroU32, pin::Pin, rc::Rc, sync::Arc, time::Duration};
use uuid::Uuid;

type UserStateStore = DashMapStateStore<Uuid>;
type KeyedLimiter = RateLimiter<Uuid, UserStateStore, QuantaClock>;

/// Tracked users above which idle entries are dropped.
const RETAIN_THRESHOLD: usize = 10_000;

/// Allows each authenticated user `requests` calls per `window`.
///
/// Keys on the JWT claims, so it has to run inside the auth middleware.
/// Requests without claims are passed through.
#[derive(Clone)]
pub struct UserRateLimiter {
    limiter: Arc<KeyedLimiter>,
}

impl UserRateLimiter {
    pub fn new(requests: u32, window: Duration) -> Self {
        let burst = NonZeroU32::new(requests).unwrap_or(NonZeroU32::MIN);
        let period = (window / burst.get()).max(Duration::from_millis(1));
        let quota = Quota::with_period(period)
            .unwrap_or_else(|| Quota::per_second(burst))
            .allow_burst(burst);

        Self {
            limiter: Arc::new(RateLimiter::keyed(quota)),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for UserRateLimiter
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<actix_web::body::BoxBody>;
    type Error = Error;
    type Transform = UserRateLimiterService<S>;
    type InitError = ();
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(UserRateLimiterService {
            service: Rc::new(service),
            limiter: self.limiter.clone(),
        }))
    }
}

pub struct UserRateLimiterService<S> {
    service: Rc<S>,
    limiter: Arc<KeyedLimiter>,
}

impl<S, B> Service<ServiceRequest> for UserRateLimiterService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<actix_web::body::BoxBody>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = Rc::clone(&self.service);
        let limiter = self.limiter.clone();
        let user_id = req.extensions().get::<JwtClaims>().map(|claims| claims.user_id);

        Box::pin(async move {
            if let Some(user_id) = user_id {
                if limiter.check_key(&user_id).is_err() {
                    log::warn!("Generation rate limit reached for user {}", user_id);
                    return Ok(req.error_response(AppError::TooManyRequests(
                        "Too many generation requests. Please wait a minute and try again."
                            .to_string(),
                    )));
                }
                if limiter.len() > RETAIN_THRESHOLD {
                    limiter.retain_recent();
                }
            }

            srv.call(req).await.map(|res| res.map_into_boxed_body())
        })
    }
}
