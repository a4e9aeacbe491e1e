use actix_web::{
    Error,
    body::{BoxBody, MessageBody},
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use common::error::AppError;
use governor::{
    DefaultDirectRateLimiter, Quota, RateLimiter,
    clock::{Clock, DefaultClock},
};
use std::{future::Future, num::NonZeroU32, pin::Pin, rc::Rc, sync::Arc};

/// Caps the request rate of the whole server, regardless of who is calling.
#[derive(Clone)]
pub struct GlobalLimiter {
    limiter: Arc<DefaultDirectRateLimiter>,
}

impl GlobalLimiter {
    pub fn new(permits_per_second: u32) -> Self {
        let per_second = NonZeroU32::new(permits_per_second).unwrap_or(NonZeroU32::MIN);
        GlobalLimiter {
            limiter: Arc::new(RateLimiter::direct(Quota::per_second(per_second))),
        }
    }

    /// `None` when the request may proceed, otherwise the seconds until the next permit.
    fn acquire(&self) -> Option<u64> {
        self.limiter.check().err().map(|not_until| {
            not_until
                .wait_time_from(DefaultClock::default().now())
                .as_secs()
                .max(1)
        })
    }
}

impl<S, B> Transform<S, ServiceRequest> for GlobalLimiter
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Transform = GlobalLimiterService<S>;
    type InitError = ();
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(GlobalLimiterService {
            service: Rc::new(service),
            limiter: self.clone(),
        }))
    }
}

pub struct GlobalLimiterService<S> {
    service: Rc<S>,
    limiter: GlobalLimiter,
}

impl<S, B> Service<ServiceRequest> for GlobalLimiterService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = Rc::clone(&self.service);
        let wait = self.limiter.acquire();

        Box::pin(async move {
            match wait {
                None => srv.call(req).await.map(|res| res.map_into_boxed_body()),
                Some(secs) => {
                    log::warn!("Global rate limit reached, rejecting {}", req.path());
                    Ok(req.error_response(AppError::TooManyRequests(format!(
                        "Server overloaded. Please try again in {} seconds.",
                        secs
                    ))))
                }
            }
        })
    }
}
