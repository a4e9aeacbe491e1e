use std::{rc::Rc, time::Instant};

use actix_web::{
    Error, HttpMessage,
    body::MessageBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use colored::Colorize;
use common::jwt::JwtClaims;
use futures::future::{LocalBoxFuture, Ready, ready};
use log::info;

/// Logs one line per request: status, method, path, latency and the caller.
pub struct LoggerMiddleware {}

impl LoggerMiddleware {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for LoggerMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, B> Transform<S, ServiceRequest> for LoggerMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = LoggerMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(LoggerMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct LoggerMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for LoggerMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let method = req.method().to_string();
        let path = req.path().to_string();
        let query_string = req.query_string().to_string();
        let started = Instant::now();
        let srv = Rc::clone(&self.service);

        Box::pin(async move {
            let res = srv.call(req).await?;

            // claims are attached by the auth middleware further in
            let user_id = res
                .request()
                .extensions()
                .get::<JwtClaims>()
                .map_or("None".to_string(), |claims| claims.user_id.to_string());
            let status_code = res.status().as_u16();

            let colored_status = match status_code {
                200..=299 => status_code.to_string().green(),
                300..=399 => status_code.to_string().yellow(),
                400..=499 => status_code.to_string().bright_red(),
                _ => status_code.to_string().red(),
            };
            let colored_method = match method.as_str() {
                "GET" => method.blue(),
                "POST" => method.yellow(),
                "PUT" => method.purple(),
                "DELETE" => method.red(),
                _ => method.normal(),
            };

            info!(
                "[{}] {} {} {} user_id={} params={}",
                colored_status,
                colored_method,
                path.bright_white(),
                format!("({}ms)", started.elapsed().as_millis()).bright_black(),
                user_id.bright_blue(),
                query_string.bright_cyan(),
            );

            Ok(res)
        })
    }
}
