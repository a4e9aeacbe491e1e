use std::{future::Future, pin::Pin, rc::Rc};

use actix_web::{
    Error, HttpMessage,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::header::AUTHORIZATION,
};
use common::{error::AppError, jwt};
use futures::future::{Ready, ok};

/// Requires a valid `Authorization: Bearer <jwt>` header and stores the
/// decoded [`jwt::JwtClaims`] in the request extensions.
pub struct AuthMiddleware {
    secret: Rc<String>,
}

impl AuthMiddleware {
    pub fn new(secret: String) -> Self {
        AuthMiddleware {
            secret: Rc::new(secret),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<actix_web::body::BoxBody>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AuthMiddlewareService {
            service: Rc::new(service),
            secret: self.secret.clone(),
        })
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
    secret: Rc<String>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<actix_web::body::BoxBody>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let claims = req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|header| header.to_str().ok())
            .and_then(jwt::bearer_token)
            .ok_or_else(|| AppError::Unauthorized("No authorization token provided".to_string()))
            .and_then(|token| jwt::validate_jwt(token, &self.secret));

        let srv = Rc::clone(&self.service);

        Box::pin(async move {
            match claims {
                Ok(claims) => {
                    req.extensions_mut().insert(claims);
                    srv.call(req).await.map(|res| res.map_into_boxed_body())
                }
                Err(e) => {
                    log::debug!("Rejected {}: {}", req.path(), e);
                    let e = match e {
                        AppError::Unauthorized(_) => e,
                        _ => AppError::Unauthorized("Invalid token".to_string()),
                    };
                    Ok(req.error_response(e))
                }
            }
        })
    }
}
