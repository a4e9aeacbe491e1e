use std::sync::Arc;

use actix_web::{App, HttpResponse, http::StatusCode, test, web};
use common::{
    env_config::{Config, JwtConfig},
    jwt::{self, ClaimsSpec, JwtClaims},
};
use uuid::Uuid;

async fn whoami(claims: web::ReqData<JwtClaims>) -> HttpResponse {
    HttpResponse::Ok().body(claims.user_id.to_string())
}

fn config() -> Arc<Config> {
    Arc::new(Config {
        jwt_config: JwtConfig {
            secret: "test-secret".to_string(),
            expiration_hours: 1,
        },
        ..Default::default()
    })
}

#[actix_web::test]
async fn valid_token_exposes_claims() {
    let config = config();
    let user_id = Uuid::new_v4();
    let token = jwt::generate_jwt(
        ClaimsSpec {
            user_id,
            email: None,
        },
        &config.jwt_config,
    )
    .unwrap();

    let app = test::init_service(
        App::new().service(
            web::scope("/dashboard")
                .wrap(api_auth::auth_middleware(config.clone()))
                .route("/whoami", web::get().to(whoami)),
        ),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/dashboard/whoami")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_request();
    let body = test::call_and_read_body(&app, req).await;
    assert_eq!(body, user_id.to_string().as_bytes());
}

#[actix_web::test]
async fn missing_or_forged_tokens_are_rejected() {
    let config = config();
    let forged = jwt::generate_jwt(
        ClaimsSpec {
            user_id: Uuid::new_v4(),
            email: None,
        },
        &JwtConfig {
            secret: "someone-else".to_string(),
            expiration_hours: 1,
        },
    )
    .unwrap();

    let app = test::init_service(
        App::new().service(
            web::scope("/dashboard")
                .wrap(api_auth::auth_middleware(config))
                .route("/whoami", web::get().to(whoami)),
        ),
    )
    .await;

    let missing = test::TestRequest::get().uri("/dashboard/whoami").to_request();
    let res = test::call_service(&app, missing).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get()
        .uri("/dashboard/whoami")
        .insert_header(("Authorization", format!("Bearer {}", forged)))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = test::read_body_json(res).await;
    assert_eq!(body["success"], false);
}
