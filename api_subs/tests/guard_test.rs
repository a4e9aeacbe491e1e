use actix_web::{
    App, HttpMessage, HttpResponse,
    dev::Service,
    http::StatusCode,
    test, web,
};
use api_subs::entitlement::Feature;
use common::jwt::JwtClaims;
use uuid::Uuid;

async fn ok_handler() -> HttpResponse {
    HttpResponse::Ok().finish()
}

#[actix_web::test]
async fn guard_without_claims_is_unauthorized() {
    let app = test::init_service(
        App::new().service(
            web::scope("/assistant")
                .wrap(api_subs::feature_guard(Feature::AssistantChat))
                .route("/chat", web::post().to(ok_handler)),
        ),
    )
    .await;

    let req = test::TestRequest::post().uri("/assistant/chat").to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let body: serde_json::Value = test::read_body_json(res).await;
    assert_eq!(body["success"], false);
}

#[actix_web::test]
async fn guard_without_app_data_fails_closed() {
    let claims = JwtClaims {
        user_id: Uuid::new_v4(),
        email: None,
        exp: usize::MAX,
    };
    let app = test::init_service(
        App::new().service(
            web::scope("/assistant")
                .wrap(api_subs::feature_guard(Feature::AssistantChat))
                .wrap_fn(move |req, srv| {
                    req.extensions_mut().insert(claims.clone());
                    srv.call(req)
                })
                .route("/chat", web::post().to(ok_handler)),
        ),
    )
    .await;

    let req = test::TestRequest::post().uri("/assistant/chat").to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
