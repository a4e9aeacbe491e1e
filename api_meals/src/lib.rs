use actix_web::web;
use api_subs::entitlement::Feature;
use limiter::middleware::user::UserRateLimiter;

pub mod routes {
    pub mod activity;
    pub mod assistant;
    pub mod feedback;
    pub mod meal;
    pub mod recipe;
}

pub mod services {
    pub mod feedback;
    pub mod meal;
    pub mod recipe;
}

pub mod dtos {
    pub mod feedback;
    pub mod meal;
    pub mod recipe;
}

/// Meal plan routes. Generation shares `limiter` so the per-user quota holds across workers.
pub fn mount_meals(limiter: UserRateLimiter) -> actix_web::Scope {
    web::scope("/meals")
        .service(
            web::scope("/generate")
                .wrap(limiter)
                .service(routes::meal::post_generate)
                .service(routes::meal::post_generate_async),
        )
        .service(routes::meal::get_task)
        .service(routes::meal::get_plans)
        .service(routes::meal::get_plan)
        .service(routes::meal::delete_plan)
        .service(routes::meal::get_latest_grocery_list)
        .service(routes::meal::get_grocery_lists)
}

pub fn mount_recipes() -> actix_web::Scope {
    web::scope("/recipes")
        .service(routes::recipe::get_slot_recipe)
        .service(routes::recipe::get_recipes)
        .service(routes::recipe::post_recipe)
        .service(routes::recipe::get_recipe)
        .service(routes::recipe::put_recipe)
        .service(routes::recipe::delete_recipe)
}

pub fn mount_assistant() -> actix_web::Scope<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    web::scope("/assistant")
        .wrap(api_subs::feature_guard(Feature::AssistantChat))
        .service(routes::assistant::post_chat)
}

pub fn mount_activity() -> actix_web::Scope {
    web::scope("/activity").service(routes::activity::get_activity)
}

/// Feedback routes. Only submission goes through `limiter`.
pub fn mount_feedback(limiter: UserRateLimiter) -> actix_web::Scope {
    web::scope("/feedback")
        .service(routes::feedback::get_review)
        .service(routes::feedback::post_resolve)
        .service(
            web::resource("")
                .wrap(limiter)
                .route(web::post().to(routes::feedback::post_feedback)),
        )
}
