mod cors;
mod redis;

use std::{sync::Arc, time::Duration};

use actix_web::{
    App, HttpServer,
    web::{self},
};
use cache::{SharedCache, store::redis::RedisCache};
use common::env_config::Config;
use generator::{Generator, OpenAiClient, RetryingClient, TaskRegistry, store::PgPlanStore};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // get env vars
    let config = Config::from_env();

    // init logger
    logger::setup(&config.log_file, config.console_logging_enabled)
        .expect("Failed to set up logger");

    // init db connection
    let pool = db::setup(&config.database_url, config.is_production())
        .await
        .expect("Failed to set up database");

    // init Redis backed cache
    let cache: SharedCache = Arc::new(RedisCache::new(redis::setup_redis(&config)));

    // init completion provider and generation pipeline
    let completion = OpenAiClient::new(&config.completion)
        .expect("Failed to create completion client");
    let completion = Arc::new(RetryingClient::from_config(completion, &config.completion));
    let store = Arc::new(PgPlanStore::new(
        Arc::clone(&pool),
        Arc::clone(&cache),
        Arc::clone(&config),
    ));
    let generator = Arc::new(Generator::new(
        completion,
        store,
        Arc::clone(&cache),
        config.completion.output_format,
    ));
    let registry = Arc::new(TaskRegistry::new(Duration::from_secs(
        config.limits.task_retention_secs,
    )));

    // limiters are shared by every worker
    let global_limiter = limiter::global_middleware(config.limits.global_requests_per_second);
    let generation_limiter = limiter::user_middleware(
        config.limits.generation_requests,
        Duration::from_secs(config.limits.generation_window_secs),
    );
    let feedback_limiter = limiter::user_middleware(
        config.limits.feedback_requests,
        Duration::from_secs(config.limits.feedback_window_secs),
    );

    let origin = config.cors_allowed_origin.clone();
    let config_data = Arc::clone(&config);

    log::info!(
        "Starting server on {}:{}",
        config.server_host,
        config.server_port
    );

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(Arc::clone(&pool)))
            .app_data(web::Data::new(Arc::clone(&config_data)))
            .app_data(web::Data::new(Arc::clone(&cache)))
            .app_data(web::Data::new(Arc::clone(&generator)))
            .app_data(web::Data::new(Arc::clone(&registry)))
            .wrap(global_limiter.clone()) // 3rd
            .wrap(logger::middleware()) // 2nd
            .wrap(cors::middleware(&origin)) // 1st
            .service(
                web::scope("/api")
                    .service(api_subs::mount_webhook())
                    .service(api_subs::mount_tiers())
                    .service(
                        web::scope("/dashboard")
                            .wrap(api_auth::auth_middleware(Arc::clone(&config_data)))
                            .service(api_auth::mount_user())
                            .service(api_meals::mount_meals(generation_limiter.clone()))
                            .service(api_meals::mount_recipes())
                            .service(api_meals::mount_assistant())
                            .service(api_meals::mount_activity())
                            .service(api_meals::mount_feedback(feedback_limiter.clone()))
                            .service(api_subs::mount_subs()),
                    ),
            )
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .workers(config.num_workers)
    .run()
    .await
}
