use sqlx::{
    PgPool,
    postgres::{PgConnectOptions, PgPoolOptions, PgSslMode},
};
use std::{str::FromStr, sync::Arc};

const MAX_CONNECTIONS: u32 = 10;

pub mod activity;
pub mod feedback;
pub mod grocery_list;
pub mod meal_plan;
pub mod payment;
pub mod recipe;
pub mod subscription;
pub mod user;

pub mod models {
    pub mod activity;
    pub mod feedback;
    pub mod grocery_list;
    pub mod meal_plan;
    pub mod payment;
    pub mod recipe;
    pub mod subscription;
    pub mod user;
}

pub mod dtos {
    pub mod feedback;
    pub mod meal_plan;
    pub mod payment;
    pub mod recipe;
    pub mod subscription;
}

/// Connects to Postgres, creating the database on first start, and applies migrations.
pub async fn setup(
    database_url: &str,
    require_ssl: bool,
) -> Result<Arc<PgPool>, Box<dyn std::error::Error>> {
    ensure_database(database_url, require_ssl).await?;

    let pool = PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect_with(connect_options(database_url, require_ssl)?)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    log::info!("Database ready, migrations applied");

    Ok(Arc::new(pool))
}

fn connect_options(url: &str, require_ssl: bool) -> Result<PgConnectOptions, sqlx::Error> {
    let options = PgConnectOptions::from_str(url)?;
    Ok(if require_ssl {
        options.ssl_mode(PgSslMode::Require)
    } else {
        options
    })
}

/// Creates the target database through the `postgres` maintenance database when missing.
async fn ensure_database(
    database_url: &str,
    require_ssl: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut maintenance_url = url::Url::parse(database_url)?;
    let db_name = maintenance_url.path().trim_start_matches('/').to_string();
    maintenance_url.set_path("/postgres");

    let maintenance =
        PgPool::connect_with(connect_options(maintenance_url.as_str(), require_ssl)?).await?;

    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM pg_database WHERE datname = $1)")
            .bind(&db_name)
            .fetch_one(&maintenance)
            .await?;

    if !exists {
        log::info!("Creating database {}", db_name);
        sqlx::query(&format!("CREATE DATABASE \"{}\"", db_name))
            .execute(&maintenance)
            .await?;
    }

    maintenance.close().await;
    Ok(())
}
