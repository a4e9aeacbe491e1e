use std::time::Duration;

use async_trait::async_trait;
use common::error::{AppError, Res};
use redis::AsyncCommands;

use crate::CacheStore;

pub struct RedisCache {
    pool: deadpool_redis::Pool,
}

impl RedisCache {
    pub fn new(pool: deadpool_redis::Pool) -> Self {
        Self { pool }
    }

    async fn connection(&self) -> Res<deadpool_redis::Connection> {
        self.pool
            .get()
            .await
            .map_err(|e| AppError::Cache(format!("Failed to get Redis connection: {}", e)))
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> Res<Option<String>> {
        let mut conn = self.connection().await?;
        conn.get::<_, Option<String>>(key)
            .await
            .map_err(|e| AppError::Cache(format!("GET {}: {}", key, e)))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Res<()> {
        let mut conn = self.connection().await?;
        conn.set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1))
            .await
            .map_err(|e| AppError::Cache(format!("SETEX {}: {}", key, e)))
    }

    async fn delete(&self, keys: &[String]) -> Res<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.connection().await?;
        conn.del::<_, ()>(keys.to_vec())
            .await
            .map_err(|e| AppError::Cache(format!("DEL {}: {}", keys.join(" "), e)))
    }
}
