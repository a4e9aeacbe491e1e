//! Cache-aside helpers and the single invalidation entry point.
//!
//! Readers go through [`get_or_load`]; writers call [`invalidate`] once per
//! mutation with the [`Entity`] they touched. Cache failures are logged and
//! never fail the caller.

use std::{future::Future, sync::Arc, time::Duration};

use async_trait::async_trait;
use common::{env_config::CacheConfig, error::Res};
use serde::{Serialize, de::DeserializeOwned};

pub mod keys;

pub mod store {
    pub mod memory;
    pub mod redis;
}

pub use keys::{CacheKey, Entity};

/// Key/value store with TTL support and bulk delete.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Res<Option<String>>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Res<()>;

    async fn delete(&self, keys: &[String]) -> Res<()>;
}

pub type SharedCache = Arc<dyn CacheStore>;

/// Cache tiers; their lengths come from [`CacheConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    Short,
    Medium,
    Long,
}

impl Ttl {
    pub fn duration(self, config: &CacheConfig) -> Duration {
        let secs = match self {
            Ttl::Short => config.short_ttl_secs,
            Ttl::Medium => config.medium_ttl_secs,
            Ttl::Long => config.long_ttl_secs,
        };
        Duration::from_secs(secs)
    }
}

pub async fn get_json<T: DeserializeOwned>(store: &dyn CacheStore, key: &CacheKey) -> Option<T> {
    let key = key.to_string();
    match store.get(&key).await {
        Ok(Some(raw)) => match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("Dropping undecodable cache entry {}: {}", key, e);
                if let Err(e) = store.delete(&[key]).await {
                    log::warn!("Failed to delete cache entry: {}", e);
                }
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            log::warn!("Cache read failed for {}: {}", key, e);
            None
        }
    }
}

pub async fn set_json<T: Serialize>(
    store: &dyn CacheStore,
    key: &CacheKey,
    value: &T,
    ttl: Duration,
) {
    let key = key.to_string();
    let raw = match serde_json::to_string(value) {
        Ok(raw) => raw,
        Err(e) => {
            log::warn!("Failed to encode cache entry {}: {}", key, e);
            return;
        }
    };
    if let Err(e) = store.set(&key, raw, ttl).await {
        log::warn!("Cache write failed for {}: {}", key, e);
    }
}

/// Returns the cached value for `key`, or runs `load` and caches its result.
pub async fn get_or_load<T, F, Fut>(
    store: &dyn CacheStore,
    key: &CacheKey,
    ttl: Duration,
    load: F,
) -> Res<T>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Res<T>>,
{
    if let Some(hit) = get_json::<T>(store, key).await {
        log::debug!("Cache hit: {}", key);
        return Ok(hit);
    }

    let value = load().await?;
    set_json(store, key, &value, ttl).await;
    Ok(value)
}

/// Deletes every cache entry derived from `entity`.
pub async fn invalidate(store: &dyn CacheStore, entity: Entity) {
    invalidate_all(store, &[entity]).await;
}

/// Deletes the entries of several entities with a single store call.
pub async fn invalidate_all(store: &dyn CacheStore, entities: &[Entity]) {
    let mut keys: Vec<String> = Vec::new();
    for key in entities.iter().flat_map(Entity::keys) {
        let key = key.to_string();
        if !keys.contains(&key) {
            keys.push(key);
        }
    }
    if keys.is_empty() {
        return;
    }
    match store.delete(&keys).await {
        Ok(()) => log::debug!("Invalidated {:?}: {}", entities, keys.join(", ")),
        Err(e) => log::warn!("Cache invalidation failed for {:?}: {}", entities, e),
    }
}
