use std::time::{Duration, Instant};

use async_trait::async_trait;
use common::error::Res;
use dashmap::DashMap;

use crate::CacheStore;

const DEFAULT_SWEEP_THRESHOLD: usize = 1024;

/// In-process store, used when Redis is not configured and in tests.
///
/// Expired entries are dropped when read, and swept in bulk by `set`
/// once the map holds more than `sweep_threshold` entries.
pub struct MemoryCache {
    entries: DashMap<String, (String, Instant)>,
    sweep_threshold: usize,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::with_sweep_threshold(DEFAULT_SWEEP_THRESHOLD)
    }
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sweep_threshold(sweep_threshold: usize) -> Self {
        MemoryCache {
            entries: DashMap::new(),
            sweep_threshold,
        }
    }

    /// Removes every expired entry.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.entries.retain(|_, (_, expires_at)| *expires_at > now);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .is_some_and(|entry| entry.1 > Instant::now())
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Res<Option<String>> {
        let now = Instant::now();
        let hit = self.entries.get(key).and_then(|entry| {
            let (value, expires_at) = entry.value();
            (*expires_at > now).then(|| value.clone())
        });
        if hit.is_none() {
            self.entries.remove_if(key, |_, (_, expires_at)| *expires_at <= now);
        }
        Ok(hit)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Res<()> {
        if self.entries.len() >= self.sweep_threshold {
            self.purge_expired();
        }
        self.entries
            .insert(key.to_string(), (value, Instant::now() + ttl));
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Res<()> {
        for key in keys {
            self.entries.remove(key);
        }
        Ok(())
    }
}
