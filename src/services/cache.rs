use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

/// JSON read-through cache on top of Redis. Every failure degrades to a miss.
#[derive(Clone)]
pub struct CacheService {
    redis: ConnectionManager,
}

impl CacheService {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }

    pub fn report_key(id: Uuid) -> String {
        format!("showroom:report:{id}")
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let mut conn = self.redis.clone();
        let raw: Option<String> = match conn.get(key).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(key, "cache read failed: {e}");
                return None;
            }
        };
        raw.and_then(|s| serde_json::from_str(&s).ok())
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl_secs: u64) {
        let Ok(json) = serde_json::to_string(value) else {
            return;
        };
        let mut conn = self.redis.clone();
        if let Err(e) = conn.set_ex::<_, _, ()>(key, json, ttl_secs).await {
            tracing::warn!(key, "cache write failed: {e}");
        }
    }

    pub async fn invalidate(&self, key: &str) {
        let mut conn = self.redis.clone();
        if let Err(e) = conn.del::<_, ()>(key).await {
            tracing::warn!(key, "cache invalidation failed: {e}");
        }
    }
}

/// Invalidate when a cache is configured.
pub async fn invalidate_report(cache: Option<&CacheService>, id: Uuid) {
    if let Some(cache) = cache {
        cache.invalidate(&CacheService::report_key(id)).await;
    }
}
