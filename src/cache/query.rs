use super::{CacheBackend, CacheError, InMemoryCache};
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub const DASHBOARD_PREFIX: &str = "dashboard:";
pub const REPORT_PREFIX: &str = "report:";

/// Caches the serialized result of a query for a fixed time.
#[derive(Clone)]
pub struct QueryCache {
    backend: Arc<dyn CacheBackend>,
    default_ttl: Duration,
}

impl QueryCache {
    pub fn new(backend: Arc<dyn CacheBackend>, default_ttl: Duration) -> Self {
        Self {
            backend,
            default_ttl,
        }
    }

    pub fn in_memory(default_ttl: Duration) -> Self {
        Self::new(Arc::new(InMemoryCache::new()), default_ttl)
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Returns the cached value for `key` if still fresh; otherwise runs
    /// `loader`, caches its result for `ttl` and returns it. Loader errors
    /// propagate and leave the cache untouched.
    pub async fn remember<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Option<Duration>,
        loader: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<CacheError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        match self.backend.get(key).await {
            Ok(Some(cached)) => match serde_json::from_str::<T>(&cached) {
                Ok(value) => {
                    debug!(cache_key = key, "query cache hit");
                    return Ok(value);
                }
                Err(e) => warn!(cache_key = key, "discarding undecodable cache entry: {}", e),
            },
            Ok(None) => debug!(cache_key = key, "query cache miss"),
            Err(e) => warn!(cache_key = key, "cache read failed: {}", e),
        }

        let value = loader().await?;

        let serialized = serde_json::to_string(&value).map_err(CacheError::from)?;
        if let Err(e) = self
            .backend
            .set(key, &serialized, Some(ttl.unwrap_or(self.default_ttl)))
            .await
        {
            warn!(cache_key = key, "cache write failed: {}", e);
        }

        Ok(value)
    }

    pub async fn invalidate(&self, key: &str) {
        if let Err(e) = self.backend.delete(key).await {
            warn!(cache_key = key, "cache delete failed: {}", e);
        }
    }

    pub async fn invalidate_prefix(&self, prefix: &str) {
        match self.backend.delete_prefix(prefix).await {
            Ok(removed) => debug!(prefix, removed, "invalidated cached queries"),
            Err(e) => warn!(prefix, "cache prefix delete failed: {}", e),
        }
    }

    /// Drops every cached dashboard and report; called by write paths.
    pub async fn invalidate_aggregates(&self) {
        self.invalidate_prefix(DASHBOARD_PREFIX).await;
        self.invalidate_prefix(REPORT_PREFIX).await;
    }
}
