use crate::domain::{CacheValue, Cacheable};
use crate::keys::{self, CacheKey};
use crate::ports::CacheStore;
use shared::{Error, Result, TtlMs};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Typed handle over the process-wide cache store.
///
/// Constructed once at startup and cloned into every consumer. Reads of the
/// wrong payload type come back as misses instead of being cast.
#[derive(Clone)]
pub struct MerchantCache {
    store: Arc<dyn CacheStore<CacheValue>>,
}

impl std::fmt::Debug for MerchantCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MerchantCache")
            .field("store", &"<dyn CacheStore>")
            .finish()
    }
}

impl MerchantCache {
    pub fn new(store: Arc<dyn CacheStore<CacheValue>>) -> Self {
        Self { store }
    }

    pub async fn get<T: Cacheable>(&self, key: &CacheKey) -> Result<Option<T>> {
        let key = store_key(key)?;
        let Some(value) = self.store.get(&key).await? else {
            return Ok(None);
        };

        let kind = value.kind();
        match T::from_value(value) {
            Some(typed) => Ok(Some(typed)),
            None => {
                warn!(%key, found = kind, "cached value has unexpected type, treating as miss");
                Ok(None)
            }
        }
    }

    pub async fn set<T: Cacheable>(&self, key: &CacheKey, value: T, ttl: TtlMs) -> Result<()> {
        self.store.set(store_key(key)?, value.into_value(), ttl).await
    }

    pub async fn invalidate(&self, key: &CacheKey) -> Result<bool> {
        self.store.invalidate(&store_key(key)?).await
    }

    pub async fn invalidate_by_prefix(&self, prefix: &str) -> Result<usize> {
        self.store.invalidate_by_prefix(prefix).await
    }

    /// Drops the recomputable resources of one shop: analytics (every filter
    /// combination) and billing. The live version and the global exchange
    /// rate are left alone.
    pub async fn invalidate_shop_caches(&self, shop: &str) -> Result<usize> {
        keys::validate_shop(shop)?;
        let mut removed = 0;
        for base in [keys::analytics_key(shop), keys::billing_key(shop)] {
            if self.store.invalidate(&base).await? {
                removed += 1;
            }
            removed += self
                .store
                .invalidate_by_prefix(&keys::scope_prefix(&base))
                .await?;
        }

        info!(shop, removed, "invalidated shop caches");
        Ok(removed)
    }

    /// Atomic read-modify-write of a typed entry. `apply` sees `None` when the
    /// key is absent, expired, or holds another payload type.
    pub async fn update<T, F>(&self, key: &CacheKey, ttl: TtlMs, apply: F) -> Result<T>
    where
        T: Cacheable,
        F: Fn(Option<T>) -> T + Send + Sync,
    {
        let typed = |current: Option<&CacheValue>| {
            apply(current.cloned().and_then(T::from_value)).into_value()
        };

        let stored = self.store.upsert(store_key(key)?, ttl, &typed).await?;
        T::from_value(stored)
            .ok_or_else(|| Error::Internal(format!("upsert on '{key}' stored a foreign type")))
    }

    /// Read-through: serve a live entry, otherwise run `compute`, store the
    /// result for `ttl` and return it. Compute failures propagate and are not
    /// cached. Concurrent misses each run `compute`; the last write wins.
    pub async fn fetch_with_cache<T, F, Fut>(&self, key: &CacheKey, ttl: TtlMs, compute: F) -> Result<T>
    where
        T: Cacheable,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        key.validate()?;
        if let Some(hit) = self.read_through(key).await {
            return Ok(hit);
        }

        self.refresh_with_cache(key, ttl, compute).await
    }

    /// Like [`fetch_with_cache`](Self::fetch_with_cache) but skips the read:
    /// always computes and repopulates.
    pub async fn refresh_with_cache<T, F, Fut>(&self, key: &CacheKey, ttl: TtlMs, compute: F) -> Result<T>
    where
        T: Cacheable,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        key.validate()?;
        let value = compute().await?;
        self.store_quietly(key, value.clone(), ttl).await;
        Ok(value)
    }

    /// Read-through that never fails: a compute failure is logged and
    /// `fallback` is cached for `fallback_ttl` instead.
    pub async fn fetch_or_fallback<T, F, Fut>(
        &self,
        key: &CacheKey,
        ttl: TtlMs,
        fallback_ttl: TtlMs,
        compute: F,
        fallback: T,
    ) -> T
    where
        T: Cacheable,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(hit) = self.read_through(key).await {
            return hit;
        }

        match compute().await {
            Ok(value) => {
                self.store_quietly(key, value.clone(), ttl).await;
                value
            }
            Err(e) => {
                warn!(%key, error = %e, fallback_ttl_ms = fallback_ttl.0, "upstream failed, caching fallback");
                self.store_quietly(key, fallback.clone(), fallback_ttl).await;
                fallback
            }
        }
    }

    async fn read_through<T: Cacheable>(&self, key: &CacheKey) -> Option<T> {
        match self.get::<T>(key).await {
            Ok(Some(hit)) => {
                debug!(%key, "cache hit");
                Some(hit)
            }
            Ok(None) => {
                debug!(%key, "cache miss");
                None
            }
            Err(e) => {
                warn!(%key, error = %e, "cache read failed, treating as miss");
                None
            }
        }
    }

    async fn store_quietly<T: Cacheable>(&self, key: &CacheKey, value: T, ttl: TtlMs) {
        if let Err(e) = self.set(key, value, ttl).await {
            warn!(%key, error = %e, "failed to populate cache");
        }
    }
}

fn store_key(key: &CacheKey) -> Result<String> {
    key.validate()?;
    Ok(key.to_string())
}
