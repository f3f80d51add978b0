use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use idealfit::ports::{CacheStore, Clock};
use shared::{Result, TtlMs};
use std::fmt::Debug;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone, Debug)]
struct CacheEntry<V> {
    value: V,
    expires_at: u64,
    ttl: u64,
}

impl<V> CacheEntry<V> {
    fn new(value: V, now: u64, ttl: TtlMs) -> Self {
        Self {
            value,
            expires_at: now.saturating_add(ttl.0),
            ttl: ttl.0,
        }
    }

    /// A zero TTL is expired from the moment it is written.
    fn is_live(&self, now: u64) -> bool {
        self.ttl > 0 && now <= self.expires_at
    }
}

/// Concurrent in-memory key/value store with per-entry TTL.
///
/// Expired entries are reaped lazily by the read that finds them. There is no
/// background sweeper and no capacity bound.
pub struct TtlStore<V> {
    entries: DashMap<String, CacheEntry<V>>,
    clock: Arc<dyn Clock>,
}

impl<V> TtlStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    /// Number of stored entries, including expired ones not yet reaped
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl<V> CacheStore<V> for TtlStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> Result<Option<V>> {
        let now = self.clock.now_ms();
        match self.entries.get(key) {
            None => return Ok(None),
            Some(entry) if entry.is_live(now) => return Ok(Some(entry.value.clone())),
            Some(_) => {}
        }

        // Re-check under the shard lock so a concurrent fresh write survives
        if self.entries.remove_if(key, |_, e| !e.is_live(now)).is_some() {
            debug!(key, "reaped expired entry");
        }
        Ok(None)
    }

    async fn set(&self, key: String, value: V, ttl: TtlMs) -> Result<()> {
        let entry = CacheEntry::new(value, self.clock.now_ms(), ttl);
        self.entries.insert(key, entry);
        Ok(())
    }

    async fn invalidate(&self, key: &str) -> Result<bool> {
        Ok(self.entries.remove(key).is_some())
    }

    async fn invalidate_by_prefix(&self, prefix: &str) -> Result<usize> {
        let mut removed = 0;
        self.entries.retain(|key, _| {
            let matched = key.starts_with(prefix);
            if matched {
                removed += 1;
            }
            !matched
        });
        debug!(prefix, removed, "invalidated by prefix");
        Ok(removed)
    }

    async fn upsert(
        &self,
        key: String,
        ttl: TtlMs,
        apply: &(dyn for<'a> Fn(Option<&'a V>) -> V + Send + Sync),
    ) -> Result<V> {
        let now = self.clock.now_ms();
        let next = match self.entries.entry(key) {
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get();
                let next = apply(entry.is_live(now).then_some(&entry.value));
                occupied.insert(CacheEntry::new(next.clone(), now, ttl));
                next
            }
            Entry::Vacant(vacant) => {
                let next = apply(None);
                vacant.insert(CacheEntry::new(next.clone(), now, ttl));
                next
            }
        };
        Ok(next)
    }
}

impl<V> Debug for TtlStore<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlStore")
            .field("entry_count", &self.entries.len())
            .finish()
    }
}
