#![deny(clippy::all)]

use crate::domain::Order;
use async_trait::async_trait;
use shared::{Result, TtlMs};

// Ports are the pluggable extension points for storage, time and upstream data

/// Port for the key/value store backing every cached resource.
///
/// Every individual call is atomic. A `get` followed by a `set` is not, except
/// through [`CacheStore::upsert`].
#[async_trait]
pub trait CacheStore<V>: Send + Sync + 'static {
    /// Returns the live value for `key`, reaping it if it has expired.
    async fn get(&self, key: &str) -> Result<Option<V>>;

    /// Replaces any existing entry unconditionally.
    async fn set(&self, key: String, value: V, ttl: TtlMs) -> Result<()>;

    /// Removes `key`, returning whether an entry was present.
    async fn invalidate(&self, key: &str) -> Result<bool>;

    /// Removes every key starting with `prefix`, expired or not.
    async fn invalidate_by_prefix(&self, prefix: &str) -> Result<usize>;

    /// Atomically replaces the entry with `apply(current)`, where `current` is
    /// `None` when the key is absent or expired. Returns the stored value.
    async fn upsert(
        &self,
        key: String,
        ttl: TtlMs,
        apply: &(dyn for<'a> Fn(Option<&'a V>) -> V + Send + Sync),
    ) -> Result<V>;
}

/// Port for wall-clock time in milliseconds since the Unix epoch
pub trait Clock: Send + Sync + 'static {
    fn now_ms(&self) -> u64;
}

/// Port for the shop's order history (the Shopify Admin orders API)
#[async_trait]
pub trait OrderSource: Send + Sync + 'static {
    async fn fetch_orders(&self, shop: &str) -> Result<Vec<Order>>;
}

/// Port for the public USD to INR exchange rate
#[async_trait]
pub trait RateSource: Send + Sync + 'static {
    async fn usd_to_inr(&self) -> Result<f64>;
}
