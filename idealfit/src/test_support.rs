//! In-crate doubles for the ports. The production TTL store lives in `storage-engine`.

use crate::clock::ManualClock;
use crate::domain::{CacheValue, Order};
use crate::ports::{CacheStore, Clock, OrderSource, RateSource};
use async_trait::async_trait;
use shared::{Error, Result, TtlMs};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

pub const START_MS: u64 = 1_742_040_000_000;

/// HashMap store honouring TTLs against a manual clock
pub struct MemoryStore {
    entries: Mutex<HashMap<String, (CacheValue, u64, u64)>>,
    clock: ManualClock,
}

impl MemoryStore {
    pub fn new(clock: ManualClock) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    fn live(&self, entry: &(CacheValue, u64, u64)) -> bool {
        entry.2 > 0 && self.clock.now_ms() <= entry.1
    }
}

#[async_trait]
impl CacheStore<CacheValue> for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<CacheValue>> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some(entry) if self.live(entry) => Ok(Some(entry.0.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: String, value: CacheValue, ttl: TtlMs) -> Result<()> {
        let expires_at = self.clock.now_ms() + ttl.0;
        self.entries
            .lock()
            .unwrap()
            .insert(key, (value, expires_at, ttl.0));
        Ok(())
    }

    async fn invalidate(&self, key: &str) -> Result<bool> {
        Ok(self.entries.lock().unwrap().remove(key).is_some())
    }

    async fn invalidate_by_prefix(&self, prefix: &str) -> Result<usize> {
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|k, _| !k.starts_with(prefix));
        Ok(before - entries.len())
    }

    async fn upsert(
        &self,
        key: String,
        ttl: TtlMs,
        apply: &(dyn for<'a> Fn(Option<&'a CacheValue>) -> CacheValue + Send + Sync),
    ) -> Result<CacheValue> {
        let mut entries = self.entries.lock().unwrap();
        let current = entries
            .get(&key)
            .filter(|e| self.live(e))
            .map(|e| e.0.clone());
        let next = apply(current.as_ref());
        let expires_at = self.clock.now_ms() + ttl.0;
        entries.insert(key, (next.clone(), expires_at, ttl.0));
        Ok(next)
    }
}

/// Store whose backend is always down
pub struct UnavailableStore;

#[async_trait]
impl CacheStore<CacheValue> for UnavailableStore {
    async fn get(&self, _key: &str) -> Result<Option<CacheValue>> {
        Err(Error::Unavailable("backend down".into()))
    }

    async fn set(&self, _key: String, _value: CacheValue, _ttl: TtlMs) -> Result<()> {
        Err(Error::Unavailable("backend down".into()))
    }

    async fn invalidate(&self, _key: &str) -> Result<bool> {
        Err(Error::Unavailable("backend down".into()))
    }

    async fn invalidate_by_prefix(&self, _prefix: &str) -> Result<usize> {
        Err(Error::Unavailable("backend down".into()))
    }

    async fn upsert(
        &self,
        _key: String,
        _ttl: TtlMs,
        _apply: &(dyn for<'a> Fn(Option<&'a CacheValue>) -> CacheValue + Send + Sync),
    ) -> Result<CacheValue> {
        Err(Error::Unavailable("backend down".into()))
    }
}

/// Memory store that can be taken down mid-test
pub struct SwitchableStore {
    inner: MemoryStore,
    down: AtomicBool,
}

impl SwitchableStore {
    pub fn new(clock: ManualClock) -> Self {
        Self {
            inner: MemoryStore::new(clock),
            down: AtomicBool::new(false),
        }
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.down.load(Ordering::SeqCst) {
            Err(Error::Unavailable("backend down".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CacheStore<CacheValue> for SwitchableStore {
    async fn get(&self, key: &str) -> Result<Option<CacheValue>> {
        self.check()?;
        self.inner.get(key).await
    }

    async fn set(&self, key: String, value: CacheValue, ttl: TtlMs) -> Result<()> {
        self.check()?;
        self.inner.set(key, value, ttl).await
    }

    async fn invalidate(&self, key: &str) -> Result<bool> {
        self.check()?;
        self.inner.invalidate(key).await
    }

    async fn invalidate_by_prefix(&self, prefix: &str) -> Result<usize> {
        self.check()?;
        self.inner.invalidate_by_prefix(prefix).await
    }

    async fn upsert(
        &self,
        key: String,
        ttl: TtlMs,
        apply: &(dyn for<'a> Fn(Option<&'a CacheValue>) -> CacheValue + Send + Sync),
    ) -> Result<CacheValue> {
        self.check()?;
        self.inner.upsert(key, ttl, apply).await
    }
}

/// Order source returning a fixed order list, counting calls
pub struct StaticOrders {
    pub orders: Mutex<Result<Vec<Order>>>,
    pub calls: AtomicUsize,
}

impl StaticOrders {
    pub fn ok(orders: Vec<Order>) -> Self {
        Self {
            orders: Mutex::new(Ok(orders)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            orders: Mutex::new(Err(Error::Upstream(message.to_string()))),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OrderSource for StaticOrders {
    async fn fetch_orders(&self, _shop: &str) -> Result<Vec<Order>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.orders.lock().unwrap().clone()
    }
}

/// Rate source returning a fixed result, counting calls
pub struct StaticRate {
    pub rate: Mutex<Result<f64>>,
    pub calls: AtomicUsize,
}

impl StaticRate {
    pub fn ok(rate: f64) -> Self {
        Self {
            rate: Mutex::new(Ok(rate)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            rate: Mutex::new(Err(Error::Upstream("rate api down".into()))),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set(&self, rate: Result<f64>) {
        *self.rate.lock().unwrap() = rate;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RateSource for StaticRate {
    async fn usd_to_inr(&self) -> Result<f64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.rate.lock().unwrap().clone()
    }
}

/// An order as Shopify would send it, for aggregation tests
pub fn order(created_at: &str, total: &str, size: Option<&str>, bust: Option<&str>) -> Order {
    let mut properties = Vec::new();
    if let Some(size) = size {
        properties.push(crate::domain::NameValue {
            name: Some("_recommended_size".into()),
            value: Some(serde_json::Value::String(size.into())),
        });
    }
    if let Some(bust) = bust {
        properties.push(crate::domain::NameValue {
            name: Some("_measurement_bust".into()),
            value: Some(serde_json::Value::String(bust.into())),
        });
    }

    Order {
        id: None,
        order_number: None,
        created_at: Some(created_at.to_string()),
        total_price: Some(serde_json::Value::String(total.to_string())),
        note_attributes: Vec::new(),
        line_items: vec![crate::domain::LineItem {
            product_id: Some(1),
            properties,
        }],
    }
}
