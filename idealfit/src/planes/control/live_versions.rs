use crate::domain::{LiveStatus, LiveVersion};
use crate::keys::CacheKey;
use crate::planes::data::MerchantCache;
use crate::ports::Clock;
use shared::{Result, TtlMs};
use std::sync::Arc;
use tracing::{debug, warn};

/// A shop idle for longer than this reads back as version 0
pub const LIVE_VERSION_TTL: TtlMs = TtlMs::from_hours(24);

/// Per-shop monotonic change counter used as a "refetch now" signal
#[derive(Clone)]
pub struct LiveVersions {
    cache: MerchantCache,
    clock: Arc<dyn Clock>,
}

impl LiveVersions {
    pub fn new(cache: MerchantCache, clock: Arc<dyn Clock>) -> Self {
        Self { cache, clock }
    }

    /// Bumps the shop's version by exactly one and restarts its 24h TTL.
    /// Every call counts; duplicate webhooks are not collapsed here.
    pub async fn increment(&self, shop: &str) -> Result<LiveVersion> {
        let now = self.clock.now_ms();
        let next = self
            .cache
            .update(&CacheKey::live(shop), LIVE_VERSION_TTL, |current: Option<LiveVersion>| {
                let current = current.unwrap_or(LiveVersion::zero(now));
                LiveVersion {
                    version: current.version + 1,
                    // A wall clock stepping backwards must not move lastWebhookTs back
                    ts: now.max(current.ts),
                }
            })
            .await?;

        debug!(shop, version = next.version, "live version incremented");
        Ok(next)
    }

    /// Current record, or an error if the store could not be read
    pub async fn try_current(&self, shop: &str) -> Result<LiveVersion> {
        let found: Option<LiveVersion> = self.cache.get(&CacheKey::live(shop)).await?;
        Ok(found.unwrap_or_else(|| LiveVersion::zero(self.clock.now_ms())))
    }

    /// Current record. Never fails: a store outage reads as the zero default.
    /// Reading does not extend the TTL.
    pub async fn current(&self, shop: &str) -> LiveVersion {
        match self.try_current(shop).await {
            Ok(live) => live,
            Err(e) => {
                warn!(shop, error = %e, "live version unavailable, reporting default");
                LiveVersion::zero(self.clock.now_ms())
            }
        }
    }

    pub async fn status(&self, shop: &str) -> LiveStatus {
        LiveStatus::new(shop, self.current(shop).await)
    }
}
