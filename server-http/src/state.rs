use crate::api::responses::ApiError;
use idealfit::domain::CacheValue;
use idealfit::keys;
use idealfit::planes::control::{LiveFeed, LiveVersions, WebhookDispatcher};
use idealfit::planes::data::{AnalyticsService, BillingService, ExchangeRateService, MerchantCache};
use idealfit::ports::{CacheStore, Clock, OrderSource, RateSource};
use shared::TtlMs;
use shared::config::Config;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Server state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub analytics: AnalyticsService,
    pub billing: BillingService,
    pub exchange_rates: ExchangeRateService,
    pub live_versions: LiveVersions,
    pub live_feed: LiveFeed,
    pub webhooks: WebhookDispatcher,
    pub default_shop: Arc<str>,
    /// Cancelled on server shutdown; every live stream holds a child token
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(
        config: &Config,
        store: Arc<dyn CacheStore<CacheValue>>,
        orders: Arc<dyn OrderSource>,
        rates: Arc<dyn RateSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let cache = MerchantCache::new(store);
        let exchange_rates = ExchangeRateService::new(cache.clone(), rates, config.fallback_usd_inr);
        let analytics = AnalyticsService::new(
            cache.clone(),
            orders.clone(),
            clock.clone(),
            TtlMs(config.analytics_ttl_ms),
        );
        let billing = BillingService::new(
            cache.clone(),
            orders,
            exchange_rates.clone(),
            clock.clone(),
            TtlMs(config.billing_ttl_ms),
        );
        let live_versions = LiveVersions::new(cache.clone(), clock.clone());
        let live_feed = LiveFeed::new(
            live_versions.clone(),
            clock,
            Duration::from_millis(config.live_poll_ms),
        );
        let webhooks = WebhookDispatcher::new(cache, live_versions.clone());

        Self {
            analytics,
            billing,
            exchange_rates,
            live_versions,
            live_feed,
            webhooks,
            default_shop: Arc::from(config.default_shop.as_str()),
            shutdown: CancellationToken::new(),
        }
    }

    /// The requested shop, or the configured default when absent or blank.
    /// Anything other than a `*.myshopify.com` domain is rejected, since the
    /// shop names the host that receives the Admin API token.
    pub fn shop_or_default(&self, shop: Option<String>) -> Result<String, ApiError> {
        let shop = shop
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| self.default_shop.to_string());
        if !keys::is_shop_domain(&shop) {
            return Err(ApiError::BadRequest(format!("invalid shop domain '{shop}'")));
        }
        Ok(shop)
    }
}
