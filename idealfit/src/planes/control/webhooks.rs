use crate::planes::control::live_versions::LiveVersions;
use crate::planes::data::MerchantCache;
use serde::Serialize;
use std::fmt;
use tracing::{error, info};

/// Shopify webhook topics the app subscribes to
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WebhookTopic {
    OrdersCreate,
    OrdersUpdated,
    CustomersCreate,
    CustomersUpdate,
    Other(String),
}

impl From<&str> for WebhookTopic {
    fn from(topic: &str) -> Self {
        match topic.trim().to_ascii_lowercase().replace('_', "/").as_str() {
            "orders/create" => WebhookTopic::OrdersCreate,
            "orders/updated" => WebhookTopic::OrdersUpdated,
            "customers/create" => WebhookTopic::CustomersCreate,
            "customers/update" => WebhookTopic::CustomersUpdate,
            _ => WebhookTopic::Other(topic.to_string()),
        }
    }
}

impl fmt::Display for WebhookTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebhookTopic::OrdersCreate => f.write_str("orders/create"),
            WebhookTopic::OrdersUpdated => f.write_str("orders/updated"),
            WebhookTopic::CustomersCreate => f.write_str("customers/create"),
            WebhookTopic::CustomersUpdate => f.write_str("customers/update"),
            WebhookTopic::Other(topic) => f.write_str(topic),
        }
    }
}

/// What a topic does to the shop's cached state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WebhookPolicy {
    pub invalidate: bool,
    pub bump_version: bool,
}

impl WebhookTopic {
    // Create topics only bump the live version; their cached analytics and
    // billing stay until TTL expiry.
    pub fn policy(&self) -> WebhookPolicy {
        match self {
            WebhookTopic::OrdersUpdated | WebhookTopic::CustomersUpdate => WebhookPolicy {
                invalidate: true,
                bump_version: true,
            },
            WebhookTopic::OrdersCreate | WebhookTopic::CustomersCreate => WebhookPolicy {
                invalidate: false,
                bump_version: true,
            },
            WebhookTopic::Other(_) => WebhookPolicy {
                invalidate: false,
                bump_version: false,
            },
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookOutcome {
    /// Entries removed, when the topic invalidates and the store answered
    pub invalidated: Option<usize>,
    /// New live version, when the topic bumps it and the store answered
    pub version: Option<u64>,
}

/// Applies a webhook's cache policy. Failures are logged, never returned,
/// so Shopify always gets its 200.
#[derive(Clone)]
pub struct WebhookDispatcher {
    cache: MerchantCache,
    versions: LiveVersions,
}

impl WebhookDispatcher {
    pub fn new(cache: MerchantCache, versions: LiveVersions) -> Self {
        Self { cache, versions }
    }

    pub async fn handle(&self, shop: &str, topic: &WebhookTopic) -> WebhookOutcome {
        info!(shop, %topic, "webhook received");
        let policy = topic.policy();
        let mut outcome = WebhookOutcome::default();

        if policy.invalidate {
            match self.cache.invalidate_shop_caches(shop).await {
                Ok(removed) => outcome.invalidated = Some(removed),
                Err(e) => error!(shop, %topic, error = %e, "cache invalidation failed"),
            }
        }

        if policy.bump_version {
            match self.versions.increment(shop).await {
                Ok(live) => outcome.version = Some(live.version),
                Err(e) => error!(shop, %topic, error = %e, "live version increment failed"),
            }
        }

        outcome
    }
}
