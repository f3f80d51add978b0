use crate::clock::month_of;
use crate::domain::Order;
use crate::keys::CacheKey;
use crate::planes::data::analytics::round_to;
use crate::planes::data::cache_operations::MerchantCache;
use crate::planes::data::exchange::ExchangeRateService;
use crate::ports::{Clock, OrderSource};
use serde::{Deserialize, Serialize};
use shared::{Result, TtlMs};
use std::sync::Arc;
use tracing::info;

pub const DEFAULT_BILLING_TTL: TtlMs = TtlMs::from_mins(2);
pub const BILLING_CURRENCY: &str = "USD";

/// Usage tier. `max` of `None` is unbounded.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tier {
    pub name: &'static str,
    pub min: u64,
    pub max: Option<u64>,
    pub price_per_order: f64,
}

impl Tier {
    fn contains(&self, orders: u64) -> bool {
        orders >= self.min && self.max.is_none_or(|max| orders <= max)
    }

    fn range(&self) -> String {
        match self.max {
            Some(max) => format!("{}-{} orders", self.min, max),
            None => format!("{}-∞ orders", self.min),
        }
    }
}

pub const TIERS: [Tier; 3] = [
    Tier {
        name: "Starter",
        min: 1,
        max: Some(500),
        price_per_order: 0.12,
    },
    Tier {
        name: "Professional",
        min: 501,
        max: Some(1500),
        price_per_order: 0.09,
    },
    Tier {
        name: "Advanced",
        min: 1501,
        max: None,
        price_per_order: 0.06,
    },
];

/// Progressive charge: each order is billed at the rate of the tier it falls in
pub fn monthly_bill(orders: u64) -> f64 {
    TIERS
        .iter()
        .map(|tier| {
            let upper = tier.max.map_or(orders, |max| orders.min(max));
            let in_tier = upper.saturating_sub(tier.min - 1);
            in_tier as f64 * tier.price_per_order
        })
        .sum()
}

/// Tier the month's volume falls in; an idle month reports the first tier
pub fn current_tier(orders: u64) -> &'static Tier {
    TIERS.iter().find(|t| t.contains(orders)).unwrap_or(&TIERS[0])
}

pub fn next_tier(orders: u64) -> Option<&'static Tier> {
    TIERS.iter().find(|t| orders < t.min)
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingSummary {
    pub month: String,
    pub order_count: u64,
    pub total_bill: f64,
    pub total_bill_inr: f64,
    pub exchange_rate: f64,
    pub currency: String,
    pub current_tier: TierInfo,
    pub next_tier: Option<NextTier>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierInfo {
    pub name: String,
    pub range: String,
    pub price_per_order: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextTier {
    pub name: String,
    pub orders_needed: u64,
    pub price_per_order: f64,
}

pub fn compute_summary(orders: &[Order], now_ms: u64, usd_to_inr: f64) -> BillingSummary {
    let month = month_of(now_ms);
    let order_count = orders
        .iter()
        .filter(|o| o.created_month() == Some(month.as_str()))
        .count() as u64;

    let total = monthly_bill(order_count);
    let tier = current_tier(order_count);

    BillingSummary {
        month,
        order_count,
        total_bill: round_to(total, 2),
        total_bill_inr: round_to(total * usd_to_inr, 2),
        exchange_rate: usd_to_inr,
        currency: BILLING_CURRENCY.to_string(),
        current_tier: TierInfo {
            name: tier.name.to_string(),
            range: tier.range(),
            price_per_order: tier.price_per_order,
        },
        next_tier: next_tier(order_count).map(|next| NextTier {
            name: next.name.to_string(),
            orders_needed: next.min - order_count,
            price_per_order: next.price_per_order,
        }),
    }
}

/// Current-month usage billing per shop, read-through cached
#[derive(Clone)]
pub struct BillingService {
    cache: MerchantCache,
    orders: Arc<dyn OrderSource>,
    rates: ExchangeRateService,
    clock: Arc<dyn Clock>,
    ttl: TtlMs,
}

impl BillingService {
    pub fn new(
        cache: MerchantCache,
        orders: Arc<dyn OrderSource>,
        rates: ExchangeRateService,
        clock: Arc<dyn Clock>,
        ttl: TtlMs,
    ) -> Self {
        Self {
            cache,
            orders,
            rates,
            clock,
            ttl,
        }
    }

    pub async fn summary(&self, shop: &str) -> Result<BillingSummary> {
        self.cache
            .fetch_with_cache(&CacheKey::billing(shop), self.ttl, || async {
                let orders = self.orders.fetch_orders(shop).await?;
                let rate = self.rates.usd_to_inr().await;
                info!(shop, orders = orders.len(), rate, "computing billing summary");
                Ok(compute_summary(&orders, self.clock.now_ms(), rate))
            })
            .await
    }
}
