use crate::clock::month_of;
use crate::domain::{AnalyticsFilter, Order};
use crate::keys::CacheKey;
use crate::planes::data::cache_operations::MerchantCache;
use crate::ports::{Clock, OrderSource};
use serde::{Deserialize, Serialize};
use shared::{Result, TtlMs};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::info;

pub const DEFAULT_ANALYTICS_TTL: TtlMs = TtlMs::from_mins(2);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    pub kpis: Kpis,
    pub size_distribution: Vec<SizeStat>,
    pub monthly_trends: Vec<MonthlyCount>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Kpis {
    pub total_orders: usize,
    pub orders_with_recommendations: usize,
    pub conversion_rate: f64,
    pub most_popular_size: String,
    pub total_revenue: f64,
    pub avg_order_value: f64,
    pub current_month_orders: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeStat {
    pub size: String,
    pub recommendations: usize,
    pub percentage: f64,
    pub avg_bust: f64,
    pub avg_waist: f64,
    pub avg_hip: f64,
    pub production_priority: Priority,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    fn for_count(count: usize) -> Self {
        match count {
            c if c > 50 => Priority::High,
            c if c > 20 => Priority::Medium,
            _ => Priority::Low,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyCount {
    pub month: String,
    pub count: usize,
}

/// Fit measurements captured on an order by the storefront widget
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Measurements {
    pub bust: Option<String>,
    pub waist: Option<String>,
    pub hip: Option<String>,
    pub size: Option<String>,
}

impl Measurements {
    /// Reads note attributes first, then line item properties; later matches win.
    pub fn from_order(order: &Order) -> Self {
        let mut found = Self::default();
        let line_item_props = order.line_items.iter().flat_map(|item| item.properties.iter());

        for attr in order.note_attributes.iter().chain(line_item_props) {
            let (Some(name), Some(value)) = (attr.name.as_deref(), attr.text()) else {
                continue;
            };
            if name.contains("measurement_bust") {
                found.bust = Some(value.clone());
            }
            if name.contains("measurement_waist") {
                found.waist = Some(value.clone());
            }
            if name.contains("measurement_hip") {
                found.hip = Some(value.clone());
            }
            if name.contains("recommended_size") {
                found.size = Some(value);
            }
        }

        found
    }

    pub fn is_empty(&self) -> bool {
        self.bust.is_none() && self.waist.is_none() && self.hip.is_none() && self.size.is_none()
    }
}

impl AnalyticsFilter {
    pub fn matches(&self, order: &Order) -> bool {
        if self.is_empty() {
            return true;
        }
        let Some(created_at) = order.created_at.as_deref() else {
            return false;
        };

        let date = created_at.get(0..10).unwrap_or(created_at);
        if self.date_from.as_deref().is_some_and(|from| date < from) {
            return false;
        }
        if self.date_to.as_deref().is_some_and(|to| date > to) {
            return false;
        }
        if self
            .month
            .as_deref()
            .is_some_and(|m| created_at.get(5..7) != Some(m))
        {
            return false;
        }
        if self
            .year
            .as_deref()
            .is_some_and(|y| created_at.get(0..4) != Some(y))
        {
            return false;
        }
        true
    }
}

#[derive(Default)]
struct SizeBucket {
    count: usize,
    bust: Vec<f64>,
    waist: Vec<f64>,
    hip: Vec<f64>,
}

/// Aggregates orders into the dashboard report. `now_ms` decides the current month.
pub fn compute_report(orders: &[Order], filter: &AnalyticsFilter, now_ms: u64) -> AnalyticsReport {
    let filtered: Vec<&Order> = orders.iter().filter(|o| filter.matches(o)).collect();

    let mut buckets: HashMap<String, SizeBucket> = HashMap::new();
    let mut monthly: BTreeMap<String, usize> = BTreeMap::new();
    let mut with_measurements = 0;

    for order in &filtered {
        let measurements = Measurements::from_order(order);

        if let Some(size) = &measurements.size {
            let bucket = buckets.entry(size.clone()).or_default();
            bucket.count += 1;
            bucket.bust.extend(measurements.bust.as_deref().and_then(parse_leading_f64));
            bucket.waist.extend(measurements.waist.as_deref().and_then(parse_leading_f64));
            bucket.hip.extend(measurements.hip.as_deref().and_then(parse_leading_f64));
        }

        if let Some(month) = order.created_month() {
            *monthly.entry(month.to_string()).or_default() += 1;
        }

        if !measurements.is_empty() {
            with_measurements += 1;
        }
    }

    let mut size_distribution: Vec<SizeStat> = buckets
        .into_iter()
        .map(|(size, bucket)| SizeStat {
            percentage: round_to(bucket.count as f64 / with_measurements as f64 * 100.0, 1),
            avg_bust: average(&bucket.bust),
            avg_waist: average(&bucket.waist),
            avg_hip: average(&bucket.hip),
            production_priority: Priority::for_count(bucket.count),
            recommendations: bucket.count,
            size,
        })
        .collect();
    size_distribution.sort_by(|a, b| {
        b.recommendations
            .cmp(&a.recommendations)
            .then_with(|| a.size.cmp(&b.size))
    });

    let total_orders = filtered.len();
    let total_revenue: f64 = filtered.iter().map(|o| o.total_price()).sum();
    let current_month = month_of(now_ms);

    let kpis = Kpis {
        total_orders,
        orders_with_recommendations: with_measurements,
        conversion_rate: if total_orders > 0 {
            round_to(with_measurements as f64 / total_orders as f64 * 100.0, 1)
        } else {
            0.0
        },
        most_popular_size: size_distribution
            .first()
            .map(|s| s.size.clone())
            .unwrap_or_else(|| "N/A".to_string()),
        total_revenue: round_to(total_revenue, 2),
        avg_order_value: if total_orders > 0 {
            round_to(total_revenue / total_orders as f64, 2)
        } else {
            0.0
        },
        current_month_orders: filtered
            .iter()
            .filter(|o| o.created_month() == Some(current_month.as_str()))
            .count(),
    };

    AnalyticsReport {
        kpis,
        size_distribution,
        monthly_trends: monthly
            .into_iter()
            .map(|(month, count)| MonthlyCount { month, count })
            .collect(),
    }
}

fn average(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    round_to(values.iter().sum::<f64>() / values.len() as f64, 1)
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Parses the leading number of a measurement such as `34"` or `34.5 in`
pub(crate) fn parse_leading_f64(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    let end = raw
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || c == '.' || (i == 0 && (c == '-' || c == '+'))))
        .map_or(raw.len(), |(i, _)| i);
    raw[..end].parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Per-shop analytics, read-through cached for the analytics TTL
#[derive(Clone)]
pub struct AnalyticsService {
    cache: MerchantCache,
    orders: Arc<dyn OrderSource>,
    clock: Arc<dyn Clock>,
    ttl: TtlMs,
}

impl AnalyticsService {
    pub fn new(
        cache: MerchantCache,
        orders: Arc<dyn OrderSource>,
        clock: Arc<dyn Clock>,
        ttl: TtlMs,
    ) -> Self {
        Self {
            cache,
            orders,
            clock,
            ttl,
        }
    }

    /// Serves the cached report for `(shop, filter)` unless `force_refresh`.
    /// Upstream failures propagate and leave the cache untouched.
    pub async fn report(
        &self,
        shop: &str,
        filter: AnalyticsFilter,
        force_refresh: bool,
    ) -> Result<AnalyticsReport> {
        let key = CacheKey::analytics(shop, filter.clone());
        let compute = || async {
            let orders = self.orders.fetch_orders(shop).await?;
            info!(shop, orders = orders.len(), "computing analytics report");
            Ok(compute_report(&orders, &filter, self.clock.now_ms()))
        };

        if force_refresh {
            self.cache.refresh_with_cache(&key, self.ttl, compute).await
        } else {
            self.cache.fetch_with_cache(&key, self.ttl, compute).await
        }
    }
}
