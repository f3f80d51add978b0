use crate::planes::data::analytics::AnalyticsReport;
use crate::planes::data::billing::BillingSummary;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// === Upstream order model (subset of the Shopify Admin order resource) ===

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Order {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub order_number: Option<u64>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub total_price: Option<Value>,
    #[serde(default)]
    pub note_attributes: Vec<NameValue>,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
}

impl Order {
    /// `YYYY-MM` prefix of `created_at`
    pub fn created_month(&self) -> Option<&str> {
        self.created_at.as_deref().and_then(|c| c.get(0..7))
    }

    pub fn total_price(&self) -> f64 {
        match &self.total_price {
            Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
            Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
            _ => 0.0,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct LineItem {
    #[serde(default)]
    pub product_id: Option<u64>,
    #[serde(default)]
    pub properties: Vec<NameValue>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct NameValue {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub value: Option<Value>,
}

impl NameValue {
    /// The value as text; empty strings and nulls count as missing
    pub fn text(&self) -> Option<String> {
        match self.value.as_ref()? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(true) => Some("true".to_string()),
            _ => None,
        }
    }
}

// === Live version ===

/// Per-shop change counter. `ts` is the wall-clock time (ms) of the last increment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveVersion {
    pub version: u64,
    pub ts: u64,
}

impl LiveVersion {
    pub fn zero(now_ms: u64) -> Self {
        Self {
            version: 0,
            ts: now_ms,
        }
    }
}

/// What the live endpoints report for a shop
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveStatus {
    pub shop: String,
    pub version: u64,
    pub last_webhook_ts: u64,
}

impl LiveStatus {
    pub fn new(shop: impl Into<String>, live: LiveVersion) -> Self {
        Self {
            shop: shop.into(),
            version: live.version,
            last_webhook_ts: live.ts,
        }
    }
}

// === Analytics filter ===

/// Date filters applied to orders before aggregation. All bounds compare
/// lexically against the order's ISO-8601 `created_at`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsFilter {
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub month: Option<String>,
    pub year: Option<String>,
}

impl AnalyticsFilter {
    pub fn is_empty(&self) -> bool {
        self.date_from.is_none() && self.date_to.is_none() && self.month.is_none() && self.year.is_none()
    }
}

// === Cached values ===

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRate(pub f64);

/// Everything the merchant cache can hold, tagged by resource
#[derive(Clone, Debug, PartialEq)]
pub enum CacheValue {
    Analytics(Box<AnalyticsReport>),
    Billing(Box<BillingSummary>),
    LiveVersion(LiveVersion),
    ExchangeRate(ExchangeRate),
}

impl CacheValue {
    pub fn kind(&self) -> &'static str {
        match self {
            CacheValue::Analytics(_) => "analytics",
            CacheValue::Billing(_) => "billing",
            CacheValue::LiveVersion(_) => "live_version",
            CacheValue::ExchangeRate(_) => "exchange_rate",
        }
    }
}

/// A payload that can be stored in, and read back out of, a [`CacheValue`]
pub trait Cacheable: Clone + Send + Sync + 'static {
    fn into_value(self) -> CacheValue;
    fn from_value(value: CacheValue) -> Option<Self>;
}

impl Cacheable for AnalyticsReport {
    fn into_value(self) -> CacheValue {
        CacheValue::Analytics(Box::new(self))
    }

    fn from_value(value: CacheValue) -> Option<Self> {
        match value {
            CacheValue::Analytics(report) => Some(*report),
            _ => None,
        }
    }
}

impl Cacheable for BillingSummary {
    fn into_value(self) -> CacheValue {
        CacheValue::Billing(Box::new(self))
    }

    fn from_value(value: CacheValue) -> Option<Self> {
        match value {
            CacheValue::Billing(summary) => Some(*summary),
            _ => None,
        }
    }
}

impl Cacheable for LiveVersion {
    fn into_value(self) -> CacheValue {
        CacheValue::LiveVersion(self)
    }

    fn from_value(value: CacheValue) -> Option<Self> {
        match value {
            CacheValue::LiveVersion(live) => Some(live),
            _ => None,
        }
    }
}

impl Cacheable for ExchangeRate {
    fn into_value(self) -> CacheValue {
        CacheValue::ExchangeRate(self)
    }

    fn from_value(value: CacheValue) -> Option<Self> {
        match value {
            CacheValue::ExchangeRate(rate) => Some(rate),
            _ => None,
        }
    }
}
