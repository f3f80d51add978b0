use tracing::warn;

/// USD to INR rate served while the exchange-rate API is unreachable
pub const DEFAULT_FALLBACK_USD_INR: f64 = 83.0;

pub struct Config {
    pub host: String,
    pub http_port: u16,
    pub default_shop: String,
    pub shopify_access_token: Option<String>,
    pub shopify_api_version: String,
    pub exchange_rate_url: String,
    pub fallback_usd_inr: f64,
    pub analytics_ttl_ms: u64,
    pub billing_ttl_ms: u64,
    pub live_poll_ms: u64,
    pub allowed_origins: Vec<String>,
}

impl Config {
    const DEFAULT_HOST: &str = "0.0.0.0";
    const DEFAULT_HTTP_PORT: u16 = 8080;
    const DEFAULT_SHOP: &str = "idealfit-2.myshopify.com";
    const DEFAULT_API_VERSION: &str = "2025-01";
    const DEFAULT_EXCHANGE_RATE_URL: &str = "https://open.er-api.com/v6/latest/USD";
    const DEFAULT_ANALYTICS_TTL_MS: u64 = 2 * 60 * 1000;
    const DEFAULT_BILLING_TTL_MS: u64 = 2 * 60 * 1000;
    const DEFAULT_LIVE_POLL_MS: u64 = 5000;

    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from an arbitrary variable source, e.g. a map in tests.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let parsed = |name: &str, default: u64| -> u64 {
            lookup(name)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .unwrap_or(default)
        };

        let shopify_access_token = lookup("SHOPIFY_ACCESS_TOKEN").filter(|t| !t.is_empty());
        if shopify_access_token.is_none() {
            warn!("SHOPIFY_ACCESS_TOKEN not set, analytics and billing requests will fail");
        }

        let fallback_usd_inr = lookup("IDEALFIT_FALLBACK_USD_INR")
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|rate| rate.is_finite() && *rate > 0.0)
            .unwrap_or(DEFAULT_FALLBACK_USD_INR);

        let live_poll_ms = match parsed("IDEALFIT_LIVE_POLL_MS", Self::DEFAULT_LIVE_POLL_MS) {
            0 => {
                warn!("IDEALFIT_LIVE_POLL_MS must be positive, using default");
                Self::DEFAULT_LIVE_POLL_MS
            }
            ms => ms,
        };

        Self {
            host: lookup("IDEALFIT_HOST").unwrap_or_else(|| Self::DEFAULT_HOST.to_string()),
            http_port: lookup("IDEALFIT_HTTP_PORT")
                .and_then(|v| v.trim().parse::<u16>().ok())
                .unwrap_or(Self::DEFAULT_HTTP_PORT),
            default_shop: lookup("SHOPIFY_STORE").unwrap_or_else(|| Self::DEFAULT_SHOP.to_string()),
            shopify_access_token,
            shopify_api_version: lookup("SHOPIFY_API_VERSION")
                .unwrap_or_else(|| Self::DEFAULT_API_VERSION.to_string()),
            exchange_rate_url: lookup("IDEALFIT_EXCHANGE_RATE_URL")
                .unwrap_or_else(|| Self::DEFAULT_EXCHANGE_RATE_URL.to_string()),
            fallback_usd_inr,
            analytics_ttl_ms: parsed("IDEALFIT_ANALYTICS_TTL_MS", Self::DEFAULT_ANALYTICS_TTL_MS),
            billing_ttl_ms: parsed("IDEALFIT_BILLING_TTL_MS", Self::DEFAULT_BILLING_TTL_MS),
            live_poll_ms,
            allowed_origins: lookup("IDEALFIT_ALLOWED_ORIGINS")
                .unwrap_or_else(|| "*".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.http_port)
    }

    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.is_empty() || self.allowed_origins.iter().any(|o| o == "*")
    }
}
