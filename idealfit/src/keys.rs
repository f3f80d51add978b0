//! Key namespacing for the merchant cache.
//!
//! Every shop-scoped key is either a base key (`analytics:<shop>`) or a base key
//! followed by `:` and a suffix. Shop-scoped invalidation removes the base key
//! and everything under `<base>:`, so shop `a` never matches shop `ab`.

use crate::domain::AnalyticsFilter;
use shared::{Error, Result};
use std::fmt;

pub const ANALYTICS_NAMESPACE: &str = "analytics";
pub const BILLING_NAMESPACE: &str = "billing";
pub const LIVE_NAMESPACE: &str = "live";
pub const EXCHANGE_RATE_KEY: &str = "exchange:usd:inr";

/// Separator between key segments
pub const DELIMITER: char = ':';

pub fn analytics_key(shop: &str) -> String {
    format!("{ANALYTICS_NAMESPACE}{DELIMITER}{shop}")
}

pub fn billing_key(shop: &str) -> String {
    format!("{BILLING_NAMESPACE}{DELIMITER}{shop}")
}

pub fn live_key(shop: &str) -> String {
    format!("{LIVE_NAMESPACE}{DELIMITER}{shop}")
}

pub fn exchange_rate_key() -> &'static str {
    EXCHANGE_RATE_KEY
}

const SHOP_DOMAIN_SUFFIX: &str = ".myshopify.com";

/// Rejects shop identifiers that could not be told apart from key segments.
/// An empty shop or one containing the delimiter would let one shop's scope
/// prefix reach into another's keys.
pub fn validate_shop(shop: &str) -> Result<()> {
    if shop.is_empty() || shop.contains(DELIMITER) {
        return Err(Error::InvalidInput(format!("invalid shop identifier '{shop}'")));
    }
    Ok(())
}

/// `<handle>.myshopify.com` where the handle is lowercase alphanumerics and
/// dashes, not starting with a dash. This is the only form accepted from
/// callers, since the shop becomes the host of Admin API requests.
pub fn is_shop_domain(shop: &str) -> bool {
    let Some(handle) = shop.strip_suffix(SHOP_DOMAIN_SUFFIX) else {
        return false;
    };
    let mut chars = handle.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Prefix matching every key nested under `base`, but not `base` itself
pub fn scope_prefix(base: &str) -> String {
    format!("{base}{DELIMITER}")
}

/// Typed cache key. Renders to the flat string the store is keyed by.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Analytics {
        shop: String,
        filter: AnalyticsFilter,
    },
    Billing {
        shop: String,
    },
    Live {
        shop: String,
    },
    ExchangeRate,
}

impl CacheKey {
    pub fn analytics(shop: impl Into<String>, filter: AnalyticsFilter) -> Self {
        CacheKey::Analytics {
            shop: shop.into(),
            filter,
        }
    }

    pub fn billing(shop: impl Into<String>) -> Self {
        CacheKey::Billing { shop: shop.into() }
    }

    pub fn live(shop: impl Into<String>) -> Self {
        CacheKey::Live { shop: shop.into() }
    }

    pub fn shop(&self) -> Option<&str> {
        match self {
            CacheKey::Analytics { shop, .. } | CacheKey::Billing { shop } | CacheKey::Live { shop } => {
                Some(shop)
            }
            CacheKey::ExchangeRate => None,
        }
    }

    /// Fails for a shop-scoped key whose shop would break namespacing
    pub fn validate(&self) -> Result<()> {
        self.shop().map_or(Ok(()), validate_shop)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // analytics:<shop>:<dateFrom>:<dateTo>:<month>:<year>
            CacheKey::Analytics { shop, filter } => {
                let segment = |s: &Option<String>| s.clone().unwrap_or_default();
                write!(
                    f,
                    "{}{DELIMITER}{}{DELIMITER}{}{DELIMITER}{}{DELIMITER}{}",
                    analytics_key(shop),
                    segment(&filter.date_from),
                    segment(&filter.date_to),
                    segment(&filter.month),
                    segment(&filter.year),
                )
            }
            CacheKey::Billing { shop } => f.write_str(&billing_key(shop)),
            CacheKey::Live { shop } => f.write_str(&live_key(shop)),
            CacheKey::ExchangeRate => f.write_str(EXCHANGE_RATE_KEY),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_keys() {
        assert_eq!(analytics_key("a.myshopify.com"), "analytics:a.myshopify.com");
        assert_eq!(billing_key("a.myshopify.com"), "billing:a.myshopify.com");
        assert_eq!(live_key("a.myshopify.com"), "live:a.myshopify.com");
        assert_eq!(exchange_rate_key(), "exchange:usd:inr");
    }

    #[test]
    fn test_analytics_key_carries_filters() {
        let filter = AnalyticsFilter {
            date_from: Some("2025-01-01".into()),
            date_to: None,
            month: Some("03".into()),
            year: None,
        };

        assert_eq!(
            CacheKey::analytics("shop", filter).to_string(),
            "analytics:shop:2025-01-01::03:"
        );
        assert_eq!(
            CacheKey::analytics("shop", AnalyticsFilter::default()).to_string(),
            "analytics:shop::::"
        );
    }

    #[test]
    fn test_scope_prefix_does_not_cross_shops() {
        let prefix = scope_prefix(&analytics_key("a"));

        assert!(CacheKey::analytics("a", AnalyticsFilter::default())
            .to_string()
            .starts_with(&prefix));
        assert!(!CacheKey::analytics("ab", AnalyticsFilter::default())
            .to_string()
            .starts_with(&prefix));
        assert!(!analytics_key("ab").starts_with(&prefix));
    }

    #[test]
    fn test_shop_with_delimiter_is_rejected() {
        assert!(validate_shop("a.myshopify.com").is_ok());
        assert!(matches!(validate_shop("a:b"), Err(Error::InvalidInput(_))));
        assert!(validate_shop("").is_err());

        assert!(CacheKey::billing("a:b").validate().is_err());
        assert!(CacheKey::analytics("a", AnalyticsFilter::default()).validate().is_ok());
        assert!(CacheKey::ExchangeRate.validate().is_ok());
    }

    #[test]
    fn test_shop_domain_shape() {
        assert!(is_shop_domain("idealfit-2.myshopify.com"));
        assert!(is_shop_domain("9shop.myshopify.com"));

        for shop in [
            "attacker.example",
            "attacker.example/steal?x=",
            "evil.com/.myshopify.com",
            "a.b.myshopify.com",
            "-shop.myshopify.com",
            "Shop.myshopify.com",
            ".myshopify.com",
            "a:b.myshopify.com",
        ] {
            assert!(!is_shop_domain(shop), "{shop}");
        }
    }

    #[test]
    fn test_typed_keys_render_base_keys() {
        assert_eq!(CacheKey::billing("s").to_string(), billing_key("s"));
        assert_eq!(CacheKey::live("s").to_string(), live_key("s"));
        assert_eq!(CacheKey::ExchangeRate.to_string(), exchange_rate_key());
    }
}
