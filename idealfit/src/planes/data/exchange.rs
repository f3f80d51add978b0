use crate::domain::ExchangeRate;
use crate::keys::CacheKey;
use crate::planes::data::cache_operations::MerchantCache;
use crate::ports::RateSource;
use shared::{Error, TtlMs};
use std::sync::Arc;

pub const EXCHANGE_RATE_TTL: TtlMs = TtlMs::from_hours(1);
pub const FALLBACK_RATE_TTL: TtlMs = TtlMs::from_mins(15);

/// USD to INR conversion with a static fallback when the rate API is down
#[derive(Clone)]
pub struct ExchangeRateService {
    cache: MerchantCache,
    source: Arc<dyn RateSource>,
    fallback: f64,
}

impl ExchangeRateService {
    pub fn new(cache: MerchantCache, source: Arc<dyn RateSource>, fallback: f64) -> Self {
        Self {
            cache,
            source,
            fallback,
        }
    }

    /// Always resolves to a positive rate. A successful fetch is trusted for an
    /// hour, the fallback for fifteen minutes.
    pub async fn usd_to_inr(&self) -> f64 {
        let fetch = || async {
            let rate = self.source.usd_to_inr().await?;
            if rate.is_finite() && rate > 0.0 {
                Ok(ExchangeRate(rate))
            } else {
                Err(Error::Upstream(format!("invalid USD/INR rate {rate}")))
            }
        };

        self.cache
            .fetch_or_fallback(
                &CacheKey::ExchangeRate,
                EXCHANGE_RATE_TTL,
                FALLBACK_RATE_TTL,
                fetch,
                ExchangeRate(self.fallback),
            )
            .await
            .0
    }
}
