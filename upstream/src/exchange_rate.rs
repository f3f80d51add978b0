use crate::http_client;
use async_trait::async_trait;
use idealfit::ports::RateSource;
use serde::Deserialize;
use shared::{Error, Result};
use std::collections::HashMap;
use tracing::debug;

#[derive(Deserialize)]
struct RatesResponse {
    #[serde(default)]
    rates: HashMap<String, f64>,
}

/// Public USD-based rate table, e.g. `https://open.er-api.com/v6/latest/USD`
#[derive(Clone)]
pub struct ExchangeRateClient {
    http: reqwest::Client,
    url: String,
}

impl ExchangeRateClient {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            http: http_client()?,
            url: url.into(),
        })
    }
}

#[async_trait]
impl RateSource for ExchangeRateClient {
    async fn usd_to_inr(&self) -> Result<f64> {
        let response = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("exchange rate request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Upstream(format!("exchange rate API error: {}", status.as_u16())));
        }

        let body: RatesResponse = response
            .json()
            .await
            .map_err(|e| Error::Upstream(format!("exchange rate response unreadable: {e}")))?;

        let rate = body
            .rates
            .get("INR")
            .copied()
            .ok_or_else(|| Error::Upstream("exchange rate response has no INR rate".into()))?;
        debug!(rate, "fetched USD/INR rate");
        Ok(rate)
    }
}
