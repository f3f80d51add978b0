//! HTTP adapters for the order and exchange-rate ports.

mod exchange_rate;
mod shopify;

pub use exchange_rate::ExchangeRateClient;
pub use shopify::ShopifyOrdersClient;

use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

fn http_client() -> shared::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| shared::Error::Internal(format!("http client: {e}")))
}
