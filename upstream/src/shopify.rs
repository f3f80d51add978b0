use crate::http_client;
use async_trait::async_trait;
use idealfit::domain::Order;
use idealfit::keys;
use idealfit::ports::OrderSource;
use serde::Deserialize;
use shared::{Error, Result};
use tracing::{debug, warn};

#[derive(Deserialize)]
struct OrdersPage {
    #[serde(default)]
    orders: Vec<Order>,
}

/// Shopify Admin REST client for a shop's most recent orders
#[derive(Clone)]
pub struct ShopifyOrdersClient {
    http: reqwest::Client,
    access_token: Option<String>,
    api_version: String,
    base_url: Option<String>,
}

impl ShopifyOrdersClient {
    pub const PAGE_LIMIT: usize = 250;

    pub fn new(access_token: Option<String>, api_version: impl Into<String>) -> Result<Self> {
        Ok(Self {
            http: http_client()?,
            access_token,
            api_version: api_version.into(),
            base_url: None,
        })
    }

    /// Sends every request to `base_url` instead of `https://{shop}`
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into().trim_end_matches('/').to_string());
        self
    }

    fn orders_url(&self, shop: &str) -> String {
        let base = match &self.base_url {
            Some(base) => base.clone(),
            None => format!("https://{shop}"),
        };
        format!(
            "{base}/admin/api/{}/orders.json?limit={}&status=any",
            self.api_version,
            Self::PAGE_LIMIT
        )
    }
}

#[async_trait]
impl OrderSource for ShopifyOrdersClient {
    async fn fetch_orders(&self, shop: &str) -> Result<Vec<Order>> {
        // The token only ever goes to a Shopify-hosted shop
        if !keys::is_shop_domain(shop) {
            return Err(Error::InvalidInput(format!("'{shop}' is not a myshopify.com domain")));
        }
        let token = self
            .access_token
            .as_deref()
            .ok_or_else(|| Error::Config("SHOPIFY_ACCESS_TOKEN is not set".into()))?;

        let response = self
            .http
            .get(self.orders_url(shop))
            .header("X-Shopify-Access-Token", token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("Shopify request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            warn!(shop, %status, "Shopify orders request rejected");
            return Err(Error::Upstream(format!("Shopify API error: {}", status.as_u16())));
        }

        let page: OrdersPage = response
            .json()
            .await
            .map_err(|e| Error::Upstream(format!("Shopify response unreadable: {e}")))?;
        debug!(shop, orders = page.orders.len(), "fetched orders");
        Ok(page.orders)
    }
}
