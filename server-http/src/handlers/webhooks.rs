use crate::api::responses::{ApiError, ApiResponse};
use crate::state::AppState;
use axum::{
    Json,
    extract::State,
    http::HeaderMap,
};
use idealfit::keys;
use idealfit::planes::control::{WebhookOutcome, WebhookTopic};

const TOPIC_HEADER: &str = "x-shopify-topic";
const SHOP_HEADER: &str = "x-shopify-shop-domain";

fn required_header(headers: &HeaderMap, name: &str) -> Result<String, ApiError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
        .ok_or_else(|| ApiError::BadRequest(format!("missing {name} header")))
}

/// POST /webhooks
///
/// Acknowledges every well-formed delivery with 200. Cache failures are
/// logged by the dispatcher so Shopify does not retry.
pub async fn receive_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<WebhookOutcome>>, ApiError> {
    let topic = WebhookTopic::from(required_header(&headers, TOPIC_HEADER)?.as_str());
    let shop = required_header(&headers, SHOP_HEADER)?;
    if !keys::is_shop_domain(&shop) {
        return Err(ApiError::BadRequest(format!("invalid {SHOP_HEADER} header")));
    }

    let outcome = state.webhooks.handle(&shop, &topic).await;
    Ok(ApiResponse::ok(outcome))
}
