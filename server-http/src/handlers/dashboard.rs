use crate::api::requests::{AnalyticsQuery, ShopQuery};
use crate::api::responses::{ApiError, ApiResponse, ExchangeRateResponse};
use crate::state::AppState;
use axum::{
    Json,
    extract::{Query, State},
};
use idealfit::planes::data::analytics::AnalyticsReport;
use idealfit::planes::data::billing::BillingSummary;
use tracing::info;

/// GET /api/analytics
pub async fn get_analytics(
    State(state): State<AppState>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Json<ApiResponse<AnalyticsReport>>, ApiError> {
    let shop = state.shop_or_default(query.shop.clone())?;
    let filter = query.filter();
    info!(shop, refresh = query.force_refresh(), "analytics requested");

    let report = state
        .analytics
        .report(&shop, filter, query.force_refresh())
        .await?;
    Ok(ApiResponse::ok(report))
}

/// GET /api/billing
pub async fn get_billing(
    State(state): State<AppState>,
    Query(query): Query<ShopQuery>,
) -> Result<Json<ApiResponse<BillingSummary>>, ApiError> {
    let shop = state.shop_or_default(query.shop)?;
    let summary = state.billing.summary(&shop).await?;
    Ok(ApiResponse::ok(summary))
}

/// GET /api/exchange-rate
pub async fn get_exchange_rate(State(state): State<AppState>) -> Json<ApiResponse<ExchangeRateResponse>> {
    let rate = state.exchange_rates.usd_to_inr().await;
    ApiResponse::ok(ExchangeRateResponse { rate })
}
