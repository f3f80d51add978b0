use crate::api::requests::ShopQuery;
use crate::api::responses::{ApiError, ApiResponse};
use crate::state::AppState;
use axum::{
    Json,
    extract::{Query, State},
    http::header,
    response::{
        IntoResponse,
        sse::{Event, Sse},
    },
};
use futures::stream::StreamExt;
use idealfit::domain::LiveStatus;
use idealfit::events::LiveEvent;
use std::convert::Infallible;

/// GET /api/live
pub async fn live_status(
    State(state): State<AppState>,
    Query(query): Query<ShopQuery>,
) -> Result<Json<ApiResponse<LiveStatus>>, ApiError> {
    let shop = state.shop_or_default(query.shop)?;
    Ok(ApiResponse::ok(state.live_versions.status(&shop).await))
}

/// GET /api/live-sse
///
/// One subscription per connection. The stream owns its poll timer, so a
/// client disconnect drops the body and stops polling.
pub async fn stream_live(
    State(state): State<AppState>,
    Query(query): Query<ShopQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let shop = state.shop_or_default(query.shop)?;
    let events = state
        .live_feed
        .subscribe(shop, state.shutdown.child_token())
        .map(|event| Ok::<_, Infallible>(to_sse_event(&event)));

    Ok((
        [(header::CACHE_CONTROL, "no-cache, no-transform")],
        Sse::new(events),
    ))
}

fn to_sse_event(event: &LiveEvent) -> Event {
    Event::default()
        .event(event.name())
        .data(event.payload().to_string())
}
