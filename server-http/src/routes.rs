use crate::handlers;
use crate::state::AppState;
use axum::{
    Router,
    http::{HeaderName, HeaderValue, Method, header},
    routing::{get, post},
};
use shared::config::Config;
use tower_http::cors::{Any, CorsLayer};
use tower_http::normalize_path::NormalizePathLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Build and configure the application router
pub fn build_router(state: AppState, config: &Config) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Live version polling and SSE stream
        .route("/api/live", get(handlers::live_status))
        .route("/api/live-sse", get(handlers::stream_live))
        // Cached dashboard resources
        .route("/api/analytics", get(handlers::get_analytics))
        .route("/api/billing", get(handlers::get_billing))
        .route("/api/exchange-rate", get(handlers::get_exchange_rate))
        // Shopify webhooks
        .route("/webhooks", post(handlers::receive_webhook))
        // Middleware
        .layer(cors_layer(config))
        .layer(NormalizePathLayer::trim_trailing_slash())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::CACHE_CONTROL,
            HeaderName::from_static("x-shopify-topic"),
            HeaderName::from_static("x-shopify-shop-domain"),
        ]);

    if config.allows_any_origin() {
        info!("CORS: allowing all origins");
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    info!(?origins, "CORS: allowing configured origins");
    cors.allow_origin(origins)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use idealfit::clock::ManualClock;
    use idealfit::domain::{CacheValue, Order};
    use idealfit::ports::{OrderSource, RateSource};
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use storage_engine::TtlStore;
    use tower::ServiceExt; // for `oneshot`

    const SHOP: &str = "demo.myshopify.com";

    #[derive(Default)]
    struct FakeOrders {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl OrderSource for FakeOrders {
        async fn fetch_orders(&self, _shop: &str) -> shared::Result<Vec<Order>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(shared::Error::Upstream("Shopify API error: 500".into()));
            }
            let order: Order = serde_json::from_value(json!({
                "id": 1,
                "created_at": "2025-03-02T10:00:00Z",
                "total_price": "49.00",
                "note_attributes": [{"name": "Size", "value": "M"}]
            }))
            .unwrap();
            Ok(vec![order])
        }
    }

    struct FixedRate(shared::Result<f64>);

    #[async_trait]
    impl RateSource for FixedRate {
        async fn usd_to_inr(&self) -> shared::Result<f64> {
            self.0.clone()
        }
    }

    fn config() -> Config {
        let vars: HashMap<&str, &str> = HashMap::from([("SHOPIFY_STORE", SHOP)]);
        Config::from_lookup(|name| vars.get(name).map(|v| v.to_string()))
    }

    fn app_with(orders: Arc<FakeOrders>, rate: shared::Result<f64>) -> (Router, AppState) {
        let clock = Arc::new(ManualClock::new(1_742_040_000_000));
        let state = AppState::new(
            &config(),
            Arc::new(TtlStore::<CacheValue>::new(clock.clone())),
            orders,
            Arc::new(FixedRate(rate)),
            clock,
        );
        (build_router(state.clone(), &config()), state)
    }

    fn app() -> (Router, AppState) {
        app_with(Arc::new(FakeOrders::default()), Ok(84.0))
    }

    async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn webhook(topic: Option<&str>, shop: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method("POST").uri("/webhooks");
        if let Some(topic) = topic {
            builder = builder.header("X-Shopify-Topic", topic);
        }
        if let Some(shop) = shop {
            builder = builder.header("X-Shopify-Shop-Domain", shop);
        }
        builder.body(Body::from("{}")).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app();
        let (status, body) = get_json(&app, "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"message": "OK"}));
    }

    #[tokio::test]
    async fn test_live_defaults_to_version_zero() {
        let (app, _) = app();
        let (status, body) = get_json(&app, &format!("/api/live?shop={SHOP}")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["data"]["shop"], json!(SHOP));
        assert_eq!(body["data"]["version"], json!(0));
    }

    #[tokio::test]
    async fn test_webhook_bumps_live_version() {
        let (app, _) = app();

        let response = app
            .clone()
            .oneshot(webhook(Some("orders/create"), Some(SHOP)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // Falls back to the configured shop when `shop` is omitted
        let (_, body) = get_json(&app, "/api/live").await;
        assert_eq!(body["data"]["version"], json!(1));
    }

    #[tokio::test]
    async fn test_webhook_without_headers_is_rejected() {
        let (app, _) = app();

        for request in [webhook(None, Some(SHOP)), webhook(Some("orders/create"), None)] {
            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn test_foreign_shop_is_rejected_before_shopify() {
        let orders = Arc::new(FakeOrders::default());
        let (app, _) = app_with(orders.clone(), Ok(84.0));

        for uri in [
            "/api/analytics?shop=attacker.example%2Fsteal%3Fx%3D",
            "/api/billing?shop=attacker.example",
            "/api/billing?shop=a%3Ab.myshopify.com",
            "/api/live?shop=demo.myshopify.com%3Aanalytics",
        ] {
            let (status, body) = get_json(&app, uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body["success"], json!(false));
        }
        assert_eq!(orders.calls.load(Ordering::SeqCst), 0);

        let request = Request::builder()
            .uri("/api/live-sse?shop=attacker.example")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_webhook_for_foreign_shop_is_rejected() {
        let (app, _) = app();

        for shop in ["a:b", "attacker.example", "demo.myshopify.com:x"] {
            let response = app
                .clone()
                .oneshot(webhook(Some("orders/updated"), Some(shop)))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{shop}");
        }
        let (_, body) = get_json(&app, "/api/live").await;
        assert_eq!(body["data"]["version"], json!(0));
    }

    #[tokio::test]
    async fn test_analytics_is_cached_until_updated_webhook() {
        let orders = Arc::new(FakeOrders::default());
        let (app, _) = app_with(orders.clone(), Ok(84.0));
        let uri = format!("/api/analytics?shop={SHOP}&month=03&year=2025");

        let (status, body) = get_json(&app, &uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["kpis"]["totalOrders"], json!(1));
        get_json(&app, &uri).await;
        assert_eq!(orders.calls.load(Ordering::SeqCst), 1);

        // Create topics leave cached analytics alone
        app.clone()
            .oneshot(webhook(Some("orders/create"), Some(SHOP)))
            .await
            .unwrap();
        get_json(&app, &uri).await;
        assert_eq!(orders.calls.load(Ordering::SeqCst), 1);

        app.clone()
            .oneshot(webhook(Some("orders/updated"), Some(SHOP)))
            .await
            .unwrap();
        get_json(&app, &uri).await;
        assert_eq!(orders.calls.load(Ordering::SeqCst), 2);

        get_json(&app, &format!("{uri}&refresh=true")).await;
        assert_eq!(orders.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_upstream_failure_is_bad_gateway() {
        let orders = Arc::new(FakeOrders {
            fail: true,
            ..Default::default()
        });
        let (app, _) = app_with(orders, Ok(84.0));

        let (status, body) = get_json(&app, "/api/billing").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["data"], Value::Null);
        assert!(body["error"].as_str().unwrap().contains("Shopify API error"));
    }

    #[tokio::test]
    async fn test_exchange_rate_falls_back() {
        let (app, _) = app_with(
            Arc::new(FakeOrders::default()),
            Err(shared::Error::Upstream("down".into())),
        );

        let (status, body) = get_json(&app, "/api/exchange-rate").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["rate"], json!(83.0));
    }

    #[tokio::test]
    async fn test_live_sse_sends_init_first() {
        let (app, _) = app();
        let request = Request::builder()
            .uri(format!("/api/live-sse?shop={SHOP}"))
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/event-stream"
        );
        assert_eq!(
            response.headers()[header::CACHE_CONTROL],
            "no-cache, no-transform"
        );

        let mut body = response.into_body();
        let frame = body.frame().await.unwrap().unwrap();
        let chunk = String::from_utf8(frame.into_data().unwrap().to_vec()).unwrap();
        assert!(chunk.starts_with("event: init\n"));
        assert!(chunk.contains(r#""version":0"#));
    }

    #[tokio::test]
    async fn test_shutdown_closes_live_streams() {
        let (app, state) = app();
        let request = Request::builder()
            .uri("/api/live-sse")
            .body(Body::empty())
            .unwrap();
        let mut body = app.oneshot(request).await.unwrap().into_body();
        body.frame().await.unwrap().unwrap();

        state.shutdown.cancel();
        assert!(body.frame().await.is_none());
        assert_eq!(state.live_feed.open_subscriptions(), 0);
    }
}
