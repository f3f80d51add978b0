use idealfit::clock::SystemClock;
use idealfit::domain::CacheValue;
use server_http::{AppState, build_router};
use shared::config::Config;
use std::sync::Arc;
use storage_engine::TtlStore;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use upstream::{ExchangeRateClient, ShopifyOrdersClient};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting IdealFit HTTP Server...");

    // Load environment variables from .env file (if exists)
    match dotenvy::dotenv() {
        Ok(_) => info!("Loaded environment variables from .env file"),
        Err(_) => info!("No .env file found, using system environment variables"),
    }

    if let Err(e) = run(Config::from_env()).await {
        error!(error = %e, "server failed");
        std::process::exit(1);
    }
}

async fn run(config: Config) -> shared::Result<()> {
    let clock = Arc::new(SystemClock);
    let store = Arc::new(TtlStore::<CacheValue>::new(clock.clone()));
    let orders = Arc::new(
        ShopifyOrdersClient::new(
            config.shopify_access_token.clone(),
            config.shopify_api_version.clone(),
        )?,
    );
    let rates = Arc::new(ExchangeRateClient::new(config.exchange_rate_url.clone())?);

    let state = AppState::new(&config, store, orders, rates, clock);
    let shutdown = state.shutdown.clone();
    let router = build_router(state, &config);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| shared::Error::Config(format!("cannot bind {addr}: {e}")))?;

    info!("HTTP Server listening on http://{addr}");
    info!("Try: curl http://localhost:{}/api/live", config.http_port);

    // Live streams never finish on their own, so cancel them before axum
    // waits for open connections to drain.
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            shutdown.cancel();
        })
        .await
        .map_err(|e| shared::Error::Internal(format!("server error: {e}")))?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }

    info!("Shutting down gracefully...");
}
