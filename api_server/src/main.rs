use std::sync::Arc;
use std::time::Duration;

use aggregator::{Aggregator, AggregatorError};
use alchemy_client::AlchemyClient;
use anyhow::Context;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use coingecko_client::CoinGeckoClient;
use coinmarketcap_client::CoinMarketCapClient;
use config_manager::SystemConfig;
use holdings_core::PriceLogoSource;
use lifi_client::{LifiClient, RpcBalanceClient};
use result_cache::HoldingsCache;
use retry_utils::RetryPolicy;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing::info;

mod handlers;
mod types;

use handlers::*;
use types::*;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
    pub lifi_client: Arc<LifiClient>,
}

/// Main application error type
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Upstream providers unavailable: {0}")]
    Upstream(String),
}

impl From<AggregatorError> for ApiError {
    fn from(error: AggregatorError) -> Self {
        match error {
            AggregatorError::InvalidAddress(_) => ApiError::BadRequest(error.to_string()),
            AggregatorError::NoData(_) => ApiError::Upstream(error.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::Upstream(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
        };

        let body = Json(ErrorResponse {
            error: error_message,
            timestamp: chrono::Utc::now(),
        });

        (status, body).into_response()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,api_server=debug".into()),
        )
        .init();

    info!("Starting Holdings Tracker API Server...");

    // Load configuration
    let config = SystemConfig::load().context("failed to load configuration")?;
    info!("Configuration loaded successfully");

    let policy = RetryPolicy::new(config.scan.max_retries, config.scan.retry_base_delay_ms);

    // Provider clients
    let alchemy = Arc::new(AlchemyClient::new(config.alchemy.clone(), policy.clone())?);
    let coinmarketcap = Arc::new(CoinMarketCapClient::new(
        config.coinmarketcap.clone(),
        policy.clone(),
    )?);
    let coingecko = Arc::new(CoinGeckoClient::new(config.coingecko.clone(), policy.clone())?);
    let lifi_client = Arc::new(LifiClient::new(config.lifi.clone(), policy.clone())?);
    let wallet_rpc = Arc::new(RpcBalanceClient::new(
        Duration::from_secs(config.alchemy.request_timeout_seconds),
        policy,
    )?);
    info!("Provider clients initialized");

    // Result cache shared by the aggregation engine
    let cache = Arc::new(HoldingsCache::with_system_clock(config.cache.ttl_seconds));

    // Token pricing walks CoinMarketCap then CoinGecko; the native path puts
    // the LI.FI catalog in front
    let price_sources: Vec<Arc<dyn PriceLogoSource>> =
        vec![coinmarketcap.clone(), coingecko.clone()];
    let native_price_sources: Vec<Arc<dyn PriceLogoSource>> =
        vec![lifi_client.clone(), coinmarketcap, coingecko];

    let aggregator = Arc::new(Aggregator::new(
        alchemy,
        price_sources,
        native_price_sources,
        wallet_rpc,
        cache,
        &config.scan,
    ));
    info!("Aggregation engine initialized");

    // Create application state
    let app_state = AppState {
        aggregator,
        lifi_client,
    };

    // Build the application router
    let app = create_router(app_state).await;

    info!("🎯 Holdings API ready");
    info!("📋 Available endpoints:");
    info!("   • POST /api/balances - Aggregate wallet holdings across chains");
    info!("   • GET /api/native-token-metadata?chainId=N - Native token metadata");
    info!("   • GET /health - Health check");

    // Bind and serve
    let bind_addr = format!("{}:{}", config.api.host, config.api.port);
    info!("Starting server on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    info!("Server listening on {}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the main application router
async fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Wallet holdings
        .route("/api/balances", post(get_wallet_balances))
        .route("/api/native-token-metadata", get(get_native_token_metadata))
        // Add CORS middleware
        .layer(
            ServiceBuilder::new()
                .layer(CorsLayer::permissive())
                .into_inner(),
        )
        .with_state(state)
}
