use crate::types::*;
use crate::{ApiError, AppState};
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Json},
};
use chrono::Utc;
use tracing::info;

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "holdings-tracker-api".to_string(),
        timestamp: Utc::now(),
    })
}

/// Aggregate a wallet's holdings across every supported chain
pub async fn get_wallet_balances(
    State(state): State<AppState>,
    Json(request): Json<BalancesRequest>,
) -> Result<impl IntoResponse, ApiError> {
    info!(
        "Balance scan requested for {} (active chain: {:?})",
        request.address, request.chain_id
    );

    let holdings = state
        .aggregator
        .aggregate(&request.address, request.chain_id)
        .await?;

    let count = holdings.len();
    Ok(Json(BalancesResponse {
        address: request.address,
        holdings: holdings.as_ref().clone(),
        count,
    }))
}

/// Native-token metadata for one chain, resolved from the token catalog
pub async fn get_native_token_metadata(
    State(state): State<AppState>,
    Query(query): Query<NativeTokenQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let chain_id = query
        .chain_id
        .ok_or_else(|| ApiError::BadRequest("chainId parameter is required".to_string()))?;

    let token = state
        .lifi_client
        .find_native_token(chain_id)
        .await
        .map_err(|e| ApiError::Upstream(e.to_string()))?
        .ok_or_else(|| {
            ApiError::NotFound(format!("No native token entry for chain {}", chain_id))
        })?;

    let price_usd = token.parsed_price_usd().unwrap_or(0.0);
    Ok(Json(NativeTokenMetadataResponse {
        symbol: token.symbol,
        name: token.name,
        decimals: token.decimals,
        logo: token.logo_uri,
        price_usd,
    }))
}
