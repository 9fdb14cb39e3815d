use std::time::Duration;

use async_trait::async_trait;
use config_manager::CoinGeckoConfig;
use holdings_core::{HoldingsError, PriceLogoSource, ResolvedPrice, TokenQuery};
use retry_utils::{CallError, HttpCaller, HttpRequest, RetryPolicy};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum CoinGeckoError {
    #[error("request failed: {0}")]
    Call(#[from] CallError),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

pub type Result<T> = std::result::Result<T, CoinGeckoError>;

/// Chain id → CoinGecko asset-platform id
const PLATFORM_MAP: [(u64, &str); 6] = [
    (1, "ethereum"),
    (10, "optimistic-ethereum"),
    (137, "polygon-pos"),
    (42161, "arbitrum-one"),
    (8453, "base"),
    (43114, "avalanche"),
];

pub fn platform_id(chain_id: u64) -> Option<&'static str> {
    PLATFORM_MAP
        .iter()
        .find(|(id, _)| *id == chain_id)
        .map(|(_, platform)| *platform)
}

/// Fields consumed from `/api/v3/coins/{platform}/contract/{address}`
#[derive(Debug, Clone, Deserialize)]
pub struct CoinGeckoCoin {
    pub id: Option<String>,
    pub symbol: Option<String>,
    pub name: Option<String>,
    pub image: Option<CoinGeckoImage>,
    pub market_data: Option<CoinGeckoMarketData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CoinGeckoImage {
    pub large: Option<String>,
    pub small: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CoinGeckoMarketData {
    pub current_price: Option<CoinGeckoPriceSet>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CoinGeckoPriceSet {
    pub usd: Option<f64>,
}

impl CoinGeckoCoin {
    /// Large rendition when present, otherwise the small one
    pub fn logo_url(&self) -> Option<String> {
        let image = self.image.as_ref()?;
        image.large.clone().or_else(|| image.small.clone())
    }

    pub fn price_usd(&self) -> Option<f64> {
        self.market_data
            .as_ref()?
            .current_price
            .as_ref()?
            .usd
    }
}

/// CoinGecko public API client, keyed by (platform, contract address)
#[derive(Debug, Clone)]
pub struct CoinGeckoClient {
    config: CoinGeckoConfig,
    caller: HttpCaller,
}

impl CoinGeckoClient {
    pub fn new(config: CoinGeckoConfig, policy: RetryPolicy) -> Result<Self> {
        let caller = HttpCaller::new(
            Duration::from_secs(config.request_timeout_seconds),
            policy,
        )?;

        Ok(Self { config, caller })
    }

    /// Coin record for a contract, `Ok(None)` when the chain has no platform
    /// id or CoinGecko does not know the contract (404)
    pub async fn get_coin_by_contract(
        &self,
        chain_id: u64,
        contract_address: &str,
    ) -> Result<Option<CoinGeckoCoin>> {
        let platform = match platform_id(chain_id) {
            Some(platform) => platform,
            None => return Ok(None),
        };

        let request = HttpRequest::get(format!(
            "{}/api/v3/coins/{}/contract/{}",
            self.config.api_base_url, platform, contract_address
        ))
        .header("Accept", "application/json");

        let body = match self.caller.call(&request).await {
            Ok(body) => body,
            // An unknown contract is a miss, not a failure
            Err(CallError::Provider {
                status: Some(404), ..
            }) => {
                debug!(
                    "CoinGecko has no entry for {} on {}",
                    contract_address, platform
                );
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let coin: CoinGeckoCoin = serde_json::from_value(body)
            .map_err(|e| CoinGeckoError::InvalidResponse(e.to_string()))?;
        debug!(
            "✅ CoinGecko data for {} on {}: price={:?}",
            coin.symbol.as_deref().unwrap_or(contract_address),
            platform,
            coin.price_usd()
        );
        Ok(Some(coin))
    }
}

fn into_holdings_error(error: CoinGeckoError) -> HoldingsError {
    match error {
        CoinGeckoError::Call(CallError::RateLimited) => {
            HoldingsError::RateLimited("coingecko".to_string())
        }
        other => HoldingsError::Provider(other.to_string()),
    }
}

#[async_trait]
impl PriceLogoSource for CoinGeckoClient {
    fn source_name(&self) -> &'static str {
        "coingecko"
    }

    async fn try_resolve(
        &self,
        query: &TokenQuery,
    ) -> holdings_core::Result<Option<ResolvedPrice>> {
        let coin = self
            .get_coin_by_contract(query.chain_id, &query.contract_address)
            .await
            .map_err(into_holdings_error)?;

        Ok(coin.map(|coin| ResolvedPrice {
            price_usd: coin.price_usd(),
            logo_url: coin.logo_url(),
        }))
    }
}
