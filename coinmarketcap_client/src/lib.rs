use std::time::Duration;

use async_trait::async_trait;
use config_manager::CoinMarketCapConfig;
use holdings_core::{HoldingsError, PriceLogoSource, ResolvedPrice, TokenQuery};
use retry_utils::{CallError, HttpCaller, HttpRequest, RetryPolicy};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum CoinMarketCapError {
    #[error("request failed: {0}")]
    Call(#[from] CallError),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

pub type Result<T> = std::result::Result<T, CoinMarketCapError>;

/// Chain id → CoinMarketCap platform slug
const PLATFORM_MAP: [(u64, &str); 6] = [
    (1, "ethereum"),
    (10, "optimistic-ethereum"),
    (137, "polygon-pos"),
    (42161, "arbitrum-one"),
    (8453, "base"),
    (43114, "avalanche"),
];

pub fn platform_slug(chain_id: u64) -> Option<&'static str> {
    PLATFORM_MAP
        .iter()
        .find(|(id, _)| *id == chain_id)
        .map(|(_, slug)| *slug)
}

/// One row of the `/v1/cryptocurrency/map` listing
#[derive(Debug, Clone, Deserialize)]
pub struct CmcMapEntry {
    pub id: u64,
    pub symbol: Option<String>,
    pub platform: Option<CmcPlatform>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CmcPlatform {
    pub slug: Option<String>,
    pub token_address: Option<String>,
}

/// Fields consumed from `/v2/cryptocurrency/info`
#[derive(Debug, Clone, Deserialize)]
pub struct CmcTokenInfo {
    pub symbol: Option<String>,
    pub name: Option<String>,
    pub logo: Option<String>,
}

/// CoinMarketCap Pro API client.
///
/// Lookups resolve an id through the map listing, symbol match first and
/// contract-address match second. A client without an API key stays usable:
/// every lookup resolves to "no entry".
#[derive(Debug, Clone)]
pub struct CoinMarketCapClient {
    config: CoinMarketCapConfig,
    caller: HttpCaller,
}

impl CoinMarketCapClient {
    pub fn new(config: CoinMarketCapConfig, policy: RetryPolicy) -> Result<Self> {
        let caller = HttpCaller::new(
            Duration::from_secs(config.request_timeout_seconds),
            policy,
        )?;

        Ok(Self { config, caller })
    }

    fn authed_get(&self, path: &str) -> HttpRequest {
        HttpRequest::get(format!("{}{}", self.config.api_base_url, path))
            .header("Accept", "application/json")
            .header("X-CMC_PRO_API_KEY", self.config.api_key.clone())
    }

    /// Fetch the active-listing id map used for both lookup strategies
    async fn fetch_map_listing(&self) -> Result<Vec<CmcMapEntry>> {
        let request = self
            .authed_get("/v1/cryptocurrency/map")
            .query("listing_status", "active")
            .query("start", "1")
            .query("limit", self.config.map_listing_limit.to_string());

        let body = self.caller.call(&request).await?;
        let data = body
            .get("data")
            .cloned()
            .ok_or_else(|| CoinMarketCapError::InvalidResponse("map listing had no data".into()))?;

        serde_json::from_value(data).map_err(|e| CoinMarketCapError::InvalidResponse(e.to_string()))
    }

    /// Resolve a CoinMarketCap id for the token, symbol match first and
    /// contract-address match as the fallback
    async fn find_token_id(&self, query: &TokenQuery) -> Result<Option<u64>> {
        let platform = match platform_slug(query.chain_id) {
            Some(platform) => platform,
            None => return Ok(None),
        };

        let listing = self.fetch_map_listing().await?;

        if let Some(symbol) = &query.symbol {
            let symbol_upper = symbol.to_uppercase();
            let by_symbol = listing.iter().find(|entry| {
                entry
                    .symbol
                    .as_deref()
                    .is_some_and(|s| s.to_uppercase() == symbol_upper)
                    && entry
                        .platform
                        .as_ref()
                        .and_then(|p| p.slug.as_deref())
                        .is_some_and(|slug| slug == platform)
            });
            if let Some(entry) = by_symbol {
                debug!(
                    "CoinMarketCap matched {} by symbol on {} (id {})",
                    symbol, platform, entry.id
                );
                return Ok(Some(entry.id));
            }
        }

        let contract_lower = query.contract_address.to_lowercase();
        let by_contract = listing.iter().find(|entry| {
            entry.platform.as_ref().is_some_and(|p| {
                p.slug.as_deref().is_some_and(|slug| slug == platform)
                    && p.token_address
                        .as_deref()
                        .is_some_and(|a| a.to_lowercase() == contract_lower)
            })
        });

        Ok(by_contract.map(|entry| entry.id))
    }

    /// Info + latest USD quote for one id. A failed quotes call degrades to
    /// logo-only data rather than discarding the info response.
    async fn fetch_token_data(&self, token_id: u64) -> Result<ResolvedPrice> {
        let info_request = self
            .authed_get("/v2/cryptocurrency/info")
            .query("id", token_id.to_string());
        let info_body = self.caller.call(&info_request).await?;
        let info: CmcTokenInfo = info_body
            .get("data")
            .and_then(|data| data.get(token_id.to_string()))
            .cloned()
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| CoinMarketCapError::InvalidResponse(e.to_string()))?
            .ok_or_else(|| {
                CoinMarketCapError::InvalidResponse(format!("no info entry for id {}", token_id))
            })?;

        let quotes_request = self
            .authed_get("/v1/cryptocurrency/quotes/latest")
            .query("id", token_id.to_string());
        let price_usd = match self.caller.call(&quotes_request).await {
            Ok(quotes_body) => quotes_body
                .get("data")
                .and_then(|data| data.get(token_id.to_string()))
                .and_then(|entry| entry.get("quote"))
                .and_then(|quote| quote.get("USD"))
                .and_then(|usd| usd.get("price"))
                .and_then(|price| price.as_f64()),
            Err(e) => {
                warn!(
                    "⚠️  CoinMarketCap quotes unavailable for id {} ({}), keeping info-only data",
                    token_id, e
                );
                None
            }
        };

        debug!(
            "✅ CoinMarketCap data for {} (id {}): price={:?}",
            info.symbol.as_deref().unwrap_or("?"),
            token_id,
            price_usd
        );
        Ok(ResolvedPrice {
            price_usd,
            logo_url: info.logo,
        })
    }

    /// Full lookup: id resolution then info/quote fetch. `Ok(None)` when the
    /// key is missing, the chain has no platform slug, or the map has no row.
    pub async fn get_token_data(&self, query: &TokenQuery) -> Result<Option<ResolvedPrice>> {
        if self.config.api_key.is_empty() {
            return Ok(None);
        }

        let token_id = match self.find_token_id(query).await? {
            Some(id) => id,
            None => {
                debug!(
                    "CoinMarketCap has no listing for {} on chain {}",
                    query.contract_address, query.chain_id
                );
                return Ok(None);
            }
        };

        self.fetch_token_data(token_id).await.map(Some)
    }
}

fn into_holdings_error(error: CoinMarketCapError) -> HoldingsError {
    match error {
        CoinMarketCapError::Call(CallError::RateLimited) => {
            HoldingsError::RateLimited("coinmarketcap".to_string())
        }
        other => HoldingsError::Provider(other.to_string()),
    }
}

#[async_trait]
impl PriceLogoSource for CoinMarketCapClient {
    fn source_name(&self) -> &'static str {
        "coinmarketcap"
    }

    async fn try_resolve(
        &self,
        query: &TokenQuery,
    ) -> holdings_core::Result<Option<ResolvedPrice>> {
        self.get_token_data(query).await.map_err(into_holdings_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_platform_slug_map() {
        assert_eq!(platform_slug(1), Some("ethereum"));
        assert_eq!(platform_slug(10), Some("optimistic-ethereum"));
        assert_eq!(platform_slug(137), Some("polygon-pos"));
        assert_eq!(platform_slug(43114), Some("avalanche"));
        // Sepolia is not listed
        assert_eq!(platform_slug(11155111), None);
    }

    #[test]
    fn test_map_entry_parses_with_and_without_platform() {
        let rows = json!([
            {
                "id": 3408,
                "symbol": "USDC",
                "platform": {
                    "slug": "ethereum",
                    "token_address": "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"
                }
            },
            { "id": 1, "symbol": "BTC", "platform": null }
        ]);

        let entries: Vec<CmcMapEntry> = serde_json::from_value(rows).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, 3408);
        assert_eq!(
            entries[0]
                .platform
                .as_ref()
                .and_then(|p| p.slug.as_deref()),
            Some("ethereum")
        );
        assert!(entries[1].platform.is_none());
    }

    #[test]
    fn test_token_info_tolerates_missing_fields() {
        let info: CmcTokenInfo = serde_json::from_value(json!({"name": "USD Coin"})).unwrap();
        assert_eq!(info.name.as_deref(), Some("USD Coin"));
        assert!(info.symbol.is_none());
        assert!(info.logo.is_none());
    }

    #[tokio::test]
    async fn test_keyless_client_resolves_to_no_entry() {
        let config = CoinMarketCapConfig {
            api_key: "".to_string(),
            api_base_url: "https://pro-api.coinmarketcap.com".to_string(),
            request_timeout_seconds: 10,
            map_listing_limit: 5000,
        };
        let client = CoinMarketCapClient::new(config, RetryPolicy::default()).unwrap();

        let query = TokenQuery {
            chain_id: 1,
            contract_address: "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48".to_string(),
            symbol: Some("USDC".to_string()),
        };
        let resolved = client.get_token_data(&query).await.unwrap();
        assert!(resolved.is_none());
    }
}
