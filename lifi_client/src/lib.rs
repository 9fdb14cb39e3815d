pub mod rpc;

pub use rpc::RpcBalanceClient;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use config_manager::LifiConfig;
use holdings_core::{HoldingsError, PriceLogoSource, ResolvedPrice, TokenQuery, ZERO_ADDRESS};
use retry_utils::{CallError, HttpCaller, HttpRequest, RetryPolicy};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum LifiError {
    #[error("request failed: {0}")]
    Call(#[from] CallError),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

pub type Result<T> = std::result::Result<T, LifiError>;

/// One catalog entry; `price_usd` stays a string on the wire
#[derive(Debug, Clone, Deserialize)]
pub struct LifiToken {
    #[serde(rename = "chainId")]
    pub chain_id: u64,
    pub address: String,
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
    #[serde(rename = "priceUSD")]
    pub price_usd: Option<String>,
    #[serde(rename = "coinKey")]
    pub coin_key: Option<String>,
    #[serde(rename = "logoURI")]
    pub logo_uri: Option<String>,
}

impl LifiToken {
    /// Usable unit price; the catalog reports "0" for unpriced tokens
    pub fn parsed_price_usd(&self) -> Option<f64> {
        self.price_usd
            .as_deref()
            .and_then(|p| p.parse::<f64>().ok())
            .filter(|p| *p > 0.0)
    }
}

/// Catalog indexed by chain id, with the fetch time for lazy expiry
#[derive(Debug)]
struct CatalogSnapshot {
    fetched_at: Instant,
    tokens: HashMap<u64, Vec<LifiToken>>,
}

impl CatalogSnapshot {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }
}

/// Parse the `/v1/tokens` response body into a per-chain index.
///
/// Chains whose key is not a numeric id are skipped, never fatal.
fn parse_catalog(body: &Value) -> Result<HashMap<u64, Vec<LifiToken>>> {
    let raw: HashMap<String, Vec<LifiToken>> = body
        .get("tokens")
        .cloned()
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| LifiError::InvalidResponse(e.to_string()))?
        .ok_or_else(|| LifiError::InvalidResponse("catalog had no tokens field".into()))?;

    let mut tokens = HashMap::with_capacity(raw.len());
    for (chain_key, chain_tokens) in raw {
        match chain_key.parse::<u64>() {
            Ok(chain_id) => {
                tokens.insert(chain_id, chain_tokens);
            }
            Err(_) => {
                warn!("⚠️  Skipping catalog entry with non-numeric chain key: {}", chain_key);
            }
        }
    }
    Ok(tokens)
}

fn lookup_token<'a>(
    tokens: &'a HashMap<u64, Vec<LifiToken>>,
    chain_id: u64,
    address: &str,
) -> Option<&'a LifiToken> {
    let address_lower = address.to_lowercase();
    tokens
        .get(&chain_id)?
        .iter()
        .find(|token| token.address.to_lowercase() == address_lower)
}

/// LI.FI cross-chain token catalog client.
///
/// One call fetches metadata for every token on every EVM chain, so the
/// catalog is cached in-process and refreshed lazily once it outlives the
/// configured TTL. Native tokens are the zero-address entries.
#[derive(Debug, Clone)]
pub struct LifiClient {
    config: LifiConfig,
    caller: HttpCaller,
    catalog: Arc<RwLock<Option<CatalogSnapshot>>>,
}

impl LifiClient {
    pub fn new(config: LifiConfig, policy: RetryPolicy) -> Result<Self> {
        let caller = HttpCaller::new(
            Duration::from_secs(config.request_timeout_seconds),
            policy,
        )?;

        Ok(Self {
            config,
            caller,
            catalog: Arc::new(RwLock::new(None)),
        })
    }

    fn ttl(&self) -> Duration {
        Duration::from_secs(self.config.catalog_ttl_seconds)
    }

    async fn fetch_catalog(&self) -> Result<HashMap<u64, Vec<LifiToken>>> {
        let request = HttpRequest::get(format!("{}/v1/tokens", self.config.api_base_url))
            .query("chainTypes", "evm")
            .header("Content-Type", "application/json");

        let body = self.caller.call(&request).await?;
        let tokens = parse_catalog(&body)?;
        info!(
            "✅ Fetched LI.FI token catalog covering {} chains",
            tokens.len()
        );
        Ok(tokens)
    }

    /// Look up a token, refreshing the catalog first if it is stale
    pub async fn find_token(&self, chain_id: u64, address: &str) -> Result<Option<LifiToken>> {
        {
            let guard = self.catalog.read().await;
            if let Some(snapshot) = guard.as_ref() {
                if snapshot.is_fresh(self.ttl()) {
                    return Ok(lookup_token(&snapshot.tokens, chain_id, address).cloned());
                }
            }
        }

        let mut guard = self.catalog.write().await;
        // Another task may have refreshed while this one waited for the lock
        if let Some(snapshot) = guard.as_ref() {
            if snapshot.is_fresh(self.ttl()) {
                return Ok(lookup_token(&snapshot.tokens, chain_id, address).cloned());
            }
        }

        debug!("LI.FI catalog stale or absent, refreshing");
        let tokens = self.fetch_catalog().await?;
        let found = lookup_token(&tokens, chain_id, address).cloned();
        *guard = Some(CatalogSnapshot {
            fetched_at: Instant::now(),
            tokens,
        });
        Ok(found)
    }

    /// Native-token catalog entry for a chain (the zero-address row)
    pub async fn find_native_token(&self, chain_id: u64) -> Result<Option<LifiToken>> {
        self.find_token(chain_id, ZERO_ADDRESS).await
    }
}

fn into_holdings_error(error: LifiError) -> HoldingsError {
    match error {
        LifiError::Call(CallError::RateLimited) => HoldingsError::RateLimited("lifi".to_string()),
        other => HoldingsError::Provider(other.to_string()),
    }
}

#[async_trait]
impl PriceLogoSource for LifiClient {
    fn source_name(&self) -> &'static str {
        "lifi"
    }

    async fn try_resolve(
        &self,
        query: &TokenQuery,
    ) -> holdings_core::Result<Option<ResolvedPrice>> {
        let token = self
            .find_token(query.chain_id, &query.contract_address)
            .await
            .map_err(into_holdings_error)?;

        Ok(token.map(|token| ResolvedPrice {
            price_usd: token.parsed_price_usd(),
            logo_url: token.logo_uri,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_catalog() -> Value {
        json!({
            "tokens": {
                "1": [
                    {
                        "chainId": 1,
                        "address": "0x0000000000000000000000000000000000000000",
                        "symbol": "ETH",
                        "name": "ETH",
                        "decimals": 18,
                        "priceUSD": "2500.42",
                        "coinKey": "ETH",
                        "logoURI": "https://example.com/eth.png"
                    },
                    {
                        "chainId": 1,
                        "address": "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48",
                        "symbol": "USDC",
                        "name": "USD Coin",
                        "decimals": 6,
                        "priceUSD": "1.0"
                    }
                ],
                "137": [
                    {
                        "chainId": 137,
                        "address": "0x0000000000000000000000000000000000000000",
                        "symbol": "MATIC",
                        "name": "MATIC",
                        "decimals": 18,
                        "priceUSD": "0"
                    }
                ],
                "not-a-chain": []
            },
            "extended": false
        })
    }

    #[test]
    fn test_parse_catalog_indexes_by_chain_and_skips_bad_keys() {
        let tokens = parse_catalog(&sample_catalog()).unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[&1].len(), 2);
        assert_eq!(tokens[&137].len(), 1);
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let tokens = parse_catalog(&sample_catalog()).unwrap();
        let usdc = lookup_token(
            &tokens,
            1,
            "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48",
        )
        .unwrap();
        assert_eq!(usdc.symbol, "USDC");
        assert_eq!(usdc.decimals, 6);

        assert!(lookup_token(&tokens, 1, "0xdeadbeef").is_none());
        assert!(lookup_token(&tokens, 56, ZERO_ADDRESS).is_none());
    }

    #[test]
    fn test_native_entry_sits_at_zero_address() {
        let tokens = parse_catalog(&sample_catalog()).unwrap();
        let eth = lookup_token(&tokens, 1, ZERO_ADDRESS).unwrap();
        assert_eq!(eth.symbol, "ETH");
        assert_eq!(eth.parsed_price_usd(), Some(2500.42));
        assert_eq!(eth.logo_uri.as_deref(), Some("https://example.com/eth.png"));
    }

    #[test]
    fn test_zero_price_string_means_unpriced() {
        let tokens = parse_catalog(&sample_catalog()).unwrap();
        let matic = lookup_token(&tokens, 137, ZERO_ADDRESS).unwrap();
        assert_eq!(matic.parsed_price_usd(), None);

        let unparseable = LifiToken {
            chain_id: 1,
            address: ZERO_ADDRESS.to_string(),
            symbol: "X".to_string(),
            name: "X".to_string(),
            decimals: 18,
            price_usd: Some("not-a-price".to_string()),
            coin_key: None,
            logo_uri: None,
        };
        assert_eq!(unparseable.parsed_price_usd(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_expires_after_ttl() {
        let snapshot = CatalogSnapshot {
            fetched_at: Instant::now(),
            tokens: HashMap::new(),
        };
        let ttl = Duration::from_secs(86_400);

        assert!(snapshot.is_fresh(ttl));
        tokio::time::advance(Duration::from_secs(86_399)).await;
        assert!(snapshot.is_fresh(ttl));
        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(!snapshot.is_fresh(ttl));
    }
}
