use std::time::Duration;

use async_trait::async_trait;
use config_manager::AlchemyConfig;
use holdings_core::{
    decode_hex_amount, BalanceSource, HoldingsError, RawBalance, TokenMetadata,
};
use retry_utils::{CallError, HttpCaller, HttpRequest, RetryPolicy};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum AlchemyError {
    #[error("request failed: {0}")]
    Call(#[from] CallError),
    #[error("unsupported chain id: {0}")]
    UnsupportedChain(u64),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

pub type Result<T> = std::result::Result<T, AlchemyError>;

/// Per-chain JSON-RPC base URLs; the API key is appended to form the endpoint
const BASE_URLS: [(u64, &str); 7] = [
    (1, "https://eth-mainnet.g.alchemy.com/v2/"),
    (10, "https://opt-mainnet.g.alchemy.com/v2/"),
    (137, "https://polygon-mainnet.g.alchemy.com/v2/"),
    (8453, "https://base-mainnet.g.alchemy.com/v2/"),
    (42161, "https://arb-mainnet.g.alchemy.com/v2/"),
    (43114, "https://avax-mainnet.g.alchemy.com/v2/"),
    (11155111, "https://eth-sepolia.g.alchemy.com/v2/"),
];

/// Base URL for a chain, if Alchemy serves it
pub fn base_url_for_chain(chain_id: u64) -> Option<&'static str> {
    BASE_URLS
        .iter()
        .find(|(id, _)| *id == chain_id)
        .map(|(_, url)| *url)
}

pub fn is_supported_chain(chain_id: u64) -> bool {
    base_url_for_chain(chain_id).is_some()
}

/// The balance-scannable chain set, derived from the base-URL map
pub fn alchemy_chain_ids() -> Vec<u64> {
    BASE_URLS.iter().map(|(id, _)| *id).collect()
}

/// One entry of an `alchemy_getTokenBalances` result
#[derive(Debug, Clone, Deserialize)]
pub struct AlchemyTokenBalance {
    #[serde(rename = "contractAddress")]
    pub contract_address: String,

    /// Hex-encoded balance in the token's smallest unit
    #[serde(rename = "tokenBalance")]
    pub token_balance: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlchemyTokenBalancesResult {
    pub address: String,
    #[serde(rename = "tokenBalances")]
    pub token_balances: Vec<AlchemyTokenBalance>,
}

/// `alchemy_getTokenMetadata` result; every field can come back null
#[derive(Debug, Clone, Deserialize)]
pub struct AlchemyTokenMetadataResult {
    pub symbol: Option<String>,
    pub name: Option<String>,
    pub decimals: Option<u8>,
    pub logo: Option<String>,
}

/// Alchemy JSON-RPC client for token balances and base metadata
#[derive(Debug, Clone)]
pub struct AlchemyClient {
    config: AlchemyConfig,
    caller: HttpCaller,
}

impl AlchemyClient {
    pub fn new(config: AlchemyConfig, policy: RetryPolicy) -> Result<Self> {
        let caller = HttpCaller::new(
            Duration::from_secs(config.request_timeout_seconds),
            policy,
        )?;

        Ok(Self { config, caller })
    }

    fn endpoint(&self, chain_id: u64) -> Result<String> {
        let base =
            base_url_for_chain(chain_id).ok_or(AlchemyError::UnsupportedChain(chain_id))?;
        Ok(format!("{}{}", base, self.config.api_key))
    }

    async fn rpc(&self, chain_id: u64, method: &str, params: Value) -> Result<Value> {
        let request = HttpRequest::post(self.endpoint(chain_id)?).json(json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1,
        }));

        let body = self.caller.call(&request).await?;
        body.get("result")
            .cloned()
            .ok_or_else(|| AlchemyError::InvalidResponse(format!("{} returned no result", method)))
    }

    /// List the ERC-20 balances Alchemy tracks for a wallet on one chain.
    ///
    /// Contract addresses are lowercased and hex amounts decoded; entries
    /// whose amount fails to decode are skipped individually. Zero balances
    /// are passed through, the scan layer decides what to keep.
    pub async fn get_token_balances(
        &self,
        chain_id: u64,
        wallet_address: &str,
    ) -> Result<Vec<RawBalance>> {
        debug!(
            "Fetching token balances from Alchemy for {} on chain {}",
            wallet_address, chain_id
        );

        let result = self
            .rpc(chain_id, "alchemy_getTokenBalances", json!([wallet_address]))
            .await?;
        let parsed: AlchemyTokenBalancesResult = serde_json::from_value(result)
            .map_err(|e| AlchemyError::InvalidResponse(e.to_string()))?;

        let total = parsed.token_balances.len();
        let mut balances = Vec::new();
        for entry in parsed.token_balances {
            let contract_address = entry.contract_address.to_lowercase();
            match decode_hex_amount(&entry.token_balance) {
                Ok(raw_amount) => balances.push(RawBalance {
                    chain_id,
                    contract_address,
                    raw_amount,
                }),
                Err(e) => {
                    warn!(
                        "⚠️  Skipping balance for {} on chain {}: {}",
                        contract_address, chain_id, e
                    );
                }
            }
        }

        debug!(
            "✅ Chain {}: decoded {} of {} balance entries",
            chain_id,
            balances.len(),
            total
        );
        Ok(balances)
    }

    /// Base metadata for one contract. Missing fields fall back to
    /// "UNKNOWN"/"Unknown Token"/18 so a sparse response still enriches.
    pub async fn get_token_metadata(
        &self,
        chain_id: u64,
        contract_address: &str,
    ) -> Result<TokenMetadata> {
        let result = self
            .rpc(
                chain_id,
                "alchemy_getTokenMetadata",
                json!([contract_address]),
            )
            .await?;
        let parsed: AlchemyTokenMetadataResult = serde_json::from_value(result)
            .map_err(|e| AlchemyError::InvalidResponse(e.to_string()))?;

        Ok(metadata_with_defaults(parsed))
    }
}

/// Fill a sparse metadata response with the placeholder values
fn metadata_with_defaults(parsed: AlchemyTokenMetadataResult) -> TokenMetadata {
    TokenMetadata {
        symbol: parsed
            .symbol
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "UNKNOWN".to_string()),
        name: parsed
            .name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "Unknown Token".to_string()),
        decimals: parsed.decimals.unwrap_or(18),
        logo_url: parsed.logo.filter(|l| !l.trim().is_empty()),
        price_usd: None,
    }
}

fn into_holdings_error(error: AlchemyError) -> HoldingsError {
    match error {
        AlchemyError::Call(CallError::RateLimited) => {
            HoldingsError::RateLimited("alchemy".to_string())
        }
        other => HoldingsError::Provider(other.to_string()),
    }
}

#[async_trait]
impl BalanceSource for AlchemyClient {
    fn supported_chain_ids(&self) -> Vec<u64> {
        alchemy_chain_ids()
    }

    async fn fetch_token_balances(
        &self,
        chain_id: u64,
        wallet_address: &str,
    ) -> holdings_core::Result<Vec<RawBalance>> {
        self.get_token_balances(chain_id, wallet_address)
            .await
            .map_err(into_holdings_error)
    }

    async fn fetch_token_metadata(
        &self,
        chain_id: u64,
        contract_address: &str,
    ) -> holdings_core::Result<TokenMetadata> {
        self.get_token_metadata(chain_id, contract_address)
            .await
            .map_err(into_holdings_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_lookup() {
        assert_eq!(
            base_url_for_chain(1),
            Some("https://eth-mainnet.g.alchemy.com/v2/")
        );
        assert_eq!(
            base_url_for_chain(42161),
            Some("https://arb-mainnet.g.alchemy.com/v2/")
        );
        assert_eq!(base_url_for_chain(56), None);
        assert!(is_supported_chain(11155111));
        assert!(!is_supported_chain(0));
    }

    #[test]
    fn test_chain_set_matches_url_map() {
        let ids = alchemy_chain_ids();
        assert_eq!(ids.len(), 7);
        assert!(ids.contains(&1));
        assert!(ids.contains(&8453));
        assert!(ids.contains(&43114));
    }

    #[test]
    fn test_balances_result_parses_provider_shape() {
        let body = json!({
            "address": "0xabc",
            "tokenBalances": [
                {
                    "contractAddress": "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2",
                    "tokenBalance": "0x14d1120d7b160000"
                }
            ]
        });

        let parsed: AlchemyTokenBalancesResult = serde_json::from_value(body).unwrap();
        assert_eq!(parsed.token_balances.len(), 1);
        assert_eq!(
            parsed.token_balances[0].token_balance,
            "0x14d1120d7b160000"
        );
    }

    #[test]
    fn test_metadata_defaults_fill_null_fields() {
        let body = json!({
            "symbol": null,
            "name": "",
            "decimals": null,
            "logo": "   "
        });
        let parsed: AlchemyTokenMetadataResult = serde_json::from_value(body).unwrap();
        let metadata = metadata_with_defaults(parsed);

        assert_eq!(metadata.symbol, "UNKNOWN");
        assert_eq!(metadata.name, "Unknown Token");
        assert_eq!(metadata.decimals, 18);
        assert_eq!(metadata.logo_url, None);
    }

    #[test]
    fn test_metadata_defaults_keep_real_fields() {
        let body = json!({
            "symbol": "WETH",
            "name": "Wrapped Ether",
            "decimals": 18,
            "logo": "https://img/weth.png"
        });
        let parsed: AlchemyTokenMetadataResult = serde_json::from_value(body).unwrap();
        let metadata = metadata_with_defaults(parsed);

        assert_eq!(metadata.symbol, "WETH");
        assert_eq!(metadata.logo_url.as_deref(), Some("https://img/weth.png"));
    }

    #[test]
    fn test_rate_limit_maps_to_holdings_rate_limited() {
        let error = into_holdings_error(AlchemyError::Call(CallError::RateLimited));
        assert!(matches!(error, HoldingsError::RateLimited(_)));

        let error = into_holdings_error(AlchemyError::UnsupportedChain(56));
        assert!(matches!(error, HoldingsError::Provider(_)));
    }
}
