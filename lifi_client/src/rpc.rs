use std::time::Duration;

use async_trait::async_trait;
use holdings_core::{
    chain_by_id, decode_hex_amount, HoldingsError, NativeBalance, NativeBalanceSource,
    NATIVE_DECIMALS,
};
use retry_utils::{CallError, HttpCaller, HttpRequest, RetryPolicy};
use serde_json::json;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum RpcError {
    #[error("request failed: {0}")]
    Call(#[from] CallError),
    #[error("unknown chain id: {0}")]
    UnknownChain(u64),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Wallet-balance client speaking `eth_getBalance` to each chain's public RPC
/// endpoint from the registry
#[derive(Debug, Clone)]
pub struct RpcBalanceClient {
    caller: HttpCaller,
}

impl RpcBalanceClient {
    pub fn new(timeout: Duration, policy: RetryPolicy) -> Result<Self, RpcError> {
        let caller = HttpCaller::new(timeout, policy)?;
        Ok(Self { caller })
    }

    /// Native balance for a wallet; symbol and decimals come from the chain
    /// registry, the amount from the node
    pub async fn get_native_balance(
        &self,
        chain_id: u64,
        wallet_address: &str,
    ) -> Result<NativeBalance, RpcError> {
        let chain = chain_by_id(chain_id).ok_or(RpcError::UnknownChain(chain_id))?;

        let request = HttpRequest::post(chain.rpc_url).json(json!({
            "jsonrpc": "2.0",
            "method": "eth_getBalance",
            "params": [wallet_address, "latest"],
            "id": 1,
        }));

        let body = self.caller.call(&request).await?;
        let hex_balance = body
            .get("result")
            .and_then(|result| result.as_str())
            .ok_or_else(|| {
                RpcError::InvalidResponse("eth_getBalance returned no result".to_string())
            })?;

        let raw_amount = decode_hex_amount(hex_balance)
            .map_err(|e| RpcError::InvalidResponse(e.to_string()))?;

        debug!(
            "✅ Native balance for {} on {}: {} wei",
            wallet_address, chain.display_name, raw_amount
        );
        Ok(NativeBalance {
            symbol: chain.native_symbol.to_string(),
            decimals: NATIVE_DECIMALS,
            raw_amount,
        })
    }
}

#[async_trait]
impl NativeBalanceSource for RpcBalanceClient {
    async fn fetch_native_balance(
        &self,
        chain_id: u64,
        wallet_address: &str,
    ) -> holdings_core::Result<NativeBalance> {
        self.get_native_balance(chain_id, wallet_address)
            .await
            .map_err(|e| match e {
                RpcError::Call(CallError::RateLimited) => {
                    HoldingsError::RateLimited("wallet rpc".to_string())
                }
                other => HoldingsError::Provider(other.to_string()),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_chain_is_rejected_before_any_call() {
        let client =
            RpcBalanceClient::new(Duration::from_secs(5), RetryPolicy::default()).unwrap();

        let result = client.get_native_balance(999_999, "0xabc").await;
        assert!(matches!(result, Err(RpcError::UnknownChain(999_999))));
    }
}
