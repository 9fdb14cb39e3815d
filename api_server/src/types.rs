use chrono::{DateTime, Utc};
use holdings_core::EnrichedHolding;
use serde::{Deserialize, Serialize};

/// Standard API error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub timestamp: DateTime<Utc>,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub timestamp: DateTime<Utc>,
}

/// Request body for the balance scan endpoint
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalancesRequest {
    pub address: String,

    /// Active chain whose native balance is included in the scan; omitting
    /// it scans token balances only
    pub chain_id: Option<u64>,
}

/// Balance scan result for one wallet
#[derive(Debug, Serialize)]
pub struct BalancesResponse {
    pub address: String,
    pub holdings: Vec<EnrichedHolding>,
    pub count: usize,
}

/// Query parameters for the native-token metadata endpoint
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeTokenQuery {
    pub chain_id: Option<u64>,
}

/// Native-token metadata resolved from the cross-chain catalog
#[derive(Debug, Serialize)]
pub struct NativeTokenMetadataResponse {
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    #[serde(rename = "priceUSD")]
    pub price_usd: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_balances_request_accepts_camel_case_chain_id() {
        let request: BalancesRequest = serde_json::from_value(json!({
            "address": "0xd8da6bf26964af9d7eed9e03e53415d37aa96045",
            "chainId": 137
        }))
        .unwrap();

        assert_eq!(request.chain_id, Some(137));
    }

    #[test]
    fn test_balances_request_chain_id_is_optional() {
        let request: BalancesRequest = serde_json::from_value(json!({
            "address": "0xd8da6bf26964af9d7eed9e03e53415d37aa96045"
        }))
        .unwrap();

        assert_eq!(request.chain_id, None);
    }

    #[test]
    fn test_native_metadata_uses_wire_field_names() {
        let response = NativeTokenMetadataResponse {
            symbol: "ETH".to_string(),
            name: "Ether".to_string(),
            decimals: 18,
            logo: None,
            price_usd: 0.0,
        };

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["priceUSD"], 0.0);
        assert!(value.get("logo").is_none());
    }
}
