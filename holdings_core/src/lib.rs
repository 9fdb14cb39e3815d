pub mod amount;
pub mod chains;
pub mod sort;
pub mod spam;
pub mod summary;

// Re-export the types callers reach for most often
pub use amount::{approx_units, decode_hex_amount, encode_hex_amount, format_units};
pub use chains::{chain_by_id, supported_chain_ids, ChainDescriptor, NATIVE_DECIMALS};
pub use sort::{dedup_holdings, sort_holdings};
pub use spam::SpamClassifier;

use async_trait::async_trait;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HoldingsError {
    #[error("decode error: {0}")]
    Decode(String),
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("provider error: {0}")]
    Provider(String),
    #[error("invalid wallet address: {0}")]
    InvalidAddress(String),
}

pub type Result<T> = std::result::Result<T, HoldingsError>;

/// The zero contract address some providers return for a chain's native slot
pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// Sentinel contract address used for native-currency holdings in output
pub const NATIVE_TOKEN_ADDRESS: &str = "native";

/// One token balance as reported by a balances provider, before enrichment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBalance {
    /// Chain the balance lives on
    pub chain_id: u64,

    /// Lowercase contract address (or the "native" sentinel)
    pub contract_address: String,

    /// Balance in the token's smallest unit; can exceed 2^64
    pub raw_amount: BigUint,
}

/// Token metadata assembled incrementally during enrichment
#[derive(Debug, Clone, PartialEq)]
pub struct TokenMetadata {
    /// Ticker symbol, e.g. "WETH"
    pub symbol: String,

    /// Full display name, e.g. "Wrapped Ether"
    pub name: String,

    /// Decimal places for scaling the raw amount
    pub decimals: u8,

    /// Token logo URL, if any provider had one
    pub logo_url: Option<String>,

    /// Unit price in USD, if any provider had one
    pub price_usd: Option<f64>,
}

/// Native-currency balance as reported by a wallet RPC
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeBalance {
    /// Native symbol, e.g. "ETH"
    pub symbol: String,

    /// Decimal places (18 on every supported chain)
    pub decimals: u8,

    /// Balance in wei-style smallest units
    pub raw_amount: BigUint,
}

/// Terminal, externally visible holding record.
///
/// `raw_amount` crosses the wire as a decimal string so consumers never lose
/// precision to a fixed-width integer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedHolding {
    pub chain_id: u64,
    pub contract_address: String,
    #[serde(with = "amount::decimal_string")]
    pub raw_amount: BigUint,
    pub decimals: u8,
    /// Integer-exact balance string, e.g. "1.5"
    pub human_balance: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usd_value: Option<f64>,
    pub symbol: String,
    pub name: String,
    pub chain_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_logo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_logo: Option<String>,
}

/// Lookup key handed to price/logo providers
#[derive(Debug, Clone)]
pub struct TokenQuery {
    pub chain_id: u64,

    /// Lowercase contract address; the zero address for native currencies
    pub contract_address: String,

    /// Symbol hint for providers that can search by symbol first
    pub symbol: Option<String>,
}

/// Price and/or logo returned by one provider in the fallback chain.
///
/// A provider can legitimately return a logo without a price; both fields
/// `None` still counts as data from that provider (the caller distinguishes
/// "provider answered with nothing useful" from "provider had no entry").
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedPrice {
    pub price_usd: Option<f64>,
    pub logo_url: Option<String>,
}

/// Per-chain token balance listing plus per-contract base metadata
#[async_trait]
pub trait BalanceSource: Send + Sync {
    /// Chains this provider can list balances for
    fn supported_chain_ids(&self) -> Vec<u64>;

    /// List ERC-20-style balances for a wallet on one chain
    async fn fetch_token_balances(
        &self,
        chain_id: u64,
        wallet_address: &str,
    ) -> Result<Vec<RawBalance>>;

    /// Base metadata (symbol, name, decimals, logo) for one contract
    async fn fetch_token_metadata(
        &self,
        chain_id: u64,
        contract_address: &str,
    ) -> Result<TokenMetadata>;
}

/// One step in the ordered price/logo fallback chain
#[async_trait]
pub trait PriceLogoSource: Send + Sync {
    /// Short provider name for logs
    fn source_name(&self) -> &'static str;

    /// Resolve price/logo for a token; `Ok(None)` means the provider has no
    /// entry for it, which is not an error
    async fn try_resolve(&self, query: &TokenQuery) -> Result<Option<ResolvedPrice>>;
}

/// Native-currency balance lookup for a wallet's active chain
#[async_trait]
pub trait NativeBalanceSource: Send + Sync {
    async fn fetch_native_balance(
        &self,
        chain_id: u64,
        wallet_address: &str,
    ) -> Result<NativeBalance>;
}

/// Validate an EVM address: 0x followed by 40 hex characters.
pub fn is_evm_address(address: &str) -> bool {
    address.len() == 42
        && address.starts_with("0x")
        && address[2..].chars().all(|c| c.is_ascii_hexdigit())
}
