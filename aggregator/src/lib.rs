//! Wallet holdings aggregation engine.
//!
//! Drives the full scan for one wallet: cache lookup, native-currency
//! balance for the active chain, paced multi-chain token balance fetch,
//! per-token enrichment, dedup and sort, cache write.

pub mod balances;
pub mod batch;
pub mod enrich;

pub use balances::BalanceFetcher;
pub use batch::run_batched;
pub use enrich::MetadataEnricher;

use std::sync::Arc;
use std::time::Duration;

use config_manager::ScanConfig;
use holdings_core::{
    approx_units, chain_by_id, dedup_holdings, format_units, is_evm_address, sort_holdings,
    BalanceSource, EnrichedHolding, NativeBalanceSource, PriceLogoSource, TokenQuery,
    NATIVE_TOKEN_ADDRESS, ZERO_ADDRESS,
};
use result_cache::{CacheKey, CacheScope, HoldingsCache};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::enrich::resolve_price_and_logo;

#[derive(Error, Debug)]
pub enum AggregatorError {
    #[error("invalid wallet address: {0}")]
    InvalidAddress(String),
    #[error("no holdings data available for {0}")]
    NoData(String),
}

pub type Result<T> = std::result::Result<T, AggregatorError>;

/// The aggregation engine. One instance per process, shared by reference.
pub struct Aggregator {
    fetcher: BalanceFetcher,
    enricher: MetadataEnricher,
    native_source: Arc<dyn NativeBalanceSource>,
    native_price_sources: Vec<Arc<dyn PriceLogoSource>>,
    cache: Arc<HoldingsCache>,
    token_batch_size: usize,
    inter_batch_delay: Duration,
}

impl Aggregator {
    pub fn new(
        balance_source: Arc<dyn BalanceSource>,
        price_sources: Vec<Arc<dyn PriceLogoSource>>,
        native_price_sources: Vec<Arc<dyn PriceLogoSource>>,
        native_source: Arc<dyn NativeBalanceSource>,
        cache: Arc<HoldingsCache>,
        scan: &ScanConfig,
    ) -> Self {
        let inter_batch_delay = Duration::from_millis(scan.inter_batch_delay_ms);

        Self {
            fetcher: BalanceFetcher::new(
                Arc::clone(&balance_source),
                scan.chain_batch_size,
                inter_batch_delay,
            ),
            enricher: MetadataEnricher::new(balance_source, price_sources),
            native_source,
            native_price_sources,
            cache,
            token_batch_size: scan.token_batch_size,
            inter_batch_delay,
        }
    }

    /// Aggregate all holdings for a wallet.
    ///
    /// `native_chain_id` names the wallet's active chain; its native balance
    /// is included when given. Errors only on an invalid address or when no
    /// source produced any data at all; partial provider coverage still
    /// returns whatever was reachable.
    pub async fn aggregate(
        &self,
        wallet_address: &str,
        native_chain_id: Option<u64>,
    ) -> Result<Arc<Vec<EnrichedHolding>>> {
        if !is_evm_address(wallet_address) {
            return Err(AggregatorError::InvalidAddress(wallet_address.to_string()));
        }

        let scope = match native_chain_id {
            Some(chain_id) => CacheScope::Chain(chain_id),
            None => CacheScope::AllChains,
        };
        let key = CacheKey::new(wallet_address, scope);
        if let Some(cached) = self.cache.get(&key) {
            info!(
                "📦 Serving {} holdings for {} from cache",
                cached.len(),
                wallet_address
            );
            return Ok(cached);
        }

        info!("🚀 Aggregating holdings for {}", wallet_address);

        let mut holdings = Vec::new();
        if let Some(chain_id) = native_chain_id {
            if let Some(native) = self.enrich_native(chain_id, wallet_address).await {
                holdings.push(native);
            }
        }

        let raw_balances = self.fetcher.fetch_all_chains(wallet_address).await;
        let token_count = raw_balances.len();
        let enriched: Vec<EnrichedHolding> = run_batched(
            raw_balances,
            self.token_batch_size,
            self.inter_batch_delay,
            |balance| self.enricher.enrich(balance),
        )
        .await
        .into_iter()
        .flatten()
        .collect();
        debug!(
            "{} of {} token balances survived enrichment",
            enriched.len(),
            token_count
        );
        holdings.extend(enriched);

        let mut holdings = dedup_holdings(holdings);
        sort_holdings(&mut holdings);

        if holdings.is_empty() {
            warn!("❌ No holdings data from any source for {}", wallet_address);
            return Err(AggregatorError::NoData(wallet_address.to_string()));
        }

        info!(
            "✅ Aggregated {} holdings for {}",
            holdings.len(),
            wallet_address
        );
        let payload = Arc::new(holdings);
        self.cache.put(key, Arc::clone(&payload));
        Ok(payload)
    }

    /// Native-currency holding for the wallet's active chain.
    ///
    /// Native currencies have no contract metadata, so this goes straight to
    /// the price/logo chain keyed by the zero address. The holding survives
    /// even when every price provider comes up empty.
    async fn enrich_native(
        &self,
        chain_id: u64,
        wallet_address: &str,
    ) -> Option<EnrichedHolding> {
        let chain = match chain_by_id(chain_id) {
            Some(chain) => chain,
            None => {
                warn!("⚠️  Native balance requested for unregistered chain {}", chain_id);
                return None;
            }
        };

        let native = match self
            .native_source
            .fetch_native_balance(chain_id, wallet_address)
            .await
        {
            Ok(native) => native,
            Err(e) => {
                warn!("⚠️  Native balance fetch failed on chain {}: {}", chain_id, e);
                return None;
            }
        };

        let query = TokenQuery {
            chain_id,
            contract_address: ZERO_ADDRESS.to_string(),
            symbol: Some(native.symbol.clone()),
        };
        let mut token_logo = None;
        let (price_usd, _) =
            resolve_price_and_logo(&self.native_price_sources, &query, &mut token_logo).await;

        let human_balance = format_units(&native.raw_amount, native.decimals);
        let usd_value =
            price_usd.map(|price| approx_units(&native.raw_amount, native.decimals) * price);

        Some(EnrichedHolding {
            chain_id,
            contract_address: NATIVE_TOKEN_ADDRESS.to_string(),
            raw_amount: native.raw_amount,
            decimals: native.decimals,
            human_balance,
            usd_value,
            symbol: native.symbol.clone(),
            name: native.symbol,
            chain_name: chain.display_name.to_string(),
            chain_logo: Some(chain.logo_url.to_string()),
            token_logo,
        })
    }
}
