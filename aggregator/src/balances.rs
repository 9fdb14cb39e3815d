//! Multi-chain balance collection.

use std::sync::Arc;
use std::time::Duration;

use holdings_core::{BalanceSource, RawBalance, ZERO_ADDRESS};
use num_traits::Zero;
use tracing::{debug, info, warn};

use crate::batch::run_batched;

/// Fans one wallet out across every chain the balance source supports,
/// in paced batches.
pub struct BalanceFetcher {
    source: Arc<dyn BalanceSource>,
    chain_batch_size: usize,
    inter_batch_delay: Duration,
}

impl BalanceFetcher {
    pub fn new(
        source: Arc<dyn BalanceSource>,
        chain_batch_size: usize,
        inter_batch_delay: Duration,
    ) -> Self {
        Self {
            source,
            chain_batch_size,
            inter_batch_delay,
        }
    }

    /// Collect token balances across all supported chains.
    ///
    /// Output follows the provider's chain order. A chain that errors
    /// contributes nothing instead of failing the scan. The zero-address
    /// pseudo-entry and zero balances are dropped here.
    pub async fn fetch_all_chains(&self, wallet_address: &str) -> Vec<RawBalance> {
        let chain_ids = self.source.supported_chain_ids();
        info!("🔍 Scanning {} chains for {}", chain_ids.len(), wallet_address);

        let per_chain = run_batched(
            chain_ids,
            self.chain_batch_size,
            self.inter_batch_delay,
            |chain_id| async move {
                match self
                    .source
                    .fetch_token_balances(chain_id, wallet_address)
                    .await
                {
                    Ok(balances) => balances,
                    Err(e) => {
                        warn!("⚠️  Chain {} balance fetch failed: {}", chain_id, e);
                        Vec::new()
                    }
                }
            },
        )
        .await;

        let balances: Vec<RawBalance> = per_chain
            .into_iter()
            .flatten()
            .filter(|balance| {
                balance.contract_address != ZERO_ADDRESS && !balance.raw_amount.is_zero()
            })
            .collect();

        debug!("✅ {} non-zero balances across all chains", balances.len());
        balances
    }
}
