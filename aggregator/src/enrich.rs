//! Per-token enrichment: base metadata, spam filtering, and the ordered
//! price/logo provider chain.

use std::sync::Arc;

use holdings_core::{
    approx_units, chain_by_id, format_units, BalanceSource, EnrichedHolding, PriceLogoSource,
    RawBalance, SpamClassifier, TokenQuery,
};
use tracing::{debug, warn};

/// Walk `sources` in order, stopping at the first one that yields a price.
///
/// A logo is adopted from the first provider that has one while `logo_url`
/// is still missing or blank. Provider errors and empty lookups only log.
/// The returned flag records whether any provider had an entry at all.
pub(crate) async fn resolve_price_and_logo(
    sources: &[Arc<dyn PriceLogoSource>],
    query: &TokenQuery,
    logo_url: &mut Option<String>,
) -> (Option<f64>, bool) {
    let mut price_usd = None;
    let mut any_provider_data = false;

    for source in sources {
        match source.try_resolve(query).await {
            Ok(Some(resolved)) => {
                any_provider_data = true;

                if logo_url.as_deref().map_or(true, |l| l.trim().is_empty()) {
                    if let Some(new_logo) = resolved.logo_url {
                        debug!(
                            "🖼️  Adopting logo for {} from {}",
                            query.contract_address,
                            source.source_name()
                        );
                        *logo_url = Some(new_logo);
                    }
                }

                if let Some(price) = resolved.price_usd {
                    debug!(
                        "💰 {} priced {} at ${}",
                        source.source_name(),
                        query.contract_address,
                        price
                    );
                    price_usd = Some(price);
                    break;
                }
            }
            Ok(None) => {
                debug!(
                    "{} has no entry for {} on chain {}",
                    source.source_name(),
                    query.contract_address,
                    query.chain_id
                );
            }
            Err(e) => {
                warn!(
                    "⚠️  {} lookup failed for {}: {}",
                    source.source_name(),
                    query.contract_address,
                    e
                );
            }
        }
    }

    (price_usd, any_provider_data)
}

/// Resolves one raw balance into a display-ready holding.
pub struct MetadataEnricher {
    balance_source: Arc<dyn BalanceSource>,
    price_sources: Vec<Arc<dyn PriceLogoSource>>,
    spam: SpamClassifier,
}

impl MetadataEnricher {
    pub fn new(
        balance_source: Arc<dyn BalanceSource>,
        price_sources: Vec<Arc<dyn PriceLogoSource>>,
    ) -> Self {
        Self {
            balance_source,
            price_sources,
            spam: SpamClassifier::new(),
        }
    }

    /// Enrich one balance, or drop it.
    ///
    /// `None` means the token was dropped: base metadata unavailable, spam,
    /// unregistered chain, or nothing known about it beyond the base lookup
    /// and no price. Dropping is per-token; failures never propagate.
    pub async fn enrich(&self, balance: RawBalance) -> Option<EnrichedHolding> {
        let chain = match chain_by_id(balance.chain_id) {
            Some(chain) => chain,
            None => {
                warn!("⚠️  Skipping balance on unregistered chain {}", balance.chain_id);
                return None;
            }
        };

        let mut metadata = match self
            .balance_source
            .fetch_token_metadata(balance.chain_id, &balance.contract_address)
            .await
        {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(
                    "⚠️  Dropping {} on chain {}: metadata fetch failed: {}",
                    balance.contract_address, balance.chain_id, e
                );
                return None;
            }
        };

        if self.spam.is_spam(&metadata.name, &metadata.symbol) {
            debug!(
                "🚫 Dropping spam token {} ({}) on chain {}",
                metadata.name, metadata.symbol, balance.chain_id
            );
            return None;
        }

        let query = TokenQuery {
            chain_id: balance.chain_id,
            contract_address: balance.contract_address.clone(),
            symbol: Some(metadata.symbol.clone()),
        };
        let (price_usd, any_provider_data) =
            resolve_price_and_logo(&self.price_sources, &query, &mut metadata.logo_url).await;

        if !any_provider_data && price_usd.is_none() {
            debug!(
                "Dropping {} ({}): no price source recognizes it",
                metadata.symbol, balance.contract_address
            );
            return None;
        }

        let human_balance = format_units(&balance.raw_amount, metadata.decimals);
        let usd_value =
            price_usd.map(|price| approx_units(&balance.raw_amount, metadata.decimals) * price);

        Some(EnrichedHolding {
            chain_id: balance.chain_id,
            contract_address: balance.contract_address,
            raw_amount: balance.raw_amount,
            decimals: metadata.decimals,
            human_balance,
            usd_value,
            symbol: metadata.symbol,
            name: metadata.name,
            chain_name: chain.display_name.to_string(),
            chain_logo: Some(chain.logo_url.to_string()),
            token_logo: metadata.logo_url,
        })
    }
}
