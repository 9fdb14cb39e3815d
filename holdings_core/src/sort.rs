//! Deterministic ordering and deduplication of enriched holdings.

use std::cmp::Ordering;
use std::collections::HashSet;

use tracing::debug;

use crate::EnrichedHolding;

/// Sort holdings for presentation: priced entries first, descending by USD
/// value, then unpriced entries descending by raw amount.
///
/// The sort is stable, so entries that compare equal keep their input order.
pub fn sort_holdings(holdings: &mut [EnrichedHolding]) {
    holdings.sort_by(compare_holdings);
}

fn compare_holdings(a: &EnrichedHolding, b: &EnrichedHolding) -> Ordering {
    match (a.usd_value, b.usd_value) {
        (Some(a_usd), Some(b_usd)) => b_usd.partial_cmp(&a_usd).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => b.raw_amount.cmp(&a.raw_amount),
    }
}

/// Drop holdings that repeat an already-seen (chain, contract) pair, keeping
/// the first occurrence in input order.
pub fn dedup_holdings(holdings: Vec<EnrichedHolding>) -> Vec<EnrichedHolding> {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(holdings.len());

    for holding in holdings {
        let key = (holding.chain_id, holding.contract_address.to_lowercase());
        if seen.insert(key) {
            unique.push(holding);
        } else {
            debug!(
                "Dropping duplicate holding {} on chain {}",
                holding.contract_address, holding.chain_id
            );
        }
    }

    unique
}
