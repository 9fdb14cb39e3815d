//! Plain-text presentation helpers for downstream consumers.
//!
//! No I/O here; everything operates on an already-aggregated holdings list.

use std::cmp::Ordering;

use crate::EnrichedHolding;

/// The summary covers at most this many holdings, ranked by USD value.
const SUMMARY_LIMIT: usize = 20;

/// Top `count` holdings by USD value (missing values rank as zero).
pub fn top_holdings(holdings: &[EnrichedHolding], count: usize) -> Vec<EnrichedHolding> {
    let mut ranked = holdings.to_vec();
    ranked.sort_by(|a, b| {
        let a_usd = a.usd_value.unwrap_or(0.0);
        let b_usd = b.usd_value.unwrap_or(0.0);
        b_usd.partial_cmp(&a_usd).unwrap_or(Ordering::Equal)
    });
    ranked.truncate(count);
    ranked
}

/// One line per holding: "SYMBOL (Name) - balance on Chain".
pub fn format_holdings(holdings: &[EnrichedHolding]) -> String {
    holdings
        .iter()
        .map(|holding| {
            format!(
                "{} ({}) - {} on {}",
                holding.symbol, holding.name, holding.human_balance, holding.chain_name
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Bulleted top-holdings summary with USD values where known.
pub fn format_holdings_summary(holdings: &[EnrichedHolding]) -> String {
    top_holdings(holdings, SUMMARY_LIMIT)
        .iter()
        .map(|holding| {
            let mut line = format!(
                "• {}: {} on {}",
                holding.symbol, holding.human_balance, holding.chain_name
            );
            if let Some(usd) = holding.usd_value {
                if usd > 0.0 {
                    line.push_str(&format!(" ({})", format_usd(usd)));
                }
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format a USD value with thousands separators and two decimal places.
pub fn format_usd(value: f64) -> String {
    let negative = value < 0.0;
    let cents = (value.abs() * 100.0).round() as u128;
    let dollars = cents / 100;
    let fraction = cents % 100;

    let digits = dollars.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    if negative {
        format!("-${grouped}.{fraction:02}")
    } else {
        format!("${grouped}.{fraction:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigUint;

    fn holding(symbol: &str, balance: &str, usd_value: Option<f64>) -> EnrichedHolding {
        EnrichedHolding {
            chain_id: 1,
            contract_address: format!("0x{}", symbol.to_lowercase()),
            raw_amount: BigUint::from(1u8),
            decimals: 18,
            human_balance: balance.to_string(),
            usd_value,
            symbol: symbol.to_string(),
            name: format!("{symbol} Token"),
            chain_name: "Ethereum Mainnet".to_string(),
            chain_logo: None,
            token_logo: None,
        }
    }

    #[test]
    fn test_format_usd() {
        assert_eq!(format_usd(3.75), "$3.75");
        assert_eq!(format_usd(0.5), "$0.50");
        assert_eq!(format_usd(1234.5), "$1,234.50");
        assert_eq!(format_usd(1_000_000.0), "$1,000,000.00");
        assert_eq!(format_usd(0.0), "$0.00");
        assert_eq!(format_usd(-42.129), "-$42.13");
    }

    #[test]
    fn test_top_holdings_ranks_by_usd() {
        let holdings = vec![
            holding("LOW", "1", Some(5.0)),
            holding("NONE", "9", None),
            holding("HIGH", "2", Some(100.0)),
        ];

        let top = top_holdings(&holdings, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].symbol, "HIGH");
        assert_eq!(top[1].symbol, "LOW");
    }

    #[test]
    fn test_format_holdings_lines() {
        let holdings = vec![holding("WETH", "1.5", Some(3.75))];
        assert_eq!(
            format_holdings(&holdings),
            "WETH (WETH Token) - 1.5 on Ethereum Mainnet"
        );
    }

    #[test]
    fn test_summary_includes_usd_only_when_known() {
        let holdings = vec![
            holding("WETH", "1.5", Some(3750.0)),
            holding("MYSTERY", "10", None),
        ];

        let summary = format_holdings_summary(&holdings);
        let lines: Vec<&str> = summary.lines().collect();
        assert_eq!(lines[0], "• WETH: 1.5 on Ethereum Mainnet ($3,750.00)");
        assert_eq!(lines[1], "• MYSTERY: 10 on Ethereum Mainnet");
    }
}
