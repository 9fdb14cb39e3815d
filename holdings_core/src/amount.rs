//! Raw-amount codec and balance formatting.
//!
//! Balances arrive from providers as 0x-prefixed hex strings and can exceed
//! 2^64, so everything here goes through `BigUint`. Only the derived USD
//! estimate is allowed to drop to floating point.

use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};

use crate::{HoldingsError, Result};

/// Decode a 0x-prefixed hex amount into a big unsigned integer.
pub fn decode_hex_amount(hex: &str) -> Result<BigUint> {
    let digits = hex
        .strip_prefix("0x")
        .or_else(|| hex.strip_prefix("0X"))
        .ok_or_else(|| HoldingsError::Decode(format!("amount is not 0x-prefixed hex: {hex}")))?;

    BigUint::parse_bytes(digits.as_bytes(), 16)
        .ok_or_else(|| HoldingsError::Decode(format!("invalid hex amount: {hex}")))
}

/// Encode an amount back to its 0x-prefixed hex wire form.
pub fn encode_hex_amount(amount: &BigUint) -> String {
    format!("0x{}", amount.to_str_radix(16))
}

/// Format a raw amount as a human-readable decimal string.
///
/// Integer division/remainder against `10^decimals`, with trailing fractional
/// zeros trimmed. Never goes through floating point.
pub fn format_units(amount: &BigUint, decimals: u8) -> String {
    let divisor = BigUint::from(10u32).pow(decimals as u32);
    let whole = amount / &divisor;
    let fractional = amount % &divisor;

    if fractional.is_zero() {
        return whole.to_str_radix(10);
    }

    let padded = format!(
        "{:0>width$}",
        fractional.to_str_radix(10),
        width = decimals as usize
    );
    let trimmed = padded.trim_end_matches('0');

    format!("{}.{}", whole.to_str_radix(10), trimmed)
}

/// Lossy scaled value for USD math. Display only.
pub fn approx_units(amount: &BigUint, decimals: u8) -> f64 {
    let raw = amount.to_f64().unwrap_or(f64::INFINITY);
    raw / 10f64.powi(decimals as i32)
}

/// Serde adapter serializing a `BigUint` as a base-10 string.
pub mod decimal_string {
    use num_bigint::BigUint;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_str_radix(10))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BigUint, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        BigUint::parse_bytes(raw.as_bytes(), 10)
            .ok_or_else(|| de::Error::custom(format!("invalid decimal amount: {raw}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_round_trip() {
        for decimal in [
            "0",
            "1",
            "255",
            "1500000000000000000",
            // 100000 tokens at 18 decimals, well past 2^64
            "100000000000000000000000",
            // 2^256 - 1
            "115792089237316195423570985008687907853269984665640564039457584007913129639935",
        ] {
            let amount = BigUint::parse_bytes(decimal.as_bytes(), 10).unwrap();
            let encoded = encode_hex_amount(&amount);
            let decoded = decode_hex_amount(&encoded).unwrap();
            assert_eq!(decoded, amount, "round trip failed for {decimal}");
        }
    }

    #[test]
    fn test_decode_known_values() {
        assert_eq!(decode_hex_amount("0x0").unwrap(), BigUint::from(0u8));
        assert_eq!(decode_hex_amount("0xff").unwrap(), BigUint::from(255u32));
        assert_eq!(
            decode_hex_amount("0x14D1120D7B160000").unwrap(),
            BigUint::parse_bytes(b"1500000000000000000", 10).unwrap()
        );
    }

    #[test]
    fn test_decode_rejects_malformed_input() {
        assert!(decode_hex_amount("ff").is_err());
        assert!(decode_hex_amount("0x").is_err());
        assert!(decode_hex_amount("0xzz").is_err());
        assert!(decode_hex_amount("").is_err());
    }

    #[test]
    fn test_format_units() {
        let amount = BigUint::parse_bytes(b"1500000000000000000", 10).unwrap();
        assert_eq!(format_units(&amount, 18), "1.5");

        let amount = BigUint::parse_bytes(b"1000000000000000000", 10).unwrap();
        assert_eq!(format_units(&amount, 18), "1");

        let amount = BigUint::from(1u8);
        assert_eq!(format_units(&amount, 18), "0.000000000000000001");

        let amount = BigUint::from(0u8);
        assert_eq!(format_units(&amount, 18), "0");

        // Six-decimal stablecoin style
        let amount = BigUint::parse_bytes(b"12345678", 10).unwrap();
        assert_eq!(format_units(&amount, 6), "12.345678");

        // Zero decimals means the raw amount is the balance
        let amount = BigUint::from(42u8);
        assert_eq!(format_units(&amount, 0), "42");
    }

    #[test]
    fn test_format_units_exceeding_u64() {
        let amount = BigUint::parse_bytes(b"100000000000000000000000", 10).unwrap();
        assert_eq!(format_units(&amount, 18), "100000");
    }

    #[test]
    fn test_approx_units() {
        let amount = BigUint::parse_bytes(b"1500000000000000000", 10).unwrap();
        let units = approx_units(&amount, 18);
        assert!((units - 1.5).abs() < 1e-12);
    }
}
