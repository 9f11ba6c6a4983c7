//! Conversion between user-entered decimal text and raw token amounts.
//!
//! Used only at the orchestrator boundary; chain calls always take raw
//! integer amounts.

use alloy::primitives::utils::{format_units, parse_units, ParseUnits};
use alloy::primitives::U256;

use crate::error::{Error, Result};

/// Basis-point denominator (10000 bps = 100%).
pub const BPS_DENOMINATOR: u32 = 10_000;

/// Parse a human decimal amount (e.g. `"99.5"`) into raw units.
///
/// More fractional digits than `decimals`, negative values and non-numeric
/// text are rejected; zero is accepted and left to the caller.
pub fn parse_amount(text: &str, decimals: u8) -> Result<U256> {
    let text = text.trim();
    if text.is_empty() {
        return Err(Error::InvalidAmount("empty amount".to_string()));
    }
    if let Some((_, fraction)) = text.split_once('.') {
        if fraction.len() > usize::from(decimals) {
            return Err(Error::InvalidAmount(format!(
                "'{}' has more than {} decimal places",
                text, decimals
            )));
        }
    }
    match parse_units(text, decimals) {
        Ok(ParseUnits::U256(value)) => Ok(value),
        Ok(ParseUnits::I256(_)) => Err(Error::InvalidAmount(format!("negative amount '{}'", text))),
        Err(e) => Err(Error::InvalidAmount(format!("'{}': {}", text, e))),
    }
}

/// Format raw units as a human decimal string without trailing zeros.
pub fn format_amount(value: U256, decimals: u8) -> String {
    match format_units(value, decimals) {
        Ok(formatted) => trim_fraction(formatted),
        // decimals beyond what U256 can scale; show the raw value
        Err(_) => value.to_string(),
    }
}

fn trim_fraction(mut formatted: String) -> String {
    if formatted.contains('.') {
        let trimmed = formatted.trim_end_matches('0').trim_end_matches('.').len();
        formatted.truncate(trimmed);
    }
    formatted
}

/// Lossy float view of a raw amount, for display-only ratios.
pub fn to_f64(value: U256, decimals: u8) -> f64 {
    format_amount(value, decimals).parse().unwrap_or(0.0)
}

/// `value × (10000 − bps) / 10000`, rounded down.
///
/// Values too large to scale first are divided first instead.
pub fn apply_slippage(value: U256, slippage_bps: u32) -> U256 {
    let keep = U256::from(BPS_DENOMINATOR.saturating_sub(slippage_bps));
    let denominator = U256::from(BPS_DENOMINATOR);
    match value.checked_mul(keep) {
        Some(scaled) => scaled / denominator,
        None => value / denominator * keep,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn units(whole: u64, decimals: u8) -> U256 {
        U256::from(whole) * U256::from(10u64).pow(U256::from(decimals))
    }

    #[test]
    fn test_parse_whole_and_fraction() {
        assert_eq!(parse_amount("100", 18).unwrap(), units(100, 18));
        assert_eq!(
            parse_amount("99.5", 18).unwrap(),
            units(995, 17)
        );
        assert_eq!(parse_amount(" 1.25 ", 6).unwrap(), U256::from(1_250_000u64));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(parse_amount("", 18), Err(Error::InvalidAmount(_))));
        assert!(matches!(parse_amount("abc", 18), Err(Error::InvalidAmount(_))));
        assert!(matches!(parse_amount("-1", 18), Err(Error::InvalidAmount(_))));
    }

    #[test]
    fn test_parse_rejects_excess_decimals() {
        assert!(matches!(parse_amount("1.2345678", 6), Err(Error::InvalidAmount(_))));
        assert!(matches!(
            parse_amount("1.0000000000000000001", 18),
            Err(Error::InvalidAmount(_))
        ));
        assert!(matches!(parse_amount("1.5", 0), Err(Error::InvalidAmount(_))));
        assert_eq!(parse_amount("1.234567", 6).unwrap(), U256::from(1_234_567u64));
    }

    #[test]
    fn test_parse_zero() {
        assert_eq!(parse_amount("0", 18).unwrap(), U256::ZERO);
        assert_eq!(parse_amount("0.0", 18).unwrap(), U256::ZERO);
    }

    #[test]
    fn test_format_trims_trailing_zeros() {
        assert_eq!(format_amount(units(100, 18), 18), "100");
        assert_eq!(format_amount(units(995, 17), 18), "99.5");
        assert_eq!(format_amount(U256::from(1_250_000u64), 6), "1.25");
        assert_eq!(format_amount(U256::ZERO, 18), "0");
    }

    #[test]
    fn test_apply_slippage_rounds_down() {
        // 99.5 × 0.995 = 99.0025
        let min_out = apply_slippage(units(995, 17), 50);
        assert_eq!(format_amount(min_out, 18), "99.0025");

        // 7 × 0.995 = 6.965 → 6 at zero decimals
        assert_eq!(apply_slippage(U256::from(7u64), 50), U256::from(6u64));
        assert_eq!(apply_slippage(U256::from(7u64), 0), U256::from(7u64));
    }

    #[test]
    fn test_apply_slippage_does_not_wrap() {
        let min_out = apply_slippage(U256::MAX, 50);
        assert_eq!(min_out, U256::MAX / U256::from(10_000u64) * U256::from(9_950u64));
        assert!(min_out > U256::MAX / U256::from(2u64));
    }

    #[test]
    fn test_to_f64() {
        assert!((to_f64(units(995, 17), 18) - 99.5).abs() < 1e-9);
    }
}
