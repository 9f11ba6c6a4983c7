//! Quote arithmetic and order construction.

use std::time::{SystemTime, UNIX_EPOCH};

use alloy::primitives::{Address, U256};

use crate::blockchain::types::ExactInSwap;
use crate::blockchain::units;
use crate::config::TokenRef;

/// Deviation of the execution price from 1:1, in percent.
///
/// The test pairs are seeded at parity, so this is a display heuristic rather
/// than a reserve-based impact. Returns 0 when there is no output to compare.
pub fn price_impact_pct(amount_in: f64, amount_out: f64) -> f64 {
    if amount_out <= 0.0 || !amount_in.is_finite() || !amount_out.is_finite() {
        return 0.0;
    }
    ((amount_in / amount_out) - 1.0).abs() * 100.0
}

/// Price impact of a raw quote, using each token's decimals.
pub fn quote_impact_pct(from: &TokenRef, amount_in: U256, to: &TokenRef, amount_out: U256) -> f64 {
    price_impact_pct(
        units::to_f64(amount_in, from.decimals),
        units::to_f64(amount_out, to.decimals),
    )
}

/// Single-hop router path.
pub fn direct_path(from: &TokenRef, to: &TokenRef) -> Vec<Address> {
    vec![from.address, to.address]
}

/// Unix timestamp `offset_secs` from now.
pub fn deadline_from_now(offset_secs: u64) -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
        + offset_secs
}

/// Build an exact-input swap order for a quoted amount.
pub fn build_exact_in(
    from: &TokenRef,
    to: &TokenRef,
    amount_in: U256,
    quoted_out: U256,
    slippage_bps: u32,
    recipient: Address,
    deadline: u64,
) -> ExactInSwap {
    ExactInSwap {
        amount_in,
        amount_out_min: units::apply_slippage(quoted_out, slippage_bps),
        path: direct_path(from, to),
        recipient,
        deadline,
    }
}
