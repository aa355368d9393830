//! Conversion between decimal token amounts and 18-decimal base units.

use alloy_primitives::utils::{format_ether, parse_ether};
use alloy_primitives::U256;

/// Convert a decimal ether amount to wei.
///
/// The shortest decimal rendering of the float is parsed, so `0.00001`
/// becomes exactly `10_000_000_000_000` wei.
pub fn ether_to_wei(value: f64) -> Result<U256, String> {
    if !value.is_finite() || value < 0.0 {
        return Err(format!("amount must be a non-negative number, got {value}"));
    }
    parse_ether(&value.to_string()).map_err(|e| e.to_string())
}

/// Lossy decimal view of a wei amount, for logs and prompts
pub fn wei_to_ether(amount: U256) -> f64 {
    format_ether(amount).parse::<f64>().unwrap_or(f64::MAX)
}

/// Render a wei amount with a fixed number of decimals
pub fn display_ether(amount: U256, decimals: usize) -> String {
    format!("{:.*}", decimals, wei_to_ether(amount))
}
