//! Commission-rate input parsing and conversion to contract units.

use crate::error::{Result, SiphonError};

/// Contract precision: 1% == 10,000
const PERCENT_SCALE: f64 = 10_000.0;

/// Parse an operator-entered percentage in `[0, 100]`.
///
/// Accepts `.` or `,` as the decimal separator; input containing both is
/// rejected as ambiguous.
pub fn parse_percentage(input: &str) -> Result<f64> {
    let input = input.trim();
    if input.contains(',') && input.contains('.') {
        return Err(SiphonError::Validation(format!(
            "Ambiguous number format: '{input}'"
        )));
    }

    let value: f64 = input
        .replace(',', ".")
        .parse()
        .map_err(|_| SiphonError::Validation(format!("Not a number: '{input}'")))?;

    if !(0.0..=100.0).contains(&value) {
        return Err(SiphonError::Validation(format!(
            "Percentage must be between 0 and 100, got {value}"
        )));
    }
    Ok(value)
}

/// `transcoder(rewardCut, feeShare)` arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommissionRates {
    /// Share of rewards the orchestrator keeps
    pub reward_cut: u64,
    /// Share of fees passed on to delegators
    pub fee_share: u64,
}

impl CommissionRates {
    /// From the percentages of rewards and fees the orchestrator keeps
    pub fn from_kept_percentages(reward_percent: f64, fee_percent: f64) -> Self {
        Self {
            reward_cut: to_contract_units(reward_percent),
            fee_share: to_contract_units(100.0 - fee_percent),
        }
    }
}

fn to_contract_units(percent: f64) -> u64 {
    (percent * PERCENT_SCALE).round().clamp(0.0, 100.0 * PERCENT_SCALE) as u64
}
