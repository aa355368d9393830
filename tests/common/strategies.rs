//! Proptest strategies for amounts, thresholds and scanner inputs.

#![allow(dead_code)]

use alloy_primitives::U256;
use proptest::prelude::*;

use orchestrator_siphon::resilience::ScannerConfig;

/// Whole-token amount scaled to 18 decimals, up to 10,000 tokens
pub fn token_amount_strategy() -> impl Strategy<Value = U256> {
    (0u64..10_000_000).prop_map(|milli| U256::from(milli) * U256::from(1_000_000_000_000_000u64))
}

/// Inclusive block range with up to a few million blocks
pub fn block_range_strategy() -> impl Strategy<Value = (u64, u64)> {
    (0u64..50_000_000, 0u64..3_000_000).prop_map(|(from, len)| (from, from + len))
}

/// Small scanner settings with zero backoff so scans stay fast
pub fn scanner_config_strategy() -> impl Strategy<Value = ScannerConfig> {
    (1u64..=8, 1u64..=64).prop_map(|(min_chunk, factor)| ScannerConfig {
        initial_chunk_size: min_chunk * factor,
        min_chunk_size: min_chunk,
        initial_delay_ms: 1,
        max_delay_ms: 4,
        max_retries: 2,
        transient_backoff_ms: 0,
        retry_backoff_ms: 0,
        skip_backoff_ms: 0,
    })
}
