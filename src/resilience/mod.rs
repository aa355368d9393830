//! # Resilience Module
//!
//! Fault tolerance for unbounded, rate-limited event-log history queries.
//!
//! ## Architecture
//!
//! - **Error Classification**: maps a failed log query onto one of four
//!   recovery tiers (transient, rate limited, range too large, other)
//! - **Range Scanner**: chunked log fetch whose chunk size only shrinks and
//!   whose pacing delay only grows over the course of a scan
//! - **Configuration**: [`ScannerConfig`] bounds for chunk size, delay and retries
//!
//! ## Usage
//!
//! ```rust,no_run
//! use orchestrator_siphon::ledger::{LedgerClient, LogFilter};
//! use orchestrator_siphon::resilience::{RangeScanner, ScannerConfig};
//!
//! # async fn example(client: &dyn LedgerClient, filter: LogFilter) {
//! let scanner = RangeScanner::new(client, ScannerConfig::default());
//! let report = scanner.scan(&filter, 1_000_000, 2_000_000).await;
//! println!("{} events, {} skipped ranges", report.events.len(), report.skipped.len());
//! # }
//! ```

pub mod error_classifier;
pub mod range_scanner;

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use error_classifier::{classify_scan_error, ScanErrorCategory};
pub use range_scanner::{BlockRange, RangeScanner, ScanAdjustment, ScanReport};

/// Bounds for the adaptive range scanner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Blocks per query at the start of a scan
    pub initial_chunk_size: u64,

    /// Chunk size is never halved below this
    pub min_chunk_size: u64,

    /// Pause between successful queries at the start of a scan
    pub initial_delay_ms: u64,

    /// Rate-limit backoff never raises the pause above this
    pub max_delay_ms: u64,

    /// Attempts allowed for an unclassified failure before the sub-range is skipped
    pub max_retries: u32,

    /// Pause before retrying after a timeout or connection failure
    pub transient_backoff_ms: u64,

    /// Pause before retrying after an unclassified failure
    pub retry_backoff_ms: u64,

    /// Pause after giving up on a sub-range
    pub skip_backoff_ms: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            initial_chunk_size: 500_000,
            min_chunk_size: 1_000,
            initial_delay_ms: 10,
            max_delay_ms: 500,
            max_retries: 3,
            transient_backoff_ms: 1_000,
            retry_backoff_ms: 1_000,
            skip_backoff_ms: 500,
        }
    }
}

impl ScannerConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    pub fn transient_backoff(&self) -> Duration {
        Duration::from_millis(self.transient_backoff_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn skip_backoff(&self) -> Duration {
        Duration::from_millis(self.skip_backoff_ms)
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.min_chunk_size == 0 {
            return Err("min_chunk_size must be greater than 0".to_string());
        }

        if self.min_chunk_size > self.initial_chunk_size {
            return Err(format!(
                "min_chunk_size ({}) must not exceed initial_chunk_size ({})",
                self.min_chunk_size, self.initial_chunk_size
            ));
        }

        if self.initial_delay_ms == 0 {
            return Err("initial_delay_ms must be greater than 0".to_string());
        }

        if self.max_delay_ms < self.initial_delay_ms {
            return Err(format!(
                "max_delay_ms ({}) must not be below initial_delay_ms ({})",
                self.max_delay_ms, self.initial_delay_ms
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ScannerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.initial_delay(), Duration::from_millis(10));
        assert_eq!(config.max_delay(), Duration::from_millis(500));
    }

    #[test]
    fn test_floor_above_initial_chunk_rejected() {
        let config = ScannerConfig {
            min_chunk_size: 1_000_000,
            ..ScannerConfig::default()
        };
        assert!(config.validate().unwrap_err().contains("min_chunk_size"));
    }

    #[test]
    fn test_ceiling_below_initial_delay_rejected() {
        let config = ScannerConfig {
            max_delay_ms: 5,
            ..ScannerConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
