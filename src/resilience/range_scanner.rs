//! # Adaptive Range Scanner
//!
//! Fetches every matching event log over a block range that may exceed the
//! provider's per-query limit and may be rate limited.
//!
//! The scan carries three pieces of state for its whole duration:
//!
//! - `chunk_size`: starts at [`ScannerConfig::initial_chunk_size`] and is
//!   halved (never below the floor) when the provider rejects a range
//! - `delay`: pause between queries, doubled (never above the ceiling) when
//!   the provider rate limits
//! - `retries`: consecutive unclassified failures on the current sub-range
//!
//! Chunk size and delay only ever move toward "more conservative" and are
//! never reset mid-scan. The cursor advances only on success or after
//! retries for a sub-range are exhausted, in which case the sub-range is
//! recorded as skipped.

use serde::Serialize;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

use super::error_classifier::{classify_scan_error, ScanErrorCategory};
use super::ScannerConfig;
use crate::ledger::{LedgerClient, LedgerError, LogEvent, LogFilter};

/// Inclusive block range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BlockRange {
    pub from: u64,
    pub to: u64,
}

impl BlockRange {
    pub fn block_count(&self) -> u64 {
        self.to - self.from + 1
    }
}

/// A change to the scan's pacing state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScanAdjustment {
    ChunkHalved { chunk_size: u64 },
    DelayRaised { delay: Duration },
}

/// Outcome of a scan
#[derive(Debug, Default)]
pub struct ScanReport {
    /// Events from every fetched sub-range, in ascending block order
    pub events: Vec<LogEvent>,
    pub fetched: Vec<BlockRange>,
    /// Sub-ranges abandoned after exhausting retries
    pub skipped: Vec<BlockRange>,
    pub adjustments: Vec<ScanAdjustment>,
    pub final_chunk_size: u64,
    pub final_delay: Duration,
}

impl ScanReport {
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

#[derive(Debug)]
struct ScanState {
    chunk_size: u64,
    delay: Duration,
    retries: u32,
}

/// What to do with the cursor after a failed query
enum Recovery {
    Retry,
    Skip,
}

pub struct RangeScanner<'a> {
    client: &'a dyn LedgerClient,
    config: ScannerConfig,
}

impl<'a> RangeScanner<'a> {
    pub fn new(client: &'a dyn LedgerClient, config: ScannerConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Fetch all events matching `filter` in `[from_block, to_block]`
    #[instrument(skip(self, filter), fields(event = %filter.event))]
    pub async fn scan(&self, filter: &LogFilter, from_block: u64, to_block: u64) -> ScanReport {
        let mut state = ScanState {
            chunk_size: self.config.initial_chunk_size.max(1),
            delay: self.config.initial_delay(),
            retries: 0,
        };
        let mut report = ScanReport::default();

        if to_block < from_block {
            debug!(from_block, to_block, "Empty scan range");
            report.final_chunk_size = state.chunk_size;
            report.final_delay = state.delay;
            return report;
        }

        let total_blocks = to_block - from_block + 1;
        let mut current = from_block;

        loop {
            let end = current
                .saturating_add(state.chunk_size - 1)
                .min(to_block);

            let advance = match self.client.get_logs(filter, current, end).await {
                Ok(events) => {
                    state.retries = 0;
                    report.events.extend(events);
                    report.fetched.push(BlockRange {
                        from: current,
                        to: end,
                    });

                    let scanned = end - from_block + 1;
                    info!(
                        from = current,
                        to = end,
                        chunk_size = state.chunk_size,
                        delay_ms = state.delay.as_millis() as u64,
                        progress_pct = %format!("{:.1}", scanned as f64 * 100.0 / total_blocks as f64),
                        events = report.events.len(),
                        "📡 Scanning"
                    );

                    sleep(state.delay).await;
                    true
                }
                Err(err) => match self.recover(&mut state, &mut report, &err, current, end).await {
                    Recovery::Retry => false,
                    Recovery::Skip => true,
                },
            };

            if advance {
                match end.checked_add(1) {
                    Some(next) if next <= to_block => current = next,
                    _ => break,
                }
            }
        }

        report.final_chunk_size = state.chunk_size;
        report.final_delay = state.delay;

        info!(
            from_block,
            to_block,
            events = report.events.len(),
            skipped_ranges = report.skipped.len(),
            final_chunk_size = report.final_chunk_size,
            "✅ Scan complete"
        );

        report
    }

    async fn recover(
        &self,
        state: &mut ScanState,
        report: &mut ScanReport,
        err: &LedgerError,
        from: u64,
        to: u64,
    ) -> Recovery {
        match classify_scan_error(err) {
            ScanErrorCategory::Transient => {
                warn!(from, to, error = %err, "Timeout on sub-range, retrying");
                sleep(self.config.transient_backoff()).await;
                return Recovery::Retry;
            }
            ScanErrorCategory::RateLimited => {
                state.delay = (state.delay * 2).min(self.config.max_delay());
                report.adjustments.push(ScanAdjustment::DelayRaised { delay: state.delay });
                warn!(
                    delay_ms = state.delay.as_millis() as u64,
                    error = %err,
                    "Rate limited, slowing down"
                );
                sleep(state.delay).await;
                return Recovery::Retry;
            }
            ScanErrorCategory::RangeTooLarge if state.chunk_size > self.config.min_chunk_size => {
                state.chunk_size = (state.chunk_size / 2).max(self.config.min_chunk_size);
                report.adjustments.push(ScanAdjustment::ChunkHalved {
                    chunk_size: state.chunk_size,
                });
                warn!(
                    chunk_size = state.chunk_size,
                    error = %err,
                    "Reducing chunk size"
                );
                return Recovery::Retry;
            }
            // A range error at the floor is handled like any other failure
            ScanErrorCategory::RangeTooLarge | ScanErrorCategory::Other => {}
        }

        state.retries += 1;
        if state.retries <= self.config.max_retries {
            error!(
                from,
                to,
                retry = state.retries,
                max_retries = self.config.max_retries,
                error = %err,
                "Error querying sub-range"
            );
            sleep(self.config.retry_backoff()).await;
            Recovery::Retry
        } else {
            error!(
                from,
                to,
                max_retries = self.config.max_retries,
                error = %err,
                "❌ Giving up on sub-range, events in it are lost"
            );
            state.retries = 0;
            report.skipped.push(BlockRange { from, to });
            sleep(self.config.skip_backoff()).await;
            Recovery::Skip
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_range_len_is_inclusive() {
        assert_eq!(BlockRange { from: 10, to: 10 }.block_count(), 1);
        assert_eq!(BlockRange { from: 0, to: 999 }.block_count(), 1000);
    }

    #[test]
    fn test_report_completeness() {
        let mut report = ScanReport::default();
        assert!(report.is_complete());
        report.skipped.push(BlockRange { from: 1, to: 2 });
        assert!(!report.is_complete());
    }
}
