mod common;

use alloy_primitives::{Address, B256};
use std::collections::BTreeMap;
use std::time::Duration;

use common::MockLedger;
use orchestrator_siphon::ledger::{LedgerError, LedgerErrorKind, LogEvent, LogFilter};
use orchestrator_siphon::resilience::{BlockRange, RangeScanner, ScanAdjustment, ScannerConfig};

fn filter() -> LogFilter {
    LogFilter {
        contract: Address::repeat_byte(0xaa),
        event: "ProposalCreated".to_string(),
    }
}

fn event_at(block: u64) -> LogEvent {
    LogEvent {
        block_number: block,
        transaction_hash: B256::repeat_byte(block as u8),
        args: BTreeMap::new(),
    }
}

fn assert_contiguous(ranges: &[BlockRange], from: u64, to: u64) {
    assert_eq!(ranges.first().map(|r| r.from), Some(from));
    assert_eq!(ranges.last().map(|r| r.to), Some(to));
    for pair in ranges.windows(2) {
        assert_eq!(pair[0].to + 1, pair[1].from, "gap between {pair:?}");
    }
}

#[tokio::test(start_paused = true)]
async fn test_range_error_halves_chunk_and_retries_same_start() {
    let ledger = MockLedger::new();
    ledger.set_max_log_range(250_000);
    let scanner = RangeScanner::new(&ledger, ScannerConfig::default());

    let report = scanner.scan(&filter(), 1_000_000, 1_999_999).await;

    let calls = ledger.log_calls();
    assert_eq!(calls[0], (1_000_000, 1_499_999));
    assert_eq!(calls[1], (1_000_000, 1_249_999));
    assert_eq!(
        report.adjustments,
        vec![ScanAdjustment::ChunkHalved { chunk_size: 250_000 }]
    );
    assert_eq!(report.final_chunk_size, 250_000);
    assert!(report.is_complete());
    assert_eq!(report.fetched.len(), 4);
    assert_contiguous(&report.fetched, 1_000_000, 1_999_999);
}

#[tokio::test(start_paused = true)]
async fn test_chunk_size_never_drops_below_floor() {
    let ledger = MockLedger::new();
    ledger.set_max_log_range(700);
    let config = ScannerConfig {
        initial_chunk_size: 4_000,
        min_chunk_size: 1_000,
        ..ScannerConfig::default()
    };
    let scanner = RangeScanner::new(&ledger, config);

    let report = scanner.scan(&filter(), 0, 1_999).await;

    assert_eq!(
        report.adjustments,
        vec![
            ScanAdjustment::ChunkHalved { chunk_size: 2_000 },
            ScanAdjustment::ChunkHalved { chunk_size: 1_000 },
        ]
    );
    assert_eq!(report.final_chunk_size, 1_000);
    // At the floor, range errors go through bounded retries, then the sub-range is skipped
    assert_eq!(
        report.skipped,
        vec![
            BlockRange { from: 0, to: 999 },
            BlockRange { from: 1_000, to: 1_999 }
        ]
    );
    assert!(report.fetched.is_empty());
    assert_eq!(ledger.log_calls().len(), 2 + 2 * 4);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_doubles_delay_up_to_cap() {
    let ledger = MockLedger::new();
    for _ in 0..8 {
        ledger.fail_logs(LedgerError::new(LedgerErrorKind::RateLimited, "429"));
    }
    let scanner = RangeScanner::new(&ledger, ScannerConfig::default());

    let report = scanner.scan(&filter(), 0, 9_999).await;

    let delays: Vec<Duration> = report
        .adjustments
        .iter()
        .filter_map(|a| match a {
            ScanAdjustment::DelayRaised { delay } => Some(*delay),
            _ => None,
        })
        .collect();
    let expected: Vec<Duration> = [20, 40, 80, 160, 320, 500, 500, 500]
        .into_iter()
        .map(Duration::from_millis)
        .collect();
    assert_eq!(delays, expected);
    assert_eq!(report.final_delay, Duration::from_millis(500));
    assert!(report.is_complete());
    // Every retry is the same sub-range
    assert!(ledger.log_calls().iter().all(|call| *call == (0, 9_999)));
}

#[tokio::test(start_paused = true)]
async fn test_transient_failure_retries_without_adjusting() {
    let ledger = MockLedger::new();
    ledger.fail_logs(LedgerError::new(LedgerErrorKind::Timeout, "request timed out"));
    ledger.fail_logs(LedgerError::other("connection reset by peer"));
    ledger.push_log(event_at(42));
    let scanner = RangeScanner::new(&ledger, ScannerConfig::default());

    let report = scanner.scan(&filter(), 0, 100).await;

    assert_eq!(ledger.log_calls(), vec![(0, 100), (0, 100), (0, 100)]);
    assert!(report.adjustments.is_empty());
    assert_eq!(report.events.len(), 1);
    assert_eq!(report.final_delay, Duration::from_millis(10));
}

#[tokio::test(start_paused = true)]
async fn test_unclassified_failures_skip_after_max_retries() {
    let ledger = MockLedger::new();
    for _ in 0..4 {
        ledger.fail_logs(LedgerError::new(LedgerErrorKind::Reverted, "execution reverted"));
    }
    ledger.push_log(event_at(1_500));
    let config = ScannerConfig {
        initial_chunk_size: 1_000,
        min_chunk_size: 100,
        ..ScannerConfig::default()
    };
    let scanner = RangeScanner::new(&ledger, config);

    let report = scanner.scan(&filter(), 0, 1_999).await;

    assert_eq!(report.skipped, vec![BlockRange { from: 0, to: 999 }]);
    assert_eq!(report.fetched, vec![BlockRange { from: 1_000, to: 1_999 }]);
    assert_eq!(report.events.len(), 1);
    assert!(!report.is_complete());
    assert_eq!(ledger.log_calls().len(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_events_collected_across_chunks() {
    let ledger = MockLedger::new();
    for block in [5, 1_200, 2_999, 3_000] {
        ledger.push_log(event_at(block));
    }
    let config = ScannerConfig {
        initial_chunk_size: 1_000,
        min_chunk_size: 100,
        ..ScannerConfig::default()
    };
    let scanner = RangeScanner::new(&ledger, config);

    let report = scanner.scan(&filter(), 0, 2_999).await;

    let blocks: Vec<u64> = report.events.iter().map(|e| e.block_number).collect();
    assert_eq!(blocks, vec![5, 1_200, 2_999]);
    assert_contiguous(&report.fetched, 0, 2_999);
}

#[tokio::test]
async fn test_empty_range_makes_no_queries() {
    let ledger = MockLedger::new();
    let scanner = RangeScanner::new(&ledger, ScannerConfig::default());

    let report = scanner.scan(&filter(), 10, 9).await;

    assert!(ledger.log_calls().is_empty());
    assert!(report.events.is_empty());
    assert!(report.is_complete());
}
