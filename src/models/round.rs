//! Process-wide round snapshot shared by every orchestrator.

use std::time::Duration;
use tokio::time::Instant;
use tracing::warn;

use crate::models::metric::{freshness_since, Freshness};

/// Current round number and lock status.
///
/// `round_number` only increases; `locked` may flip either way.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoundSnapshot {
    round_number: u64,
    locked: bool,
    refreshed_at: Option<Instant>,
}

impl RoundSnapshot {
    pub fn round_number(&self) -> u64 {
        self.round_number
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn refreshed_at(&self) -> Option<Instant> {
        self.refreshed_at
    }

    pub fn freshness(&self, now: Instant, ttl: Duration) -> Freshness {
        freshness_since(self.refreshed_at, now, ttl)
    }

    /// Record a round number read from the ledger. A lower number than the
    /// one already held is ignored.
    pub fn record_round(&mut self, round_number: u64, at: Instant) {
        if round_number < self.round_number {
            warn!(
                current = self.round_number,
                reported = round_number,
                "Ignoring round number lower than the cached round"
            );
        } else {
            self.round_number = round_number;
        }
        self.refreshed_at = Some(match self.refreshed_at {
            Some(previous) if previous > at => previous,
            _ => at,
        });
    }

    pub fn record_lock(&mut self, locked: bool) {
        self.locked = locked;
    }
}
