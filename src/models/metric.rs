//! Cached `(value, last_refreshed_at)` pairs and their freshness rules.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

use crate::models::units::display_ether;

/// Per-orchestrator metric categories held by the refresh scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    PendingStake,
    PendingFees,
    WalletBalance,
    LastRewardRound,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::PendingStake,
        Metric::PendingFees,
        Metric::WalletBalance,
        Metric::LastRewardRound,
    ];
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::PendingStake => write!(f, "pending stake"),
            Metric::PendingFees => write!(f, "pending fees"),
            Metric::WalletBalance => write!(f, "wallet balance"),
            Metric::LastRewardRound => write!(f, "last reward round"),
        }
    }
}

/// Value of a metric as returned by `get_or_refresh`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricValue {
    /// Token amount in base units
    Amount(U256),
    Round(u64),
}

impl MetricValue {
    pub fn amount(self) -> U256 {
        match self {
            MetricValue::Amount(amount) => amount,
            MetricValue::Round(round) => U256::from(round),
        }
    }

    pub fn round(self) -> u64 {
        match self {
            MetricValue::Round(round) => round,
            MetricValue::Amount(amount) => u64::try_from(amount).unwrap_or(u64::MAX),
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Amount(amount) => write!(f, "{}", display_ether(*amount, 4)),
            MetricValue::Round(round) => write!(f, "{round}"),
        }
    }
}

/// Freshness of a cached value relative to its TTL
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Freshness {
    Fresh { remaining: Duration },
    Stale,
}

/// Freshness of a value read at `refreshed_at`. An expiry past the end of
/// the clock never arrives, so such a value stays fresh.
pub(crate) fn freshness_since(
    refreshed_at: Option<Instant>,
    now: Instant,
    ttl: Duration,
) -> Freshness {
    let Some(at) = refreshed_at else {
        return Freshness::Stale;
    };
    match at.checked_add(ttl) {
        Some(expires) if now < expires => Freshness::Fresh {
            remaining: expires - now,
        },
        Some(_) => Freshness::Stale,
        None => Freshness::Fresh {
            remaining: Duration::MAX,
        },
    }
}

impl Freshness {
    pub fn is_fresh(&self) -> bool {
        matches!(self, Freshness::Fresh { .. })
    }
}

/// A cached value and the instant it was last refreshed.
///
/// A value that has never been refreshed is always stale. The refresh
/// timestamp never moves backwards.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedMetric<T> {
    value: T,
    refreshed_at: Option<Instant>,
}

impl<T: Copy> CachedMetric<T> {
    pub fn new(initial: T) -> Self {
        Self {
            value: initial,
            refreshed_at: None,
        }
    }

    pub fn value(&self) -> T {
        self.value
    }

    pub fn refreshed_at(&self) -> Option<Instant> {
        self.refreshed_at
    }

    /// Fresh iff `now < refreshed_at + ttl`
    pub fn freshness(&self, now: Instant, ttl: Duration) -> Freshness {
        freshness_since(self.refreshed_at, now, ttl)
    }

    pub fn record(&mut self, value: T, at: Instant) {
        self.value = value;
        self.refreshed_at = Some(match self.refreshed_at {
            Some(previous) if previous > at => previous,
            _ => at,
        });
    }
}

impl<T: Copy + Default> Default for CachedMetric<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
