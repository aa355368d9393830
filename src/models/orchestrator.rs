//! Managed orchestrator accounts.

use alloy_primitives::{Address, U256};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::Instant;
use tracing::warn;
use zeroize::Zeroizing;

use crate::error::{Result, SiphonError};
use crate::models::metric::{CachedMetric, Freshness, Metric, MetricValue};

/// Opaque signing credential. Never printed; wiped on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningKey(Zeroizing<Vec<u8>>);

impl SigningKey {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(Zeroizing::new(bytes.into()))
    }

    pub fn expose(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SigningKey([REDACTED])")
    }
}

/// Credential state: loaded at startup, or waiting for one operator prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    Unresolved,
    Resolved(SigningKey),
}

impl Credential {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Credential::Resolved(_))
    }

    pub fn key(&self) -> Option<&SigningKey> {
        match self {
            Credential::Resolved(key) => Some(key),
            Credential::Unresolved => None,
        }
    }
}

/// Addresses identifying an orchestrator and its receivers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorIdentity {
    pub source: Address,
    pub receiver_eth: Address,
    pub receiver_lpt: Address,
    pub keystore: PathBuf,
}

impl OrchestratorIdentity {
    pub fn source_checksum(&self) -> String {
        self.source.to_checksum(None)
    }

    pub fn receiver_eth_checksum(&self) -> String {
        self.receiver_eth.to_checksum(None)
    }

    pub fn receiver_lpt_checksum(&self) -> String {
        self.receiver_lpt.to_checksum(None)
    }
}

/// One managed ledger identity with its credential and cached metrics
#[derive(Debug)]
pub struct Orchestrator {
    identity: OrchestratorIdentity,
    credential: Credential,
    pending_stake: CachedMetric<U256>,
    pending_fees: CachedMetric<U256>,
    wallet_balance: CachedMetric<U256>,
    last_reward_round: CachedMetric<u64>,
}

impl Orchestrator {
    pub fn new(identity: OrchestratorIdentity, credential: Credential) -> Self {
        Self {
            identity,
            credential,
            pending_stake: CachedMetric::default(),
            pending_fees: CachedMetric::default(),
            wallet_balance: CachedMetric::default(),
            last_reward_round: CachedMetric::default(),
        }
    }

    pub fn identity(&self) -> &OrchestratorIdentity {
        &self.identity
    }

    pub fn address(&self) -> Address {
        self.identity.source
    }

    /// Checksummed source address, used as the log label
    pub fn label(&self) -> String {
        self.identity.source_checksum()
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// Store the decrypted key. Only an unresolved credential can be resolved.
    pub fn resolve_credential(&mut self, key: SigningKey) -> Result<()> {
        match self.credential {
            Credential::Unresolved => {
                self.credential = Credential::Resolved(key);
                Ok(())
            }
            Credential::Resolved(_) => Err(SiphonError::InvalidState(format!(
                "credential for {} is already resolved",
                self.label()
            ))),
        }
    }

    pub fn value(&self, metric: Metric) -> MetricValue {
        match metric {
            Metric::PendingStake => MetricValue::Amount(self.pending_stake.value()),
            Metric::PendingFees => MetricValue::Amount(self.pending_fees.value()),
            Metric::WalletBalance => MetricValue::Amount(self.wallet_balance.value()),
            Metric::LastRewardRound => MetricValue::Round(self.last_reward_round.value()),
        }
    }

    pub fn freshness(&self, metric: Metric, now: Instant, ttl: Duration) -> Freshness {
        match metric {
            Metric::PendingStake => self.pending_stake.freshness(now, ttl),
            Metric::PendingFees => self.pending_fees.freshness(now, ttl),
            Metric::WalletBalance => self.wallet_balance.freshness(now, ttl),
            Metric::LastRewardRound => self.last_reward_round.freshness(now, ttl),
        }
    }

    pub fn refreshed_at(&self, metric: Metric) -> Option<Instant> {
        match metric {
            Metric::PendingStake => self.pending_stake.refreshed_at(),
            Metric::PendingFees => self.pending_fees.refreshed_at(),
            Metric::WalletBalance => self.wallet_balance.refreshed_at(),
            Metric::LastRewardRound => self.last_reward_round.refreshed_at(),
        }
    }

    /// Store a freshly read value. The last reward round never moves backwards.
    pub fn record(&mut self, metric: Metric, value: MetricValue, at: Instant) {
        match metric {
            Metric::PendingStake => self.pending_stake.record(value.amount(), at),
            Metric::PendingFees => self.pending_fees.record(value.amount(), at),
            Metric::WalletBalance => self.wallet_balance.record(value.amount(), at),
            Metric::LastRewardRound => {
                let cached = self.last_reward_round.value();
                let reported = value.round();
                if reported < cached {
                    warn!(
                        orchestrator = %self.label(),
                        cached,
                        reported,
                        "Ignoring last reward round lower than the cached value"
                    );
                }
                self.last_reward_round.record(reported.max(cached), at);
            }
        }
    }

    pub fn pending_stake(&self) -> U256 {
        self.pending_stake.value()
    }

    pub fn pending_fees(&self) -> U256 {
        self.pending_fees.value()
    }

    pub fn wallet_balance(&self) -> U256 {
        self.wallet_balance.value()
    }

    pub fn last_reward_round(&self) -> u64 {
        self.last_reward_round.value()
    }
}
