//! # Refresh Scheduler
//!
//! Per-orchestrator, per-metric TTL cache in front of the ledger client.
//!
//! [`RefreshScheduler::get_or_refresh`] returns the cached value while it is
//! fresh and re-reads it from the ledger otherwise. A failed read is logged
//! and leaves both the cached value and its timestamp untouched, so callers
//! always get a value back and the tick is never blocked by a read error.

use alloy_primitives::U256;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::ledger::{ContractSet, LedgerClient, LedgerResult};
use crate::logging::{log_error, log_refresh};
use crate::models::units::display_ether;
use crate::models::{Freshness, Metric, MetricValue, Orchestrator, RoundSnapshot};
use crate::orchestration::context::MetricTtls;

#[derive(Clone)]
pub struct RefreshScheduler {
    client: Arc<dyn LedgerClient>,
    contracts: ContractSet,
    ttls: MetricTtls,
    /// Wallet balances below this trigger a top-up warning
    eth_warn: U256,
}

impl std::fmt::Debug for RefreshScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshScheduler")
            .field("contracts", &self.contracts)
            .field("ttls", &self.ttls)
            .field("eth_warn", &self.eth_warn)
            .finish()
    }
}

impl RefreshScheduler {
    pub fn new(
        client: Arc<dyn LedgerClient>,
        contracts: ContractSet,
        ttls: MetricTtls,
        eth_warn: U256,
    ) -> Self {
        Self {
            client,
            contracts,
            ttls,
            eth_warn,
        }
    }

    pub fn ttls(&self) -> &MetricTtls {
        &self.ttls
    }

    /// Cached value if fresh, otherwise a fresh read (or the stale value if the read fails)
    pub async fn get_or_refresh(&self, orchestrator: &mut Orchestrator, metric: Metric) -> MetricValue {
        let ttl = self.ttls.for_metric(metric);
        if let Freshness::Fresh { remaining } = orchestrator.freshness(metric, Instant::now(), ttl) {
            let value = orchestrator.value(metric);
            log_refresh(
                &orchestrator.label(),
                &metric.to_string(),
                &value.to_string(),
                true,
                remaining.as_secs_f64(),
            );
            return value;
        }

        self.refresh(orchestrator, metric).await
    }

    /// Re-read a metric regardless of its TTL
    pub async fn force_refresh(&self, orchestrator: &mut Orchestrator, metric: Metric) -> MetricValue {
        self.refresh(orchestrator, metric).await
    }

    async fn refresh(&self, orchestrator: &mut Orchestrator, metric: Metric) -> MetricValue {
        match self.fetch(orchestrator, metric).await {
            Ok(value) => {
                orchestrator.record(metric, value, Instant::now());
                let value = orchestrator.value(metric);
                log_refresh(
                    &orchestrator.label(),
                    &metric.to_string(),
                    &value.to_string(),
                    false,
                    self.ttls.for_metric(metric).as_secs_f64(),
                );
                if metric == Metric::WalletBalance {
                    self.warn_if_low(orchestrator, value.amount());
                }
                value
            }
            Err(e) => {
                log_error(
                    "refresh_scheduler",
                    &format!("refresh {metric}"),
                    &e.to_string(),
                    Some(&orchestrator.label()),
                );
                orchestrator.value(metric)
            }
        }
    }

    async fn fetch(&self, orchestrator: &Orchestrator, metric: Metric) -> LedgerResult<MetricValue> {
        let client = self.client.as_ref();
        let address = orchestrator.address();
        let bonding = &self.contracts.bonding_manager;

        Ok(match metric {
            Metric::PendingStake => MetricValue::Amount(bonding.pending_stake(client, address).await?),
            Metric::PendingFees => MetricValue::Amount(bonding.pending_fees(client, address).await?),
            Metric::WalletBalance => MetricValue::Amount(client.get_balance(address).await?),
            Metric::LastRewardRound => {
                MetricValue::Round(bonding.last_reward_round(client, address).await?)
            }
        })
    }

    fn warn_if_low(&self, orchestrator: &Orchestrator, balance: U256) {
        if balance < self.eth_warn {
            warn!(
                orchestrator = %orchestrator.label(),
                balance = %display_ether(balance, 4),
                warn_below = %display_ether(self.eth_warn, 4),
                "⚠️ {} should top up their ETH balance ASAP!",
                orchestrator.label()
            );
        }
    }

    /// Refresh round number and lock status together when the snapshot is stale
    pub async fn refresh_round(&self, round: &mut RoundSnapshot) {
        if let Freshness::Fresh { remaining } = round.freshness(Instant::now(), self.ttls.round) {
            info!(
                round = round.round_number(),
                locked = round.is_locked(),
                seconds_remaining = remaining.as_secs_f64().round(),
                "(cached) Round status: round {} ({}). Refreshing in {:.0} seconds...",
                round.round_number(),
                if round.is_locked() { "locked" } else { "unlocked" },
                remaining.as_secs_f64()
            );
            return;
        }

        self.force_refresh_round(round).await;
    }

    /// Read both round fields; the snapshot changes only if both reads succeed
    pub async fn force_refresh_round(&self, round: &mut RoundSnapshot) {
        let client = self.client.as_ref();
        let rounds = &self.contracts.rounds_manager;

        let result = async {
            let number = rounds.current_round(client).await?;
            let locked = rounds.current_round_locked(client).await?;
            LedgerResult::Ok((number, locked))
        }
        .await;

        match result {
            Ok((number, locked)) => {
                round.record_round(number, Instant::now());
                round.record_lock(locked);
                info!(
                    round = round.round_number(),
                    locked = round.is_locked(),
                    "(refreshed) Current round number is {}, lock status is {}",
                    round.round_number(),
                    round.is_locked()
                );
            }
            Err(e) => {
                log_error("refresh_scheduler", "refresh round", &e.to_string(), None);
            }
        }
    }
}
