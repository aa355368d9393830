//! Explicit state shared by every component call: the managed
//! orchestrators, the process-wide round snapshot, the mode flag and the
//! static per-process settings.

use alloy_primitives::Address;
use std::time::Duration;

use crate::config::{ConfigResult, SiphonConfig, Thresholds};
use crate::models::{Metric, Orchestrator, RoundSnapshot};
use crate::orchestration::mode_switch::ModeController;

/// Independent cache lifetimes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricTtls {
    pub round: Duration,
    pub pending_stake: Duration,
    pub pending_fees: Duration,
    pub wallet_balance: Duration,
    pub reward_round: Duration,
}

impl MetricTtls {
    pub fn for_metric(&self, metric: Metric) -> Duration {
        match metric {
            Metric::PendingStake => self.pending_stake,
            Metric::PendingFees => self.pending_fees,
            Metric::WalletBalance => self.wallet_balance,
            Metric::LastRewardRound => self.reward_round,
        }
    }

    /// Same lifetime for every category
    pub fn uniform(ttl: Duration) -> Self {
        Self {
            round: ttl,
            pending_stake: ttl,
            pending_fees: ttl,
            wallet_balance: ttl,
            reward_round: ttl,
        }
    }
}

/// Static settings derived from validated configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiphonSettings {
    pub thresholds: Thresholds,
    pub ttls: MetricTtls,
    pub withdraw_to_receiver: bool,
    pub idle_wait: Duration,
    pub idle_slice: Duration,
}

impl SiphonSettings {
    pub fn from_config(config: &SiphonConfig) -> ConfigResult<Self> {
        let timers = &config.timers;
        Ok(Self {
            thresholds: config.thresholds.to_base_units()?,
            ttls: MetricTtls {
                round: timers.round_ttl(),
                pending_stake: timers.pending_stake_ttl(),
                pending_fees: timers.pending_fees_ttl(),
                wallet_balance: timers.wallet_balance_ttl(),
                reward_round: timers.reward_round_ttl(),
            },
            withdraw_to_receiver: config.features.withdraw_to_receiver,
            idle_wait: timers.idle_wait(),
            idle_slice: timers.idle_slice(),
        })
    }
}

#[derive(Debug)]
pub struct SiphonContext {
    pub orchestrators: Vec<Orchestrator>,
    pub round: RoundSnapshot,
    pub mode: ModeController,
    pub settings: SiphonSettings,
}

impl SiphonContext {
    pub fn new(
        orchestrators: Vec<Orchestrator>,
        mode: ModeController,
        settings: SiphonSettings,
    ) -> Self {
        Self {
            orchestrators,
            round: RoundSnapshot::default(),
            mode,
            settings,
        }
    }

    pub fn orchestrator(&self, address: Address) -> Option<&Orchestrator> {
        self.orchestrators.iter().find(|o| o.address() == address)
    }

    pub fn orchestrator_mut(&mut self, address: Address) -> Option<&mut Orchestrator> {
        self.orchestrators.iter_mut().find(|o| o.address() == address)
    }
}
