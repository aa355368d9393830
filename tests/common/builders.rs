//! Test fixtures: orchestrators, thresholds and wired-up engines over a
//! [`MockLedger`].

#![allow(dead_code)]

use alloy_primitives::{Address, U256};
use std::sync::Arc;
use std::time::Duration;

use orchestrator_siphon::config::Thresholds;
use orchestrator_siphon::ledger::ContractSet;
use orchestrator_siphon::models::units::ether_to_wei;
use orchestrator_siphon::models::{Credential, Orchestrator, OrchestratorIdentity, SigningKey};
use orchestrator_siphon::orchestration::{
    ActionExecutor, MetricTtls, ModeController, PolicyEngine, RefreshScheduler, SiphonContext,
    SiphonSettings,
};

use super::MockLedger;

pub fn eth(value: f64) -> U256 {
    ether_to_wei(value).unwrap()
}

pub fn source(n: u8) -> Address {
    Address::repeat_byte(n)
}

pub fn receiver_eth(n: u8) -> Address {
    Address::repeat_byte(n.wrapping_add(0x40))
}

pub fn receiver_lpt(n: u8) -> Address {
    Address::repeat_byte(n.wrapping_add(0x80))
}

/// Orchestrator `n` with a resolved signing key
pub fn orchestrator(n: u8) -> Orchestrator {
    Orchestrator::new(
        OrchestratorIdentity {
            source: source(n),
            receiver_eth: receiver_eth(n),
            receiver_lpt: receiver_lpt(n),
            keystore: format!("/keys/orch-{n}.json").into(),
        },
        Credential::Resolved(SigningKey::new(vec![n; 32])),
    )
}

pub fn thresholds() -> Thresholds {
    Thresholds {
        lpt_threshold: eth(100.0),
        lpt_minval: eth(1.0),
        eth_threshold: eth(0.02),
        eth_minval: eth(0.05),
        eth_warn: eth(0.01),
        fee_remainder: eth(0.00001),
    }
}

pub struct SettingsBuilder {
    settings: SiphonSettings,
}

impl SettingsBuilder {
    pub fn new() -> Self {
        Self {
            settings: SiphonSettings {
                thresholds: thresholds(),
                ttls: MetricTtls::uniform(Duration::from_secs(3600)),
                withdraw_to_receiver: false,
                idle_wait: Duration::from_secs(60),
                idle_slice: Duration::from_secs(10),
            },
        }
    }

    pub fn thresholds(mut self, thresholds: Thresholds) -> Self {
        self.settings.thresholds = thresholds;
        self
    }

    pub fn ttls(mut self, ttls: MetricTtls) -> Self {
        self.settings.ttls = ttls;
        self
    }

    pub fn withdraw_to_receiver(mut self, enabled: bool) -> Self {
        self.settings.withdraw_to_receiver = enabled;
        self
    }

    pub fn idle(mut self, wait: Duration, slice: Duration) -> Self {
        self.settings.idle_wait = wait;
        self.settings.idle_slice = slice;
        self
    }

    pub fn build(self) -> SiphonSettings {
        self.settings
    }
}

pub fn context(orchestrators: Vec<Orchestrator>, settings: SiphonSettings) -> SiphonContext {
    SiphonContext::new(orchestrators, ModeController::new(false), settings)
}

pub fn scheduler(ledger: &Arc<MockLedger>, settings: &SiphonSettings) -> RefreshScheduler {
    RefreshScheduler::new(
        ledger.clone(),
        ContractSet::default(),
        settings.ttls,
        settings.thresholds.eth_warn,
    )
}

pub fn executor(ledger: &Arc<MockLedger>) -> ActionExecutor {
    ActionExecutor::new(ledger.clone(), ContractSet::default())
}

pub fn engine(ledger: &Arc<MockLedger>, settings: &SiphonSettings) -> PolicyEngine {
    PolicyEngine::new(scheduler(ledger, settings), executor(ledger))
}
