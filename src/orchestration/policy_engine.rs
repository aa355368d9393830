//! # Policy Engine
//!
//! One automation tick: refresh the shared round snapshot, then walk every
//! orchestrator through the remaining rules in fixed order.
//!
//! 1. Round refresh (once per tick, before the per-orchestrator loop)
//! 2. Stake sweep, only while the round is locked
//! 3. Fee withdrawal, to the orchestrator itself or straight to its receiver
//! 4. Balance sweep down to the minimum operating reserve
//! 5. Reward call, once per round
//!
//! Rules 2 to 5 are not mutually exclusive. Each reads through the refresh
//! scheduler, so each is gated by its own TTL. A failed action is not retried
//! within the tick and its post-action refresh is skipped; the next tick
//! re-evaluates from whatever is cached.
//!
//! The threshold comparisons are exposed as pure `decide_*` functions.

use alloy_primitives::{Address, U256};
use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::config::Thresholds;
use crate::models::units::display_ether;
use crate::models::Metric;
use crate::orchestration::action_executor::{Action, ActionExecutor};
use crate::orchestration::context::SiphonContext;
use crate::orchestration::refresh_scheduler::RefreshScheduler;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StakeDecision {
    Transfer { amount: U256 },
    BelowThreshold,
    /// The amount to leave behind exceeds the pending stake
    ReserveExceedsStake,
    /// Waiting for the round to lock
    AwaitingLock,
}

/// Fires iff `pending_stake >= lpt_threshold`, `pending_stake >= lpt_minval`
/// and the round is locked.
pub fn decide_stake_sweep(pending_stake: U256, thresholds: &Thresholds, locked: bool) -> StakeDecision {
    if pending_stake < thresholds.lpt_threshold {
        StakeDecision::BelowThreshold
    } else if pending_stake < thresholds.lpt_minval {
        StakeDecision::ReserveExceedsStake
    } else if !locked {
        StakeDecision::AwaitingLock
    } else {
        StakeDecision::Transfer {
            amount: pending_stake - thresholds.lpt_minval,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FeeRecipient {
    /// The orchestrator's own wallet
    Own,
    /// The configured ETH receiver
    Receiver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeDecision {
    Withdraw { recipient: FeeRecipient, amount: U256 },
    BelowThreshold,
}

/// Withdraw `pending_fees - fee_remainder` once `pending_fees >= eth_threshold`.
///
/// Fees go to the orchestrator's own wallet unless withdraw-to-receiver is
/// enabled and the wallet already holds its minimum operating balance.
pub fn decide_fee_withdrawal(
    pending_fees: U256,
    wallet_balance: U256,
    thresholds: &Thresholds,
    withdraw_to_receiver: bool,
) -> FeeDecision {
    if pending_fees < thresholds.eth_threshold {
        return FeeDecision::BelowThreshold;
    }

    let amount = pending_fees.saturating_sub(thresholds.fee_remainder);
    if amount.is_zero() {
        return FeeDecision::BelowThreshold;
    }

    let recipient = if !withdraw_to_receiver || wallet_balance < thresholds.eth_minval {
        FeeRecipient::Own
    } else {
        FeeRecipient::Receiver
    };

    FeeDecision::Withdraw { recipient, amount }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceDecision {
    Sweep { amount: U256 },
    BelowThreshold,
    /// The minimum reserve is not below the balance
    ReserveExceedsBalance,
}

pub fn decide_balance_sweep(wallet_balance: U256, thresholds: &Thresholds) -> BalanceDecision {
    if wallet_balance < thresholds.eth_threshold {
        BalanceDecision::BelowThreshold
    } else if wallet_balance <= thresholds.eth_minval {
        BalanceDecision::ReserveExceedsBalance
    } else {
        BalanceDecision::Sweep {
            amount: wallet_balance - thresholds.eth_minval,
        }
    }
}

/// Reward has not yet been called in `round_number`
pub fn reward_due(last_reward_round: u64, round_number: u64) -> bool {
    last_reward_round < round_number
}

/// One action fired during a tick
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionOutcome {
    pub orchestrator: Address,
    pub action: Action,
    pub succeeded: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    pub tick_id: Uuid,
    pub round_number: u64,
    pub round_locked: bool,
    pub actions: Vec<ActionOutcome>,
}

impl TickReport {
    pub fn fired(&self, name: &str) -> usize {
        self.actions.iter().filter(|a| a.action.name() == name).count()
    }
}

#[derive(Debug, Clone)]
pub struct PolicyEngine {
    scheduler: RefreshScheduler,
    executor: ActionExecutor,
}

impl PolicyEngine {
    pub fn new(scheduler: RefreshScheduler, executor: ActionExecutor) -> Self {
        Self {
            scheduler,
            executor,
        }
    }

    pub fn scheduler(&self) -> &RefreshScheduler {
        &self.scheduler
    }

    pub fn executor(&self) -> &ActionExecutor {
        &self.executor
    }

    #[instrument(skip_all, fields(tick_id = tracing::field::Empty))]
    pub async fn tick(&self, ctx: &mut SiphonContext) -> TickReport {
        let tick_id = Uuid::new_v4();
        tracing::Span::current().record("tick_id", tracing::field::display(tick_id));

        self.scheduler.refresh_round(&mut ctx.round).await;

        let mut report = TickReport {
            tick_id,
            round_number: ctx.round.round_number(),
            round_locked: ctx.round.is_locked(),
            actions: Vec::new(),
        };

        for idx in 0..ctx.orchestrators.len() {
            info!(
                orchestrator = %ctx.orchestrators[idx].label(),
                "Refreshing Orchestrator"
            );
            self.sweep_stake(ctx, idx, &mut report).await;
            self.withdraw_fees(ctx, idx, &mut report).await;
            self.sweep_balance(ctx, idx, &mut report).await;
            self.call_reward(ctx, idx, &mut report).await;
        }

        report
    }

    async fn sweep_stake(&self, ctx: &mut SiphonContext, idx: usize, report: &mut TickReport) {
        let locked = ctx.round.is_locked();
        let thresholds = ctx.settings.thresholds;
        let orchestrator = &mut ctx.orchestrators[idx];
        let label = orchestrator.label();

        let pending = self
            .scheduler
            .get_or_refresh(orchestrator, Metric::PendingStake)
            .await
            .amount();

        match decide_stake_sweep(pending, &thresholds, locked) {
            StakeDecision::BelowThreshold => info!(
                orchestrator = %label,
                "{} has {} LPT in pending stake < threshold of {} LPT",
                label,
                display_ether(pending, 2),
                display_ether(thresholds.lpt_threshold, 2)
            ),
            StakeDecision::ReserveExceedsStake => info!(
                orchestrator = %label,
                "Cannot transfer LPT, as the minimum value to leave behind is larger than the self-stake"
            ),
            StakeDecision::AwaitingLock => info!(
                orchestrator = %label,
                "Waiting for round to be locked before transferring bond"
            ),
            StakeDecision::Transfer { amount } => {
                let action = Action::TransferBond {
                    receiver: orchestrator.identity().receiver_lpt,
                    amount,
                };
                let succeeded = self.executor.execute(orchestrator, &action).await.is_ok();
                if succeeded {
                    self.scheduler
                        .force_refresh(orchestrator, Metric::PendingStake)
                        .await;
                }
                report.actions.push(ActionOutcome {
                    orchestrator: orchestrator.address(),
                    action,
                    succeeded,
                });
            }
        }
    }

    async fn withdraw_fees(&self, ctx: &mut SiphonContext, idx: usize, report: &mut TickReport) {
        let thresholds = ctx.settings.thresholds;
        let withdraw_to_receiver = ctx.settings.withdraw_to_receiver;
        let orchestrator = &mut ctx.orchestrators[idx];
        let label = orchestrator.label();

        let pending = self
            .scheduler
            .get_or_refresh(orchestrator, Metric::PendingFees)
            .await
            .amount();
        let balance = self
            .scheduler
            .get_or_refresh(orchestrator, Metric::WalletBalance)
            .await
            .amount();

        match decide_fee_withdrawal(pending, balance, &thresholds, withdraw_to_receiver) {
            FeeDecision::BelowThreshold => info!(
                orchestrator = %label,
                "{} has {} ETH in pending fees < threshold of {} ETH",
                label,
                display_ether(pending, 4),
                display_ether(thresholds.eth_threshold, 4)
            ),
            FeeDecision::Withdraw { recipient, amount } => {
                let recipient = match recipient {
                    FeeRecipient::Own => {
                        if withdraw_to_receiver {
                            info!(
                                orchestrator = %label,
                                "{} has a balance of {} ETH. Withdrawing fees to the Orch wallet to maintain the minimum balance of {}",
                                label,
                                display_ether(balance, 4),
                                display_ether(thresholds.eth_minval, 4)
                            );
                        }
                        orchestrator.address()
                    }
                    FeeRecipient::Receiver => orchestrator.identity().receiver_eth,
                };
                let action = Action::WithdrawFees { recipient, amount };
                let succeeded = self.executor.execute(orchestrator, &action).await.is_ok();
                if succeeded {
                    self.scheduler
                        .force_refresh(orchestrator, Metric::PendingFees)
                        .await;
                    self.scheduler
                        .force_refresh(orchestrator, Metric::WalletBalance)
                        .await;
                }
                report.actions.push(ActionOutcome {
                    orchestrator: orchestrator.address(),
                    action,
                    succeeded,
                });
            }
        }
    }

    async fn sweep_balance(&self, ctx: &mut SiphonContext, idx: usize, report: &mut TickReport) {
        let thresholds = ctx.settings.thresholds;
        let orchestrator = &mut ctx.orchestrators[idx];
        let label = orchestrator.label();

        let balance = self
            .scheduler
            .get_or_refresh(orchestrator, Metric::WalletBalance)
            .await
            .amount();

        match decide_balance_sweep(balance, &thresholds) {
            BalanceDecision::BelowThreshold => info!(
                orchestrator = %label,
                "{} has {} ETH in their wallet < threshold of {} ETH",
                label,
                display_ether(balance, 4),
                display_ether(thresholds.eth_threshold, 4)
            ),
            BalanceDecision::ReserveExceedsBalance => info!(
                orchestrator = %label,
                "Cannot transfer ETH, as the minimum value to leave behind is larger than the balance"
            ),
            BalanceDecision::Sweep { amount } => {
                let action = Action::SendValue {
                    to: orchestrator.identity().receiver_eth,
                    amount,
                };
                let succeeded = self.executor.execute(orchestrator, &action).await.is_ok();
                if succeeded {
                    self.scheduler
                        .force_refresh(orchestrator, Metric::WalletBalance)
                        .await;
                }
                report.actions.push(ActionOutcome {
                    orchestrator: orchestrator.address(),
                    action,
                    succeeded,
                });
            }
        }
    }

    async fn call_reward(&self, ctx: &mut SiphonContext, idx: usize, report: &mut TickReport) {
        let round_number = ctx.round.round_number();
        let orchestrator = &mut ctx.orchestrators[idx];
        let label = orchestrator.label();

        if !reward_due(orchestrator.last_reward_round(), round_number) {
            info!(
                orchestrator = %label,
                "Done for '{}' as they have already called reward this round", label
            );
            return;
        }

        let last = self
            .scheduler
            .get_or_refresh(orchestrator, Metric::LastRewardRound)
            .await
            .round();
        if !reward_due(last, round_number) {
            info!(
                orchestrator = %label,
                "{} has already called reward in round {}", label, round_number
            );
            return;
        }

        let action = Action::Reward;
        let succeeded = self.executor.execute(orchestrator, &action).await.is_ok();
        if succeeded {
            self.scheduler
                .force_refresh(orchestrator, Metric::LastRewardRound)
                .await;
            self.scheduler
                .force_refresh(orchestrator, Metric::PendingStake)
                .await;
        }
        report.actions.push(ActionOutcome {
            orchestrator: orchestrator.address(),
            action,
            succeeded,
        });
    }
}
