//! # Orchestration Engine
//!
//! Scheduling and decision logic for the managed orchestrators.
//!
//! ## Architecture
//!
//! One logical thread of control drives the loop; orchestrators and rules
//! are processed sequentially and every blocking call is a ledger round trip.
//! The only asynchronous interruption is the mode flag, written from signal
//! listeners and polled by the loop.
//!
//! ## Core Components
//!
//! - **RefreshScheduler**: per-orchestrator, per-metric TTL cache in front of
//!   the ledger reads, plus the shared round snapshot
//! - **PolicyEngine**: the per-tick rule set (stake sweep, fee withdrawal,
//!   balance sweep, reward call)
//! - **ActionExecutor**: nonce, build, sign, submit and confirm for every
//!   mutating call
//! - **ModeController**: `Automated` / `Interactive` flag, signal handling and
//!   interruptible idle waits
//! - **SiphonCore**: the loop tying them together
//! - **Bootstrap**: orchestrator construction and credential resolution

pub mod action_executor;
pub mod bootstrap;
pub mod context;
pub mod core;
pub mod mode_switch;
pub mod policy_engine;
pub mod refresh_scheduler;

pub use action_executor::{Action, ActionExecutor};
pub use bootstrap::{
    build_orchestrators, resolve_credentials, KeystoreDecryptor, KeystoreError, PasswordSource,
};
pub use context::{MetricTtls, SiphonContext, SiphonSettings};
pub use self::core::{InteractiveCollaborator, SiphonCore, SiphonExit, StepOutcome};
pub use mode_switch::{IdleOutcome, Mode, ModeController, SignalListeners, SignalName};
pub use policy_engine::{
    decide_balance_sweep, decide_fee_withdrawal, decide_stake_sweep, reward_due, ActionOutcome,
    BalanceDecision, FeeDecision, FeeRecipient, PolicyEngine, StakeDecision, TickReport,
};
pub use refresh_scheduler::RefreshScheduler;
