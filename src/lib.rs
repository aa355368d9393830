#![allow(clippy::doc_markdown)] // Allow technical terms like BondingManager, LPT in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Orchestrator Siphon
//!
//! Custodial upkeep automation for Livepeer orchestrator accounts on
//! Arbitrum One.
//!
//! ## Overview
//!
//! For every managed orchestrator the loop periodically reads pending stake,
//! pending fees, wallet balance and the last reward round, compares them
//! against configured thresholds, and fires signed transactions: sweep
//! stake to the LPT receiver, withdraw fees, sweep surplus ETH to the ETH
//! receiver, and call `reward()` once per round. An operator can pause the
//! loop with a process signal to vote on treasury proposals or change
//! commission rates.
//!
//! ## Module Organization
//!
//! - [`config`] - Validated configuration with environment overrides
//! - [`ledger`] - Ledger client contract and contract call builders
//! - [`models`] - Orchestrators, cached metrics, round snapshot
//! - [`orchestration`] - Refresh scheduler, policy engine, executor, loop
//! - [`resilience`] - Adaptive range scanner for event-log history
//! - [`governance`] - Treasury proposal discovery and vote reads
//! - [`operator`] - Console contract and interactive menus
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use orchestrator_siphon::config::ConfigManager;
//! use orchestrator_siphon::governance::Governance;
//! use orchestrator_siphon::ledger::{ContractSet, LedgerClient};
//! use orchestrator_siphon::operator::{InteractiveSession, StdioConsole};
//! use orchestrator_siphon::orchestration::{
//!     build_orchestrators, ActionExecutor, KeystoreDecryptor, ModeController, SiphonContext,
//!     SiphonCore, SiphonSettings,
//! };
//!
//! # async fn example(
//! #     client: Arc<dyn LedgerClient>,
//! #     decryptor: &dyn KeystoreDecryptor,
//! # ) -> Result<(), Box<dyn std::error::Error>> {
//! orchestrator_siphon::logging::init_structured_logging();
//!
//! let manager = ConfigManager::load_from_file("config.toml")?;
//! let config = manager.config();
//! let orchestrators = build_orchestrators(config, decryptor)?;
//!
//! let mode = ModeController::new(config.features.lock_interactive);
//! let _listeners = mode.install_signal_handlers(
//!     &config.signals.pause_signals()?,
//!     config.signals.terminate_signal()?,
//! )?;
//! let ctx = SiphonContext::new(orchestrators, mode, SiphonSettings::from_config(config)?);
//!
//! let contracts = ContractSet::default();
//! let session = InteractiveSession::new(
//!     StdioConsole::stdio(),
//!     Governance::new(client.clone(), contracts, config.scanner.clone()),
//!     ActionExecutor::new(client.clone(), contracts),
//! );
//! let exit = SiphonCore::from_client(ctx, client, contracts, session).run().await?;
//! std::process::exit(exit.exit_code());
//! # }
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # Unit and integration tests
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod governance;
pub mod ledger;
pub mod logging;
pub mod models;
pub mod operator;
pub mod orchestration;
pub mod resilience;

pub use config::{ConfigManager, SiphonConfig, Thresholds};
pub use error::{Result, SiphonError};
pub use ledger::{LedgerClient, LedgerError, LedgerErrorKind};
pub use models::{Metric, MetricValue, Orchestrator, RoundSnapshot};
pub use orchestration::{
    Action, ActionExecutor, ModeController, PolicyEngine, RefreshScheduler, SiphonContext,
    SiphonCore, SiphonExit,
};
pub use resilience::{RangeScanner, ScannerConfig};
