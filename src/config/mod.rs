//! # Siphon Configuration System
//!
//! Typed, validated configuration for the automation loop. Values arrive
//! through [`ConfigManager`] from a configuration file layered with
//! `SIPHON__*` environment overrides; everything downstream treats the
//! result as already-validated input.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use orchestrator_siphon::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load_from_file("config.toml")?;
//! let ttl = manager.config().timers.pending_stake_ttl();
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use crate::constants::DEFAULT_FEE_REMAINDER_ETH;
use crate::models::units::ether_to_wei;
use crate::orchestration::mode_switch::SignalName;
use crate::resilience::ScannerConfig;
use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SiphonConfig {
    /// One entry per managed orchestrator account
    #[serde(default)]
    pub orchestrators: Vec<OrchestratorConfig>,

    #[serde(default)]
    pub features: FeaturesConfig,

    #[serde(default)]
    pub thresholds: ThresholdsConfig,

    #[serde(default)]
    pub timers: TimersConfig,

    /// Ledger endpoint, passed through to the client untouched
    #[serde(default)]
    pub rpc: RpcConfig,

    #[serde(default)]
    pub signals: SignalsConfig,

    #[serde(default)]
    pub scanner: ScannerConfig,
}

/// Per-orchestrator identity and credential source
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OrchestratorConfig {
    /// Path to the encrypted keystore file
    pub keystore: PathBuf,

    /// Literal keystore password. Empty or absent means "prompt the operator".
    #[serde(default)]
    pub password: Option<String>,

    /// File holding the keystore password; cleared after use when `clear_password` is set
    #[serde(default)]
    pub password_file: Option<PathBuf>,

    pub source_address: String,
    pub receiver_address_eth: String,
    pub receiver_address_lpt: String,
}

impl OrchestratorConfig {
    pub fn source(&self) -> ConfigResult<Address> {
        parse_address("source_address", &self.source_address)
    }

    pub fn receiver_eth(&self) -> ConfigResult<Address> {
        parse_address("receiver_address_eth", &self.receiver_address_eth)
    }

    pub fn receiver_lpt(&self) -> ConfigResult<Address> {
        parse_address("receiver_address_lpt", &self.receiver_address_lpt)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct FeaturesConfig {
    /// Withdraw pending fees straight to the ETH receiver when the wallet holds its reserve
    pub withdraw_to_receiver: bool,
    /// Truncate password files once the keystore has been decrypted
    pub clear_password: bool,
    /// Keep the operator in interactive mode; automation cannot be resumed
    pub lock_interactive: bool,
}

/// Threshold and reserve values, in whole-token decimal units
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ThresholdsConfig {
    pub lpt_threshold: f64,
    pub lpt_minval: f64,
    pub eth_threshold: f64,
    pub eth_minval: f64,
    pub eth_warn: f64,
    pub fee_remainder: f64,
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        Self {
            lpt_threshold: 100.0,
            lpt_minval: 1.0,
            eth_threshold: 0.2,
            eth_minval: 0.05,
            eth_warn: 0.02,
            fee_remainder: DEFAULT_FEE_REMAINDER_ETH,
        }
    }
}

/// Threshold values converted to base units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub lpt_threshold: U256,
    pub lpt_minval: U256,
    pub eth_threshold: U256,
    pub eth_minval: U256,
    pub eth_warn: U256,
    pub fee_remainder: U256,
}

impl ThresholdsConfig {
    pub fn to_base_units(&self) -> ConfigResult<Thresholds> {
        let convert = |field: &str, value: f64| {
            ether_to_wei(value).map_err(|reason| {
                ConfigurationError::invalid_value(
                    format!("thresholds.{field}"),
                    value.to_string(),
                    reason,
                )
            })
        };

        Ok(Thresholds {
            lpt_threshold: convert("lpt_threshold", self.lpt_threshold)?,
            lpt_minval: convert("lpt_minval", self.lpt_minval)?,
            eth_threshold: convert("eth_threshold", self.eth_threshold)?,
            eth_minval: convert("eth_minval", self.eth_minval)?,
            eth_warn: convert("eth_warn", self.eth_warn)?,
            fee_remainder: convert("fee_remainder", self.fee_remainder)?,
        })
    }
}

/// Cache lifetimes and idle pacing, in seconds
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimersConfig {
    pub cache_round_refresh: f64,
    pub cache_pending_lpt: f64,
    pub cache_pending_eth: f64,
    /// Defaults to `cache_pending_eth`
    pub cache_wallet_balance: Option<f64>,
    /// Defaults to `cache_round_refresh`
    pub cache_reward_round: Option<f64>,
    pub wait_idle: f64,
    pub idle_slice: f64,
}

impl Default for TimersConfig {
    fn default() -> Self {
        Self {
            cache_round_refresh: 1800.0,
            cache_pending_lpt: 3600.0,
            cache_pending_eth: 3600.0,
            cache_wallet_balance: None,
            cache_reward_round: None,
            wait_idle: 60.0,
            idle_slice: 10.0,
        }
    }
}

/// Seconds as a duration, saturating where the value does not fit
fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(if value > 0.0 {
        Duration::MAX
    } else {
        Duration::ZERO
    })
}

fn representable(value: f64) -> bool {
    Duration::try_from_secs_f64(value).is_ok()
}

impl TimersConfig {
    pub fn round_ttl(&self) -> Duration {
        seconds(self.cache_round_refresh)
    }

    pub fn pending_stake_ttl(&self) -> Duration {
        seconds(self.cache_pending_lpt)
    }

    pub fn pending_fees_ttl(&self) -> Duration {
        seconds(self.cache_pending_eth)
    }

    pub fn wallet_balance_ttl(&self) -> Duration {
        seconds(self.cache_wallet_balance.unwrap_or(self.cache_pending_eth))
    }

    pub fn reward_round_ttl(&self) -> Duration {
        seconds(self.cache_reward_round.unwrap_or(self.cache_round_refresh))
    }

    pub fn idle_wait(&self) -> Duration {
        seconds(self.wait_idle)
    }

    pub fn idle_slice(&self) -> Duration {
        seconds(self.idle_slice)
    }

    fn ttl_fields(&self) -> [(&'static str, f64); 5] {
        [
            ("timers.cache_round_refresh", self.cache_round_refresh),
            ("timers.cache_pending_lpt", self.cache_pending_lpt),
            ("timers.cache_pending_eth", self.cache_pending_eth),
            (
                "timers.cache_wallet_balance",
                self.cache_wallet_balance.unwrap_or(self.cache_pending_eth),
            ),
            (
                "timers.cache_reward_round",
                self.cache_reward_round.unwrap_or(self.cache_round_refresh),
            ),
        ]
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RpcConfig {
    pub l2: Option<String>,
}

/// Process signals driving the mode switch
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SignalsConfig {
    pub pause: Vec<String>,
    pub terminate: String,
}

impl Default for SignalsConfig {
    fn default() -> Self {
        Self {
            pause: vec!["SIGQUIT".to_string(), "SIGTSTP".to_string()],
            terminate: "SIGINT".to_string(),
        }
    }
}

impl SignalsConfig {
    pub fn pause_signals(&self) -> ConfigResult<Vec<SignalName>> {
        self.pause
            .iter()
            .map(|name| parse_signal("signals.pause", name))
            .collect()
    }

    pub fn terminate_signal(&self) -> ConfigResult<SignalName> {
        parse_signal("signals.terminate", &self.terminate)
    }
}

impl SiphonConfig {
    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.orchestrators.is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "orchestrators",
                "at least one orchestrator must be configured",
            ));
        }

        for orchestrator in &self.orchestrators {
            orchestrator.source()?;
            orchestrator.receiver_eth()?;
            orchestrator.receiver_lpt()?;
            if orchestrator.keystore.as_os_str().is_empty() {
                return Err(ConfigurationError::missing_required_field(
                    "keystore",
                    format!("orchestrator {}", orchestrator.source_address),
                ));
            }
        }

        for (field, value) in self.timers.ttl_fields() {
            if !(representable(value) && value > 0.0) {
                return Err(ConfigurationError::invalid_value(
                    field,
                    value.to_string(),
                    "cache lifetime must be greater than 0",
                ));
            }
        }

        if !representable(self.timers.wait_idle) {
            return Err(ConfigurationError::invalid_value(
                "timers.wait_idle",
                self.timers.wait_idle.to_string(),
                "idle wait must be a non-negative number of seconds",
            ));
        }

        if !(representable(self.timers.idle_slice) && self.timers.idle_slice > 0.0) {
            return Err(ConfigurationError::invalid_value(
                "timers.idle_slice",
                self.timers.idle_slice.to_string(),
                "idle slice must be greater than 0",
            ));
        }

        self.thresholds.to_base_units()?;
        self.signals.pause_signals()?;
        self.signals.terminate_signal()?;
        self.scanner
            .validate()
            .map_err(|reason| ConfigurationError::invalid_value("scanner", "", reason))?;

        Ok(())
    }
}

fn parse_address(field: &str, raw: &str) -> ConfigResult<Address> {
    Address::from_str(raw.trim())
        .map_err(|e| ConfigurationError::invalid_value(field, raw, e.to_string()))
}

fn parse_signal(field: &str, raw: &str) -> ConfigResult<SignalName> {
    SignalName::from_str(raw).map_err(|reason| ConfigurationError::invalid_value(field, raw, reason))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orchestrator_config() -> OrchestratorConfig {
        OrchestratorConfig {
            keystore: PathBuf::from("/keys/orch.json"),
            password: None,
            password_file: None,
            source_address: "0x1111111111111111111111111111111111111111".to_string(),
            receiver_address_eth: "0x2222222222222222222222222222222222222222".to_string(),
            receiver_address_lpt: "0x3333333333333333333333333333333333333333".to_string(),
        }
    }

    fn valid_config() -> SiphonConfig {
        SiphonConfig {
            orchestrators: vec![orchestrator_config()],
            ..SiphonConfig::default()
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_requires_orchestrators() {
        let config = SiphonConfig::default();
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::MissingRequiredField { .. })
        ));
    }

    #[test]
    fn test_rejects_zero_ttl() {
        let mut config = valid_config();
        config.timers.cache_pending_lpt = 0.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("timers.cache_pending_lpt"));
    }

    #[test]
    fn test_rejects_timers_beyond_duration_range() {
        let mut config = valid_config();
        config.timers.cache_pending_lpt = 1e20;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("timers.cache_pending_lpt"));

        let mut config = valid_config();
        config.timers.wait_idle = 1e20;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("timers.wait_idle"));

        let mut config = valid_config();
        config.timers.idle_slice = f64::INFINITY;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_oversized_timer_saturates_instead_of_panicking() {
        let timers = TimersConfig {
            cache_pending_lpt: 1e20,
            wait_idle: -1.0,
            ..TimersConfig::default()
        };
        assert_eq!(timers.pending_stake_ttl(), Duration::MAX);
        assert_eq!(timers.idle_wait(), Duration::ZERO);
    }

    #[test]
    fn test_rejects_bad_address() {
        let mut config = valid_config();
        config.orchestrators[0].receiver_address_eth = "not-an-address".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("receiver_address_eth"));
    }

    #[test]
    fn test_rejects_unknown_signal() {
        let mut config = valid_config();
        config.signals.pause = vec!["SIGBOGUS".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_optional_ttls_fall_back() {
        let timers = TimersConfig {
            cache_round_refresh: 30.0,
            cache_pending_eth: 90.0,
            ..TimersConfig::default()
        };
        assert_eq!(timers.wallet_balance_ttl(), Duration::from_secs(90));
        assert_eq!(timers.reward_round_ttl(), Duration::from_secs(30));
    }

    #[test]
    fn test_thresholds_convert_to_wei() {
        let thresholds = ThresholdsConfig {
            eth_threshold: 0.02,
            ..ThresholdsConfig::default()
        }
        .to_base_units()
        .unwrap();
        assert_eq!(thresholds.eth_threshold, U256::from(20_000_000_000_000_000u128));
        assert_eq!(thresholds.fee_remainder, U256::from(10_000_000_000_000u128));
    }
}
