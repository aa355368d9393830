//! Configuration Loader
//!
//! Layered configuration loading: built-in defaults, then the configuration
//! file, then `SIPHON__SECTION__KEY` environment overrides. The legacy flat
//! keystore variables (`SIPHON_KEYSTORES`, `SIPHON_PASSWORDS`,
//! `SIPHON_SOURCES`, `SIPHON_TARGETS_ETH`, `SIPHON_TARGETS_LPT`) replace the
//! file's orchestrator list when `SIPHON_KEYSTORES` is present. The other
//! flat variables (`SIPHON_LPT_THRESHOLD`, `SIPHON_CACHE_ROUNDS`,
//! `SIPHON_RPC_L2`, ...) override single settings and win over both the file
//! and the nested form.

use super::error::{ConfigResult, ConfigurationError};
use super::{OrchestratorConfig, SiphonConfig};
use ::config::{Config, Environment, File, FileFormat};
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// Loaded, validated configuration
#[derive(Debug)]
pub struct ConfigManager {
    config: SiphonConfig,
    config_path: PathBuf,
}

impl ConfigManager {
    /// Load configuration from a file, layered with the process environment
    pub fn load_from_file(path: impl AsRef<Path>) -> ConfigResult<Arc<ConfigManager>> {
        let environment: HashMap<String, String> = env::vars().collect();
        Self::load_with_environment(path, &environment)
    }

    /// Load configuration with an explicit environment map.
    /// Useful for testing without modifying global environment variables.
    pub fn load_with_environment(
        path: impl AsRef<Path>,
        environment: &HashMap<String, String>,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let path = path.as_ref();
        debug!("Loading configuration from: {}", path.display());

        let content = Self::read_config_file_safely(path)?;
        let format = Self::detect_format(path);

        let overrides: ::config::Map<String, String> = environment
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let layered = Config::builder()
            .add_source(File::from_str(&content, format))
            .add_source(
                Environment::with_prefix("SIPHON")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .source(Some(overrides)),
            )
            .build()?;

        let mut config: SiphonConfig = layered.try_deserialize()?;

        if let Some(orchestrators) = Self::legacy_keystores(environment)? {
            debug!(
                count = orchestrators.len(),
                "Using keystore definitions from SIPHON_KEYSTORES"
            );
            config.orchestrators = orchestrators;
        }

        Self::apply_legacy_settings(&mut config, environment)?;

        config.validate()?;

        let manager = ConfigManager {
            config,
            config_path: path.to_path_buf(),
        };

        debug!(
            "Configuration loaded successfully: {}",
            serde_json::to_string_pretty(&manager.debug_config())
                .unwrap_or_else(|_| "[serialization error]".to_string())
        );
        info!(
            path = %path.display(),
            orchestrators = manager.config.orchestrators.len(),
            withdraw_to_receiver = manager.config.features.withdraw_to_receiver,
            "Configuration loaded"
        );

        Ok(Arc::new(manager))
    }

    /// Wrap an already-built configuration, validating it first
    pub fn from_config(config: SiphonConfig) -> ConfigResult<Arc<ConfigManager>> {
        config.validate()?;
        Ok(Arc::new(ConfigManager {
            config,
            config_path: PathBuf::new(),
        }))
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &SiphonConfig {
        &self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Configuration as JSON with sensitive fields masked
    pub fn debug_config(&self) -> serde_json::Value {
        let mut config_json = serde_json::json!(self.config);
        let sensitive_patterns = ["password", "secret", "key", "token", "credential"];
        Self::sanitize_json_recursive(&mut config_json, &sensitive_patterns);
        config_json
    }

    fn read_config_file_safely(path: &Path) -> ConfigResult<String> {
        let metadata = std::fs::metadata(path)
            .map_err(|e| ConfigurationError::file_read_error(path.display().to_string(), e))?;

        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigurationError::invalid_value(
                "file_size",
                metadata.len().to_string(),
                format!(
                    "Configuration file too large ({} bytes > {} bytes limit)",
                    metadata.len(),
                    MAX_CONFIG_FILE_SIZE
                ),
            ));
        }

        if !metadata.is_file() {
            return Err(ConfigurationError::invalid_value(
                "file_type",
                "directory or special file",
                "Configuration path must point to a regular file",
            ));
        }

        std::fs::read_to_string(path)
            .map_err(|e| ConfigurationError::file_read_error(path.display().to_string(), e))
    }

    fn detect_format(path: &Path) -> FileFormat {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
            .as_deref()
        {
            Some("ini") => FileFormat::Ini,
            Some("json") => FileFormat::Json,
            Some("yaml") | Some("yml") => FileFormat::Yaml,
            _ => FileFormat::Toml,
        }
    }

    /// Parse the flat comma-separated keystore variables, zipped by position
    fn legacy_keystores(
        environment: &HashMap<String, String>,
    ) -> ConfigResult<Option<Vec<OrchestratorConfig>>> {
        let keystores = match environment.get("SIPHON_KEYSTORES") {
            Some(value) if !value.trim().is_empty() => split_list(value),
            _ => return Ok(None),
        };

        let list = |name: &str| -> Vec<String> {
            environment
                .get(name)
                .map(|value| split_list(value))
                .unwrap_or_default()
        };
        let passwords = list("SIPHON_PASSWORDS");
        let sources = list("SIPHON_SOURCES");
        let targets_eth = list("SIPHON_TARGETS_ETH");
        let targets_lpt = list("SIPHON_TARGETS_LPT");

        for (name, values) in [
            ("SIPHON_SOURCES", &sources),
            ("SIPHON_TARGETS_ETH", &targets_eth),
            ("SIPHON_TARGETS_LPT", &targets_lpt),
        ] {
            if values.len() != keystores.len() {
                return Err(ConfigurationError::invalid_value(
                    name,
                    values.len().to_string(),
                    format!("expected {} entries to match SIPHON_KEYSTORES", keystores.len()),
                ));
            }
        }

        let orchestrators = keystores
            .into_iter()
            .enumerate()
            .map(|(idx, keystore)| OrchestratorConfig {
                keystore: PathBuf::from(keystore),
                password: passwords.get(idx).filter(|p| !p.is_empty()).cloned(),
                password_file: None,
                source_address: sources[idx].clone(),
                receiver_address_eth: targets_eth[idx].clone(),
                receiver_address_lpt: targets_lpt[idx].clone(),
            })
            .collect();

        Ok(Some(orchestrators))
    }

    /// Apply the flat single-setting variables on top of the layered config
    fn apply_legacy_settings(
        config: &mut SiphonConfig,
        environment: &HashMap<String, String>,
    ) -> ConfigResult<()> {
        let get = |name: &str| {
            environment
                .get(name)
                .map(|value| value.trim())
                .filter(|value| !value.is_empty())
        };

        let thresholds = &mut config.thresholds;
        let timers = &mut config.timers;
        let numbers: [(&str, &mut f64); 9] = [
            ("SIPHON_LPT_THRESHOLD", &mut thresholds.lpt_threshold),
            ("SIPHON_LPT_MINVAL", &mut thresholds.lpt_minval),
            ("SIPHON_ETH_THRESHOLD", &mut thresholds.eth_threshold),
            ("SIPHON_ETH_MINVAL", &mut thresholds.eth_minval),
            ("SIPHON_ETH_WARN", &mut thresholds.eth_warn),
            ("SIPHON_CACHE_ROUNDS", &mut timers.cache_round_refresh),
            ("SIPHON_CACHE_LPT", &mut timers.cache_pending_lpt),
            ("SIPHON_CACHE_ETH", &mut timers.cache_pending_eth),
            ("SIPHON_WAIT_IDLE", &mut timers.wait_idle),
        ];
        for (name, field) in numbers {
            if let Some(value) = get(name) {
                *field = parse_number(name, value)?;
            }
        }
        let features = &mut config.features;
        let flags: [(&str, &mut bool); 2] = [
            ("SIPHON_WITHDRAW_TO_RECEIVER", &mut features.withdraw_to_receiver),
            ("SIPHON_CLEAR_PASSWORD", &mut features.clear_password),
        ];
        for (name, field) in flags {
            if let Some(value) = get(name) {
                *field = parse_flag(name, value)?;
            }
        }

        if let Some(url) = get("SIPHON_RPC_L2") {
            config.rpc.l2 = Some(url.to_string());
        }

        Ok(())
    }

    /// Recursively sanitize sensitive fields in JSON configuration
    fn sanitize_json_recursive(value: &mut serde_json::Value, sensitive_patterns: &[&str]) {
        match value {
            serde_json::Value::Object(map) => {
                for (key, val) in map.iter_mut() {
                    let key_lower = key.to_lowercase();
                    let is_sensitive = sensitive_patterns
                        .iter()
                        .any(|pattern| key_lower.contains(pattern));

                    if is_sensitive && !val.is_null() {
                        *val = match val {
                            serde_json::Value::String(s) if s.is_empty() => {
                                serde_json::Value::String("[EMPTY]".to_string())
                            }
                            _ => serde_json::Value::String("[MASKED]".to_string()),
                        };
                    } else {
                        Self::sanitize_json_recursive(val, sensitive_patterns);
                    }
                }
            }
            serde_json::Value::Array(arr) => {
                for item in arr.iter_mut() {
                    Self::sanitize_json_recursive(item, sensitive_patterns);
                }
            }
            _ => {}
        }
    }
}

fn split_list(value: &str) -> Vec<String> {
    value.split(',').map(|item| item.trim().to_string()).collect()
}

fn parse_number(name: &str, value: &str) -> ConfigResult<f64> {
    value
        .parse::<f64>()
        .map_err(|_| ConfigurationError::invalid_value(name, value, "expected a number"))
}

fn parse_flag(name: &str, value: &str) -> ConfigResult<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigurationError::invalid_value(
            name,
            value,
            "expected true or false",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_list_trims() {
        assert_eq!(split_list("a, b ,c"), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_sanitize_masks_passwords_and_keystores() {
        let mut value = serde_json::json!({
            "orchestrators": [{
                "keystore": "/keys/a.json",
                "password": "hunter2",
                "password_file": null,
                "source_address": "0x1111111111111111111111111111111111111111"
            }]
        });
        ConfigManager::sanitize_json_recursive(&mut value, &["password", "key"]);
        let entry = &value["orchestrators"][0];
        assert_eq!(entry["password"], "[MASKED]");
        assert_eq!(entry["keystore"], "[MASKED]");
        assert!(entry["password_file"].is_null());
        assert_eq!(
            entry["source_address"],
            "0x1111111111111111111111111111111111111111"
        );
    }

    #[test]
    fn test_legacy_keystores_require_matching_lengths() {
        let environment = HashMap::from([
            ("SIPHON_KEYSTORES".to_string(), "/a.json,/b.json".to_string()),
            (
                "SIPHON_SOURCES".to_string(),
                "0x1111111111111111111111111111111111111111".to_string(),
            ),
        ]);
        assert!(ConfigManager::legacy_keystores(&environment).is_err());
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("SIPHON_CLEAR_PASSWORD", "True").unwrap());
        assert!(!parse_flag("SIPHON_CLEAR_PASSWORD", "0").unwrap());
        assert!(parse_flag("SIPHON_CLEAR_PASSWORD", "maybe").is_err());
    }

    #[test]
    fn test_blank_legacy_setting_is_ignored() {
        let mut config = SiphonConfig::default();
        let environment = HashMap::from([("SIPHON_LPT_THRESHOLD".to_string(), "  ".to_string())]);
        ConfigManager::apply_legacy_settings(&mut config, &environment).unwrap();
        assert_eq!(config.thresholds.lpt_threshold, 100.0);
    }

    #[test]
    fn test_legacy_keystores_absent() {
        let environment = HashMap::new();
        assert!(ConfigManager::legacy_keystores(&environment)
            .unwrap()
            .is_none());
    }
}
