//! # Orchestrator Bootstrap
//!
//! Builds the managed orchestrators from validated configuration and
//! resolves their signing credentials before the automation loop starts.
//!
//! - A configured password (literal or file) is decrypted immediately; a
//!   failure is fatal.
//! - With `clear_password`, a password file is truncated once its keystore
//!   has been decrypted.
//! - Orchestrators without a password stay `Unresolved` until
//!   [`resolve_credentials`] prompts the operator, repeating until the
//!   keystore decrypts.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info, warn};
use zeroize::Zeroizing;

use crate::config::{OrchestratorConfig, SiphonConfig};
use crate::error::{Result, SiphonError};
use crate::models::{Credential, Orchestrator, OrchestratorIdentity, SigningKey};
use crate::operator::OperatorConsole;

#[derive(Debug, Error)]
pub enum KeystoreError {
    #[error("Unable to read keystore {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Wrong password for keystore")]
    InvalidPassword,

    #[error("Malformed keystore: {0}")]
    Malformed(String),
}

/// Turns an encrypted keystore plus password into a signing key
pub trait KeystoreDecryptor: Send + Sync {
    fn decrypt(&self, keystore: &Path, password: &str) -> std::result::Result<SigningKey, KeystoreError>;
}

/// Where an orchestrator's keystore password comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasswordSource {
    Literal,
    File(PathBuf),
    Prompt,
}

fn password_for(config: &OrchestratorConfig) -> Result<(PasswordSource, Option<Zeroizing<String>>)> {
    if let Some(password) = config.password.as_deref().filter(|p| !p.is_empty()) {
        return Ok((
            PasswordSource::Literal,
            Some(Zeroizing::new(password.to_string())),
        ));
    }

    if let Some(path) = &config.password_file {
        let content = Zeroizing::new(fs::read_to_string(path).map_err(|e| {
            SiphonError::Credential {
                orchestrator: config.source_address.clone(),
                message: format!("unable to read password file {}: {e}", path.display()),
            }
        })?);
        let password = content.trim_end_matches(['\r', '\n']);
        if !password.is_empty() {
            return Ok((
                PasswordSource::File(path.clone()),
                Some(Zeroizing::new(password.to_string())),
            ));
        }
    }

    Ok((PasswordSource::Prompt, None))
}

fn clear_password_file(path: &Path) {
    match fs::write(path, "") {
        Ok(()) => info!(path = %path.display(), "Cleared password file"),
        Err(e) => warn!(path = %path.display(), error = %e, "Unable to clear password file"),
    }
}

/// Construct every configured orchestrator, decrypting configured passwords
pub fn build_orchestrators(
    config: &SiphonConfig,
    decryptor: &dyn KeystoreDecryptor,
) -> Result<Vec<Orchestrator>> {
    let mut orchestrators = Vec::with_capacity(config.orchestrators.len());

    for entry in &config.orchestrators {
        let identity = OrchestratorIdentity {
            source: entry.source()?,
            receiver_eth: entry.receiver_eth()?,
            receiver_lpt: entry.receiver_lpt()?,
            keystore: entry.keystore.clone(),
        };
        let label = identity.source_checksum();
        info!(orchestrator = %label, "Adding Orchestrator");

        let credential = match password_for(entry)? {
            (source, Some(password)) => {
                let key = decryptor.decrypt(&identity.keystore, &password).map_err(|e| {
                    error!(orchestrator = %label, "Fatal error: Unable to decrypt keystore file");
                    SiphonError::Credential {
                        orchestrator: label.clone(),
                        message: e.to_string(),
                    }
                })?;
                if config.features.clear_password {
                    if let PasswordSource::File(path) = &source {
                        clear_password_file(path);
                    }
                }
                Credential::Resolved(key)
            }
            (_, None) => Credential::Unresolved,
        };

        orchestrators.push(Orchestrator::new(identity, credential));
    }

    Ok(orchestrators)
}

/// Prompt for every unresolved credential until its keystore decrypts
pub async fn resolve_credentials(
    orchestrators: &mut [Orchestrator],
    decryptor: &dyn KeystoreDecryptor,
    console: &mut dyn OperatorConsole,
) -> Result<()> {
    for orchestrator in orchestrators.iter_mut() {
        while !orchestrator.credential().is_resolved() {
            let label = orchestrator.label();
            let password = console
                .prompt_secret(&format!("Enter the password for {label}: "))
                .await?;

            match decryptor.decrypt(&orchestrator.identity().keystore, &password) {
                Ok(key) => {
                    orchestrator.resolve_credential(key)?;
                    info!(orchestrator = %label, "Keystore decrypted");
                }
                Err(e) => {
                    warn!(orchestrator = %label, error = %e, "Unable to decrypt keystore");
                    console
                        .notify(&format!("Unable to decrypt keystore for {label}: {e}"))
                        .await?;
                }
            }
        }
    }
    Ok(())
}
