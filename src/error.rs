use crate::config::ConfigurationError;
use crate::ledger::LedgerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SiphonError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Connectivity error: {0}")]
    Connectivity(String),

    #[error("Credential error for {orchestrator}: {message}")]
    Credential {
        orchestrator: String,
        message: String,
    },

    #[error("Action '{action}' failed for {orchestrator}: {source}")]
    Action {
        orchestrator: String,
        action: String,
        #[source]
        source: LedgerError,
    },

    #[error("Operator console error: {0}")]
    Operator(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl SiphonError {
    /// Errors that stop the process: startup failures and a closed operator console.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SiphonError::Configuration(_)
                | SiphonError::Connectivity(_)
                | SiphonError::Credential { .. }
                | SiphonError::Operator(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, SiphonError>;
