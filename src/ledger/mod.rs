//! # Ledger Client Contract
//!
//! The siphon never talks to a node directly. Everything it needs from the
//! network goes through [`LedgerClient`]: read-only contract calls, event-log
//! range queries, and the build → sign → submit → confirm transaction
//! pipeline. ABI encoding, key handling and transport live behind this trait.
//!
//! Errors carry an explicit [`LedgerErrorKind`] so callers can tell a
//! timeout from a rate limit or an oversized log range without inspecting
//! message text.

pub mod contracts;

use alloy_primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::models::SigningKey;

pub use contracts::{BondingManager, ContractSet, Governor, RoundsManager};

/// Category of a ledger failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerErrorKind {
    Timeout,
    Network,
    RateLimited,
    RangeTooLarge,
    Reverted,
    Decode,
    Signing,
    /// Uncategorised; callers may fall back to inspecting the message
    Other,
}

impl fmt::Display for LedgerErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LedgerErrorKind::Timeout => "timeout",
            LedgerErrorKind::Network => "network",
            LedgerErrorKind::RateLimited => "rate limited",
            LedgerErrorKind::RangeTooLarge => "range too large",
            LedgerErrorKind::Reverted => "reverted",
            LedgerErrorKind::Decode => "decode",
            LedgerErrorKind::Signing => "signing",
            LedgerErrorKind::Other => "other",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct LedgerError {
    pub kind: LedgerErrorKind,
    pub message: String,
}

impl LedgerError {
    pub fn new(kind: LedgerErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(LedgerErrorKind::Decode, message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(LedgerErrorKind::Other, message)
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Argument or return value of a contract function
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerValue {
    Uint(U256),
    Bool(bool),
    Address(Address),
    Text(String),
    Bytes(Bytes),
    List(Vec<LedgerValue>),
}

impl LedgerValue {
    pub fn as_uint(&self) -> LedgerResult<U256> {
        match self {
            LedgerValue::Uint(value) => Ok(*value),
            other => Err(LedgerError::decode(format!("expected uint, got {other:?}"))),
        }
    }

    pub fn as_u64(&self) -> LedgerResult<u64> {
        let value = self.as_uint()?;
        u64::try_from(value).map_err(|_| LedgerError::decode(format!("{value} overflows u64")))
    }

    pub fn as_bool(&self) -> LedgerResult<bool> {
        match self {
            LedgerValue::Bool(value) => Ok(*value),
            other => Err(LedgerError::decode(format!("expected bool, got {other:?}"))),
        }
    }

    pub fn as_address(&self) -> LedgerResult<Address> {
        match self {
            LedgerValue::Address(value) => Ok(*value),
            other => Err(LedgerError::decode(format!(
                "expected address, got {other:?}"
            ))),
        }
    }

    pub fn as_text(&self) -> LedgerResult<&str> {
        match self {
            LedgerValue::Text(value) => Ok(value),
            other => Err(LedgerError::decode(format!("expected string, got {other:?}"))),
        }
    }

    pub fn as_list(&self) -> LedgerResult<&[LedgerValue]> {
        match self {
            LedgerValue::List(values) => Ok(values),
            other => Err(LedgerError::decode(format!("expected list, got {other:?}"))),
        }
    }

    /// Element `idx` of a list or tuple return value
    pub fn at(&self, idx: usize) -> LedgerResult<&LedgerValue> {
        self.as_list()?
            .get(idx)
            .ok_or_else(|| LedgerError::decode(format!("missing tuple element {idx}")))
    }
}

/// A contract function invocation, used for both reads and transactions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractCall {
    pub contract: Address,
    pub method: String,
    pub args: Vec<LedgerValue>,
}

impl ContractCall {
    pub fn new(contract: Address, method: impl Into<String>) -> Self {
        Self {
            contract,
            method: method.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, value: LedgerValue) -> Self {
        self.args.push(value);
        self
    }
}

/// Selects the event logs returned by [`LedgerClient::get_logs`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogFilter {
    pub contract: Address,
    pub event: String,
}

/// A decoded event log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    pub block_number: u64,
    pub transaction_hash: B256,
    pub args: BTreeMap<String, LedgerValue>,
}

impl LogEvent {
    pub fn arg(&self, name: &str) -> LedgerResult<&LedgerValue> {
        self.args
            .get(name)
            .ok_or_else(|| LedgerError::decode(format!("event has no argument '{name}'")))
    }
}

/// EIP-1559 fee parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasParams {
    pub max_fee_per_gas: u128,
    pub max_priority_fee_per_gas: u128,
    /// `None` lets the client estimate
    pub gas_limit: Option<u64>,
    pub chain_id: u64,
}

/// What a transaction does
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxPayload {
    Call(ContractCall),
    Transfer { to: Address, value: U256 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxRequest {
    pub from: Address,
    pub payload: TxPayload,
    pub gas: GasParams,
    pub nonce: u64,
}

/// Client-built transaction awaiting a signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTx {
    pub request: TxRequest,
    pub encoded: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTx {
    pub raw: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub transaction_hash: B256,
    pub block_number: u64,
    pub success: bool,
}

/// Operations the siphon requires from a ledger client
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Read-only contract call
    async fn read(&self, call: &ContractCall) -> LedgerResult<LedgerValue>;

    /// Event logs in `[from_block, to_block]`
    async fn get_logs(
        &self,
        filter: &LogFilter,
        from_block: u64,
        to_block: u64,
    ) -> LedgerResult<Vec<LogEvent>>;

    async fn transaction_count(&self, address: Address) -> LedgerResult<u64>;

    async fn build_tx(&self, request: &TxRequest) -> LedgerResult<UnsignedTx>;

    fn sign(&self, tx: &UnsignedTx, key: &SigningKey) -> LedgerResult<SignedTx>;

    async fn submit(&self, tx: &SignedTx) -> LedgerResult<B256>;

    /// Blocks until the transaction is included
    async fn wait_for_confirmation(&self, tx_hash: B256) -> LedgerResult<TxReceipt>;

    async fn get_balance(&self, address: Address) -> LedgerResult<U256>;

    async fn current_block(&self) -> LedgerResult<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_accessors() {
        let tuple = LedgerValue::List(vec![
            LedgerValue::Uint(U256::from(42u64)),
            LedgerValue::Bool(true),
        ]);
        assert_eq!(tuple.at(0).unwrap().as_u64().unwrap(), 42);
        assert!(tuple.at(1).unwrap().as_bool().unwrap());
        assert_eq!(tuple.at(2).unwrap_err().kind, LedgerErrorKind::Decode);
        assert!(LedgerValue::Bool(true).as_uint().is_err());
    }

    #[test]
    fn test_u64_overflow_is_decode_error() {
        let huge = LedgerValue::Uint(U256::MAX);
        assert_eq!(huge.as_u64().unwrap_err().kind, LedgerErrorKind::Decode);
    }

    #[test]
    fn test_error_display() {
        let err = LedgerError::new(LedgerErrorKind::RateLimited, "429 Too Many Requests");
        assert_eq!(err.to_string(), "rate limited: 429 Too Many Requests");
    }
}
