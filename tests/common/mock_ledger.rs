//! In-memory ledger for integration tests.
//!
//! Reads are scripted per method (optionally per account), failures can be
//! queued per method, and confirmed transactions are applied back to the
//! scripted state so follow-up reads observe them.

#![allow(dead_code)]

use alloy_primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use orchestrator_siphon::ledger::{
    ContractCall, LedgerClient, LedgerError, LedgerErrorKind, LedgerResult, LedgerValue,
    LogEvent, LogFilter, SignedTx, TxPayload, TxReceipt, TxRequest, UnsignedTx,
};
use orchestrator_siphon::models::SigningKey;

#[derive(Debug, Default)]
struct MockState {
    reads: HashMap<(String, Option<Address>), LedgerValue>,
    id_reads: HashMap<(String, U256), LedgerValue>,
    read_failures: HashMap<String, VecDeque<LedgerError>>,
    read_counts: HashMap<String, usize>,

    balances: HashMap<Address, U256>,
    balance_failures: VecDeque<LedgerError>,
    balance_reads: usize,

    logs: Vec<LogEvent>,
    log_failures: VecDeque<LedgerError>,
    log_calls: Vec<(u64, u64)>,
    max_log_range: Option<u64>,

    head: u64,
    nonces: HashMap<Address, u64>,
    built: Vec<TxRequest>,
    confirmed: Vec<TxRequest>,
    submit_failures: VecDeque<LedgerError>,
    revert_next: bool,
}

#[derive(Debug, Default)]
pub struct MockLedger {
    state: Mutex<MockState>,
}

fn first_uint(call: &ContractCall) -> Option<U256> {
    call.args.iter().find_map(|arg| match arg {
        LedgerValue::Uint(value) => Some(*value),
        _ => None,
    })
}

fn first_address(call: &ContractCall) -> Option<Address> {
    call.args.iter().find_map(|arg| match arg {
        LedgerValue::Address(address) => Some(*address),
        _ => None,
    })
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut MockState) -> T) -> T {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    /// Value returned by `method` for every caller
    pub fn set_read(&self, method: &str, value: LedgerValue) {
        self.with_state(|s| s.reads.insert((method.to_string(), None), value));
    }

    /// Value returned by `method` when its first address argument is `account`
    pub fn set_read_for(&self, method: &str, account: Address, value: LedgerValue) {
        self.with_state(|s| s.reads.insert((method.to_string(), Some(account)), value));
    }

    /// Value returned by `method` when its first uint argument is `id`
    pub fn set_read_for_id(&self, method: &str, id: U256, value: LedgerValue) {
        self.with_state(|s| s.id_reads.insert((method.to_string(), id), value));
    }

    pub fn set_pending_stake(&self, account: Address, amount: U256) {
        self.set_read_for("pendingStake", account, LedgerValue::Uint(amount));
    }

    pub fn set_pending_fees(&self, account: Address, amount: U256) {
        self.set_read_for("pendingFees", account, LedgerValue::Uint(amount));
    }

    pub fn set_last_reward_round(&self, account: Address, round: u64) {
        self.set_read_for(
            "getTranscoder",
            account,
            LedgerValue::List(vec![
                LedgerValue::Uint(U256::from(round)),
                LedgerValue::Uint(U256::ZERO),
                LedgerValue::Uint(U256::ZERO),
            ]),
        );
    }

    pub fn set_round(&self, number: u64, locked: bool) {
        self.set_read("currentRound", LedgerValue::Uint(U256::from(number)));
        self.set_read("currentRoundLocked", LedgerValue::Bool(locked));
    }

    pub fn set_balance(&self, account: Address, amount: U256) {
        self.with_state(|s| s.balances.insert(account, amount));
    }

    pub fn balance_of(&self, account: Address) -> U256 {
        self.with_state(|s| s.balances.get(&account).copied().unwrap_or_default())
    }

    pub fn fail_read(&self, method: &str, kind: LedgerErrorKind, times: usize) {
        self.with_state(|s| {
            let queue = s.read_failures.entry(method.to_string()).or_default();
            for _ in 0..times {
                queue.push_back(LedgerError::new(kind, format!("{method} failed")));
            }
        });
    }

    pub fn fail_balance(&self, kind: LedgerErrorKind, times: usize) {
        self.with_state(|s| {
            for _ in 0..times {
                s.balance_failures
                    .push_back(LedgerError::new(kind, "eth_getBalance failed"));
            }
        });
    }

    pub fn read_count(&self, method: &str) -> usize {
        self.with_state(|s| s.read_counts.get(method).copied().unwrap_or_default())
    }

    pub fn balance_reads(&self) -> usize {
        self.with_state(|s| s.balance_reads)
    }

    pub fn set_head(&self, block: u64) {
        self.with_state(|s| s.head = block);
    }

    pub fn push_log(&self, event: LogEvent) {
        self.with_state(|s| s.logs.push(event));
    }

    /// Queue a `get_logs` failure, consumed before any range check
    pub fn fail_logs(&self, error: LedgerError) {
        self.with_state(|s| s.log_failures.push_back(error));
    }

    /// Queries spanning more blocks than this fail with `RangeTooLarge`
    pub fn set_max_log_range(&self, blocks: u64) {
        self.with_state(|s| s.max_log_range = Some(blocks));
    }

    pub fn log_calls(&self) -> Vec<(u64, u64)> {
        self.with_state(|s| s.log_calls.clone())
    }

    pub fn fail_submit(&self, kind: LedgerErrorKind) {
        self.with_state(|s| {
            s.submit_failures
                .push_back(LedgerError::new(kind, "eth_sendRawTransaction failed"))
        });
    }

    pub fn revert_next(&self) {
        self.with_state(|s| s.revert_next = true);
    }

    pub fn built(&self) -> Vec<TxRequest> {
        self.with_state(|s| s.built.clone())
    }

    pub fn confirmed(&self) -> Vec<TxRequest> {
        self.with_state(|s| s.confirmed.clone())
    }

    /// Confirmed contract calls by method name
    pub fn confirmed_calls(&self, method: &str) -> Vec<ContractCall> {
        self.confirmed()
            .into_iter()
            .filter_map(|request| match request.payload {
                TxPayload::Call(call) if call.method == method => Some(call),
                _ => None,
            })
            .collect()
    }

    fn apply(state: &mut MockState, request: &TxRequest) {
        let from = request.from;
        match &request.payload {
            TxPayload::Transfer { to, value } => {
                let balance = state.balances.entry(from).or_default();
                *balance = balance.saturating_sub(*value);
                *state.balances.entry(*to).or_default() += *value;
            }
            TxPayload::Call(call) => match call.method.as_str() {
                "reward" => {
                    let round = state
                        .reads
                        .get(&("currentRound".to_string(), None))
                        .cloned()
                        .unwrap_or(LedgerValue::Uint(U256::ZERO));
                    state.reads.insert(
                        ("getTranscoder".to_string(), Some(from)),
                        LedgerValue::List(vec![round]),
                    );
                }
                "transferBond" => {
                    let amount = call.args[1].as_uint().unwrap();
                    let key = ("pendingStake".to_string(), Some(from));
                    let pending = state
                        .reads
                        .get(&key)
                        .and_then(|v| v.as_uint().ok())
                        .unwrap_or_default();
                    state
                        .reads
                        .insert(key, LedgerValue::Uint(pending.saturating_sub(amount)));
                }
                "withdrawFees" => {
                    let recipient = call.args[0].as_address().unwrap();
                    let amount = call.args[1].as_uint().unwrap();
                    let key = ("pendingFees".to_string(), Some(from));
                    let pending = state
                        .reads
                        .get(&key)
                        .and_then(|v| v.as_uint().ok())
                        .unwrap_or_default();
                    state
                        .reads
                        .insert(key, LedgerValue::Uint(pending.saturating_sub(amount)));
                    *state.balances.entry(recipient).or_default() += amount;
                }
                _ => {}
            },
        }
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn read(&self, call: &ContractCall) -> LedgerResult<LedgerValue> {
        self.with_state(|s| {
            *s.read_counts.entry(call.method.clone()).or_default() += 1;

            if let Some(error) = s
                .read_failures
                .get_mut(&call.method)
                .and_then(VecDeque::pop_front)
            {
                return Err(error);
            }

            let by_id = first_uint(call)
                .and_then(|id| s.id_reads.get(&(call.method.clone(), id)))
                .cloned();
            if let Some(value) = by_id {
                return Ok(value);
            }

            let scoped = first_address(call).map(|account| (call.method.clone(), Some(account)));
            scoped
                .and_then(|key| s.reads.get(&key))
                .or_else(|| s.reads.get(&(call.method.clone(), None)))
                .cloned()
                .ok_or_else(|| {
                    LedgerError::new(
                        LedgerErrorKind::Reverted,
                        format!("no scripted value for {}", call.method),
                    )
                })
        })
    }

    async fn get_logs(
        &self,
        filter: &LogFilter,
        from_block: u64,
        to_block: u64,
    ) -> LedgerResult<Vec<LogEvent>> {
        self.with_state(|s| {
            s.log_calls.push((from_block, to_block));

            if let Some(error) = s.log_failures.pop_front() {
                return Err(error);
            }
            if let Some(max) = s.max_log_range {
                if to_block - from_block + 1 > max {
                    return Err(LedgerError::new(
                        LedgerErrorKind::RangeTooLarge,
                        format!("block range too large for {}", filter.event),
                    ));
                }
            }

            Ok(s.logs
                .iter()
                .filter(|event| (from_block..=to_block).contains(&event.block_number))
                .cloned()
                .collect())
        })
    }

    async fn transaction_count(&self, address: Address) -> LedgerResult<u64> {
        self.with_state(|s| Ok(s.nonces.get(&address).copied().unwrap_or_default()))
    }

    async fn build_tx(&self, request: &TxRequest) -> LedgerResult<UnsignedTx> {
        self.with_state(|s| {
            s.built.push(request.clone());
            let index = (s.built.len() - 1) as u64;
            Ok(UnsignedTx {
                request: request.clone(),
                encoded: Bytes::from(index.to_be_bytes().to_vec()),
            })
        })
    }

    fn sign(&self, tx: &UnsignedTx, key: &SigningKey) -> LedgerResult<SignedTx> {
        if key.expose().is_empty() {
            return Err(LedgerError::new(LedgerErrorKind::Signing, "empty key"));
        }
        Ok(SignedTx {
            raw: tx.encoded.clone(),
        })
    }

    async fn submit(&self, tx: &SignedTx) -> LedgerResult<B256> {
        self.with_state(|s| {
            if let Some(error) = s.submit_failures.pop_front() {
                return Err(error);
            }
            let mut hash = [0u8; 32];
            hash[24..].copy_from_slice(&tx.raw);
            Ok(B256::from(hash))
        })
    }

    async fn wait_for_confirmation(&self, tx_hash: B256) -> LedgerResult<TxReceipt> {
        self.with_state(|s| {
            let mut index = [0u8; 8];
            index.copy_from_slice(&tx_hash.as_slice()[24..]);
            let request = s.built[u64::from_be_bytes(index) as usize].clone();

            let success = !std::mem::take(&mut s.revert_next);
            if success {
                Self::apply(s, &request);
                *s.nonces.entry(request.from).or_default() += 1;
                s.confirmed.push(request);
            }
            Ok(TxReceipt {
                transaction_hash: tx_hash,
                block_number: s.head,
                success,
            })
        })
    }

    async fn get_balance(&self, address: Address) -> LedgerResult<U256> {
        self.with_state(|s| {
            s.balance_reads += 1;
            if let Some(error) = s.balance_failures.pop_front() {
                return Err(error);
            }
            Ok(s.balances.get(&address).copied().unwrap_or_default())
        })
    }

    async fn current_block(&self) -> LedgerResult<u64> {
        self.with_state(|s| Ok(s.head))
    }
}
