//! # Action Executor
//!
//! Every mutating call goes through [`ActionExecutor::execute`]: fetch the
//! account nonce, build the transaction with the fixed fee parameters, sign
//! it with the orchestrator's credential, submit, and wait for inclusion.
//!
//! A failure at any step is logged with the orchestrator, action and amount
//! and returned to the caller, which treats it as a no-op for the tick.

use alloy_primitives::{Address, U256};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::constants::{fees, VoteSupport};
use crate::error::{Result, SiphonError};
use crate::ledger::{
    ContractSet, GasParams, LedgerClient, LedgerError, LedgerErrorKind, TxPayload, TxReceipt,
    TxRequest,
};
use crate::logging::{log_action, log_error};
use crate::models::units::display_ether;
use crate::models::Orchestrator;

/// A mutating call on behalf of one orchestrator
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Action {
    /// Move bonded stake to the LPT receiver
    TransferBond { receiver: Address, amount: U256 },
    Reward,
    WithdrawFees { recipient: Address, amount: U256 },
    /// Plain value transfer from the orchestrator wallet
    SendValue { to: Address, amount: U256 },
    /// Commission rates in contract units (percent × 10,000)
    SetCommission { reward_cut: u64, fee_share: u64 },
    CastVote {
        proposal_id: U256,
        support: VoteSupport,
        reason: Option<String>,
    },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::TransferBond { .. } => "transfer_bond",
            Action::Reward => "reward",
            Action::WithdrawFees { .. } => "withdraw_fees",
            Action::SendValue { .. } => "send_value",
            Action::SetCommission { .. } => "set_commission",
            Action::CastVote { .. } => "cast_vote",
        }
    }

    fn payload(&self, contracts: &ContractSet) -> TxPayload {
        let bonding = &contracts.bonding_manager;
        match self {
            Action::TransferBond { receiver, amount } => {
                TxPayload::Call(bonding.transfer_bond(*receiver, *amount))
            }
            Action::Reward => TxPayload::Call(bonding.reward()),
            Action::WithdrawFees { recipient, amount } => {
                TxPayload::Call(bonding.withdraw_fees(*recipient, *amount))
            }
            Action::SendValue { to, amount } => TxPayload::Transfer {
                to: *to,
                value: *amount,
            },
            Action::SetCommission {
                reward_cut,
                fee_share,
            } => TxPayload::Call(bonding.transcoder(*reward_cut, *fee_share)),
            Action::CastVote {
                proposal_id,
                support,
                reason,
            } => TxPayload::Call(contracts.governor.cast_vote(
                *proposal_id,
                support.code(),
                reason.as_deref(),
            )),
        }
    }

    fn gas_params(&self) -> GasParams {
        GasParams {
            max_fee_per_gas: fees::MAX_FEE_PER_GAS,
            max_priority_fee_per_gas: fees::MAX_PRIORITY_FEE_PER_GAS,
            gas_limit: match self {
                Action::SendValue { .. } => Some(fees::VALUE_TRANSFER_GAS_LIMIT),
                _ => None,
            },
            chain_id: fees::CHAIN_ID,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::TransferBond { receiver, amount } => write!(
                f,
                "transfer {} LPT bond to {}",
                display_ether(*amount, 4),
                receiver.to_checksum(None)
            ),
            Action::Reward => write!(f, "call reward"),
            Action::WithdrawFees { recipient, amount } => write!(
                f,
                "withdraw {} ETH fees to {}",
                display_ether(*amount, 6),
                recipient.to_checksum(None)
            ),
            Action::SendValue { to, amount } => write!(
                f,
                "send {} ETH to {}",
                display_ether(*amount, 6),
                to.to_checksum(None)
            ),
            Action::SetCommission {
                reward_cut,
                fee_share,
            } => write!(f, "set rewardCut={reward_cut}, feeShare={fee_share}"),
            Action::CastVote {
                proposal_id,
                support,
                reason,
            } => match reason {
                Some(reason) => write!(f, "vote {support} on {proposal_id} with reason '{reason}'"),
                None => write!(f, "vote {support} on {proposal_id} without a reason"),
            },
        }
    }
}

#[derive(Clone)]
pub struct ActionExecutor {
    client: Arc<dyn LedgerClient>,
    contracts: ContractSet,
}

impl fmt::Debug for ActionExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionExecutor")
            .field("contracts", &self.contracts)
            .finish()
    }
}

impl ActionExecutor {
    pub fn new(client: Arc<dyn LedgerClient>, contracts: ContractSet) -> Self {
        Self { client, contracts }
    }

    /// Build, sign, submit and confirm `action` for `orchestrator`
    #[instrument(skip_all, fields(orchestrator = %orchestrator.label(), action = action.name()))]
    pub async fn execute(&self, orchestrator: &Orchestrator, action: &Action) -> Result<TxReceipt> {
        let label = orchestrator.label();
        info!("💸 Going to {action}");

        let result = self.submit_and_confirm(orchestrator, action).await;
        match &result {
            Ok(receipt) => log_action(
                &label,
                action.name(),
                "confirmed",
                Some(&format!(
                    "{action} (tx {}, block {})",
                    receipt.transaction_hash, receipt.block_number
                )),
            ),
            Err(e) => log_error(
                "action_executor",
                action.name(),
                &e.to_string(),
                Some(&format!("{label}: {action}")),
            ),
        }
        result
    }

    async fn submit_and_confirm(
        &self,
        orchestrator: &Orchestrator,
        action: &Action,
    ) -> Result<TxReceipt> {
        let label = orchestrator.label();
        let key = orchestrator
            .credential()
            .key()
            .ok_or_else(|| SiphonError::Credential {
                orchestrator: label.clone(),
                message: "signing credential has not been resolved".to_string(),
            })?;
        let failed = |source: LedgerError| SiphonError::Action {
            orchestrator: label.clone(),
            action: action.name().to_string(),
            source,
        };

        let from = orchestrator.address();
        let nonce = self
            .client
            .transaction_count(from)
            .await
            .map_err(&failed)?;
        let request = TxRequest {
            from,
            payload: action.payload(&self.contracts),
            gas: action.gas_params(),
            nonce,
        };

        let unsigned = self.client.build_tx(&request).await.map_err(&failed)?;
        let signed = self.client.sign(&unsigned, key).map_err(&failed)?;
        let tx_hash = self.client.submit(&signed).await.map_err(&failed)?;
        info!(tx_hash = %tx_hash, nonce, "Initiated transaction");

        let receipt = self
            .client
            .wait_for_confirmation(tx_hash)
            .await
            .map_err(&failed)?;
        if !receipt.success {
            return Err(failed(LedgerError::new(
                LedgerErrorKind::Reverted,
                format!("transaction {tx_hash} reverted"),
            )));
        }
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_value_transfers_fix_gas_limit() {
        let send = Action::SendValue {
            to: Address::repeat_byte(0x01),
            amount: U256::from(1u64),
        };
        let gas = send.gas_params();
        assert_eq!(gas.gas_limit, Some(300_000));
        assert_eq!(gas.chain_id, 42161);
        assert_eq!(gas.max_fee_per_gas, 2_000_000_000);
        assert_eq!(Action::Reward.gas_params().gas_limit, None);
    }

    #[test]
    fn test_payloads() {
        let contracts = ContractSet::default();
        match Action::Reward.payload(&contracts) {
            TxPayload::Call(call) => {
                assert_eq!(call.method, "reward");
                assert_eq!(call.contract, contracts.bonding_manager.address());
            }
            other => panic!("unexpected payload {other:?}"),
        }

        let vote = Action::CastVote {
            proposal_id: U256::from(9u64),
            support: VoteSupport::Abstain,
            reason: Some("conflict of interest".to_string()),
        };
        match vote.payload(&contracts) {
            TxPayload::Call(call) => assert_eq!(call.method, "castVoteWithReason"),
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn test_display_includes_amount() {
        let action = Action::WithdrawFees {
            recipient: Address::repeat_byte(0x22),
            amount: U256::from(49_990_000_000_000_000u128),
        };
        assert!(action.to_string().starts_with("withdraw 0.049990 ETH fees to 0x"));
    }
}
