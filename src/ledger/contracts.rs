//! Typed views of the protocol contracts.
//!
//! Each wrapper builds the [`ContractCall`] for a contract function and, for
//! read-only functions, decodes the returned [`LedgerValue`] into a Rust type.

use alloy_primitives::{Address, U256};

use super::{ContractCall, LedgerClient, LedgerResult, LedgerValue, LogFilter};
use crate::constants::{contracts, governance, PENDING_QUERY_END_ROUND};

/// Addresses of the three contracts the siphon talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractSet {
    pub bonding_manager: BondingManager,
    pub rounds_manager: RoundsManager,
    pub governor: Governor,
}

impl Default for ContractSet {
    fn default() -> Self {
        Self {
            bonding_manager: BondingManager::new(contracts::BONDING_MANAGER),
            rounds_manager: RoundsManager::new(contracts::ROUNDS_MANAGER),
            governor: Governor::new(contracts::GOVERNOR),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundsManager {
    address: Address,
}

impl RoundsManager {
    pub fn new(address: Address) -> Self {
        Self { address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn current_round_call(&self) -> ContractCall {
        ContractCall::new(self.address, "currentRound")
    }

    pub fn current_round_locked_call(&self) -> ContractCall {
        ContractCall::new(self.address, "currentRoundLocked")
    }

    pub async fn current_round(&self, client: &dyn LedgerClient) -> LedgerResult<u64> {
        client.read(&self.current_round_call()).await?.as_u64()
    }

    pub async fn current_round_locked(&self, client: &dyn LedgerClient) -> LedgerResult<bool> {
        client.read(&self.current_round_locked_call()).await?.as_bool()
    }

    /// Round length in L1 blocks
    pub async fn round_length(&self, client: &dyn LedgerClient) -> LedgerResult<u64> {
        client
            .read(&ContractCall::new(self.address, "roundLength"))
            .await?
            .as_u64()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BondingManager {
    address: Address,
}

impl BondingManager {
    pub fn new(address: Address) -> Self {
        Self { address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn pending_stake_call(&self, delegator: Address) -> ContractCall {
        ContractCall::new(self.address, "pendingStake")
            .arg(LedgerValue::Address(delegator))
            .arg(LedgerValue::Uint(U256::from(PENDING_QUERY_END_ROUND)))
    }

    pub fn pending_fees_call(&self, delegator: Address) -> ContractCall {
        ContractCall::new(self.address, "pendingFees")
            .arg(LedgerValue::Address(delegator))
            .arg(LedgerValue::Uint(U256::from(PENDING_QUERY_END_ROUND)))
    }

    pub fn get_transcoder_call(&self, transcoder: Address) -> ContractCall {
        ContractCall::new(self.address, "getTranscoder").arg(LedgerValue::Address(transcoder))
    }

    /// Stake claimable by `delegator`, in LPT base units
    pub async fn pending_stake(
        &self,
        client: &dyn LedgerClient,
        delegator: Address,
    ) -> LedgerResult<U256> {
        client
            .read(&self.pending_stake_call(delegator))
            .await?
            .as_uint()
    }

    /// Fees claimable by `delegator`, in wei
    pub async fn pending_fees(
        &self,
        client: &dyn LedgerClient,
        delegator: Address,
    ) -> LedgerResult<U256> {
        client
            .read(&self.pending_fees_call(delegator))
            .await?
            .as_uint()
    }

    /// First field of `getTranscoder`
    pub async fn last_reward_round(
        &self,
        client: &dyn LedgerClient,
        transcoder: Address,
    ) -> LedgerResult<u64> {
        client
            .read(&self.get_transcoder_call(transcoder))
            .await?
            .at(0)?
            .as_u64()
    }

    /// Move `amount` of bonded stake to `receiver`; hint positions left at zero
    pub fn transfer_bond(&self, receiver: Address, amount: U256) -> ContractCall {
        ContractCall::new(self.address, "transferBond")
            .arg(LedgerValue::Address(receiver))
            .arg(LedgerValue::Uint(amount))
            .arg(LedgerValue::Address(Address::ZERO))
            .arg(LedgerValue::Address(Address::ZERO))
            .arg(LedgerValue::Address(Address::ZERO))
            .arg(LedgerValue::Address(Address::ZERO))
    }

    pub fn reward(&self) -> ContractCall {
        ContractCall::new(self.address, "reward")
    }

    pub fn withdraw_fees(&self, recipient: Address, amount: U256) -> ContractCall {
        ContractCall::new(self.address, "withdrawFees")
            .arg(LedgerValue::Address(recipient))
            .arg(LedgerValue::Uint(amount))
    }

    pub fn transcoder(&self, reward_cut: u64, fee_share: u64) -> ContractCall {
        ContractCall::new(self.address, "transcoder")
            .arg(LedgerValue::Uint(U256::from(reward_cut)))
            .arg(LedgerValue::Uint(U256::from(fee_share)))
    }
}

/// Per-option vote weights, in LPT base units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VoteTally {
    pub against: U256,
    pub for_votes: U256,
    pub abstain: U256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Governor {
    address: Address,
}

impl Governor {
    pub fn new(address: Address) -> Self {
        Self { address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn proposal_created_filter(&self) -> LogFilter {
        LogFilter {
            contract: self.address,
            event: governance::PROPOSAL_CREATED_EVENT.to_string(),
        }
    }

    /// Voting delay, in rounds
    pub async fn voting_delay(&self, client: &dyn LedgerClient) -> LedgerResult<u64> {
        client
            .read(&ContractCall::new(self.address, "votingDelay"))
            .await?
            .as_u64()
    }

    /// Voting period, in rounds
    pub async fn voting_period(&self, client: &dyn LedgerClient) -> LedgerResult<u64> {
        client
            .read(&ContractCall::new(self.address, "votingPeriod"))
            .await?
            .as_u64()
    }

    /// Raw proposal state code
    pub async fn state(&self, client: &dyn LedgerClient, proposal_id: U256) -> LedgerResult<u64> {
        client
            .read(&ContractCall::new(self.address, "state").arg(LedgerValue::Uint(proposal_id)))
            .await?
            .as_u64()
    }

    pub async fn proposal_votes(
        &self,
        client: &dyn LedgerClient,
        proposal_id: U256,
    ) -> LedgerResult<VoteTally> {
        let votes = client
            .read(
                &ContractCall::new(self.address, "proposalVotes")
                    .arg(LedgerValue::Uint(proposal_id)),
            )
            .await?;
        Ok(VoteTally {
            against: votes.at(0)?.as_uint()?,
            for_votes: votes.at(1)?.as_uint()?,
            abstain: votes.at(2)?.as_uint()?,
        })
    }

    pub async fn has_voted(
        &self,
        client: &dyn LedgerClient,
        proposal_id: U256,
        account: Address,
    ) -> LedgerResult<bool> {
        client
            .read(
                &ContractCall::new(self.address, "hasVoted")
                    .arg(LedgerValue::Uint(proposal_id))
                    .arg(LedgerValue::Address(account)),
            )
            .await?
            .as_bool()
    }

    /// `castVoteWithReason` when a reason is given, `castVote` otherwise
    pub fn cast_vote(&self, proposal_id: U256, support: u8, reason: Option<&str>) -> ContractCall {
        let call = ContractCall::new(
            self.address,
            if reason.is_some() {
                "castVoteWithReason"
            } else {
                "castVote"
            },
        )
        .arg(LedgerValue::Uint(proposal_id))
        .arg(LedgerValue::Uint(U256::from(support)));

        match reason {
            Some(reason) => call.arg(LedgerValue::Text(reason.to_string())),
            None => call,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_queries_use_sentinel_round() {
        let contracts = ContractSet::default();
        let delegator = Address::repeat_byte(0x11);
        let call = contracts.bonding_manager.pending_stake_call(delegator);
        assert_eq!(call.method, "pendingStake");
        assert_eq!(call.contract, contracts::BONDING_MANAGER);
        assert_eq!(
            call.args,
            vec![
                LedgerValue::Address(delegator),
                LedgerValue::Uint(U256::from(99_999u64))
            ]
        );
    }

    #[test]
    fn test_transfer_bond_zero_hints() {
        let bonding = BondingManager::new(Address::repeat_byte(0x01));
        let call = bonding.transfer_bond(Address::repeat_byte(0x02), U256::from(5u64));
        assert_eq!(call.args.len(), 6);
        assert_eq!(call.args[2], LedgerValue::Address(Address::ZERO));
    }

    #[test]
    fn test_cast_vote_variants() {
        let governor = Governor::new(Address::repeat_byte(0x03));
        let plain = governor.cast_vote(U256::from(7u64), 1, None);
        assert_eq!(plain.method, "castVote");
        assert_eq!(plain.args.len(), 2);

        let reasoned = governor.cast_vote(U256::from(7u64), 0, Some("too expensive"));
        assert_eq!(reasoned.method, "castVoteWithReason");
        assert_eq!(
            reasoned.args[2],
            LedgerValue::Text("too expensive".to_string())
        );
    }
}
