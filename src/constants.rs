//! # System Constants
//!
//! Network addresses, fixed fee parameters and governance enumerations that
//! define the operational boundaries of the siphon.

use alloy_primitives::{address, Address};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Deployed protocol contracts on the target L2 network
pub mod contracts {
    use super::*;

    pub const BONDING_MANAGER: Address = address!("35Bcf3c30594191d53231E4FF333E8A770453e40");
    pub const ROUNDS_MANAGER: Address = address!("dd6f56DcC28D3F5f27084381fE8Df634985cc39f");
    pub const GOVERNOR: Address = address!("cFE4E2879B786C3aa075813F0E364bb5acCb6aa0");
}

/// Fixed transaction fee parameters
pub mod fees {
    /// 2 gwei
    pub const MAX_FEE_PER_GAS: u128 = 2_000_000_000;
    /// 1 gwei
    pub const MAX_PRIORITY_FEE_PER_GAS: u128 = 1_000_000_000;
    /// Gas limit for plain value transfers; contract calls are estimated by the client
    pub const VALUE_TRANSFER_GAS_LIMIT: u64 = 300_000;
    pub const CHAIN_ID: u64 = 42161;
}

/// End round passed to `pendingStake`/`pendingFees` so the contract reports up to the latest round
pub const PENDING_QUERY_END_ROUND: u64 = 99_999;

/// Default remainder left behind on fee withdrawal to absorb rounding, in ether
pub const DEFAULT_FEE_REMAINDER_ETH: f64 = 0.000_01;

/// Governance search parameters
pub mod governance {
    /// L2 blocks per L1 block (12s / 0.25s)
    pub const L1_TO_L2_BLOCK_RATIO: u64 = 48;
    pub const SEARCH_BUFFER_BLOCKS: u64 = 50_000;
    /// Roughly two weeks of L2 blocks, used when voting parameters are unreadable
    pub const FALLBACK_VOTING_WINDOW_BLOCKS: u64 = 5_000_000;
    pub const PROPOSAL_CREATED_EVENT: &str = "ProposalCreated";
}

/// Proposal lifecycle as reported by an OpenZeppelin `IGovernor`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalState {
    Pending,
    Active,
    Canceled,
    Defeated,
    Succeeded,
    Queued,
    Expired,
    Executed,
}

impl ProposalState {
    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            0 => Some(Self::Pending),
            1 => Some(Self::Active),
            2 => Some(Self::Canceled),
            3 => Some(Self::Defeated),
            4 => Some(Self::Succeeded),
            5 => Some(Self::Queued),
            6 => Some(Self::Expired),
            7 => Some(Self::Executed),
            _ => None,
        }
    }
}

impl fmt::Display for ProposalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProposalState::Pending => "Pending",
            ProposalState::Active => "Active",
            ProposalState::Canceled => "Canceled",
            ProposalState::Defeated => "Defeated",
            ProposalState::Succeeded => "Succeeded",
            ProposalState::Queued => "Queued",
            ProposalState::Expired => "Expired",
            ProposalState::Executed => "Executed",
        };
        write!(f, "{name}")
    }
}

/// Vote support values accepted by `castVote`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteSupport {
    Against = 0,
    For = 1,
    Abstain = 2,
}

impl VoteSupport {
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for VoteSupport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoteSupport::Against => write!(f, "AGAINST"),
            VoteSupport::For => write!(f, "FOR"),
            VoteSupport::Abstain => write!(f, "ABSTAIN"),
        }
    }
}
