//! # Treasury Governance
//!
//! Discovery of active treasury proposals and the read side of voting.
//!
//! Proposals can only be active inside the voting window, so discovery scans
//! `ProposalCreated` events over `[head - window - buffer, head]` with the
//! adaptive [`RangeScanner`] and keeps the proposals whose on-chain state is
//! `Active`. The window is `(votingDelay + votingPeriod) × roundLength`
//! converted from L1 to L2 blocks; if any of those reads fail a fixed
//! fallback window is used.

use alloy_primitives::{Address, U256};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::constants::governance::{
    FALLBACK_VOTING_WINDOW_BLOCKS, L1_TO_L2_BLOCK_RATIO, SEARCH_BUFFER_BLOCKS,
};
use crate::constants::ProposalState;
use crate::ledger::contracts::VoteTally;
use crate::ledger::{ContractSet, LedgerClient, LedgerResult, LogEvent};
use crate::models::units::wei_to_ether;
use crate::resilience::{BlockRange, RangeScanner, ScanReport, ScannerConfig};

/// An active treasury proposal
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Proposal {
    pub proposal_id: U256,
    pub proposer: Address,
    pub vote_start: u64,
    pub vote_end: u64,
    pub title: String,
    pub state: ProposalState,
}

/// First description line with leading `#` markers and whitespace removed
pub fn proposal_title(description: &str) -> String {
    description
        .lines()
        .next()
        .unwrap_or_default()
        .trim_start_matches('#')
        .trim()
        .to_string()
}

/// One-line summary of a tally, with each option's share of the total
pub fn describe_tally(tally: &VoteTally) -> String {
    let total = tally.against + tally.for_votes + tally.abstain;
    let share = |part: U256| {
        if total.is_zero() {
            0.0
        } else {
            wei_to_ether(part) / wei_to_ether(total) * 100.0
        }
    };
    format!(
        "Currently {:.0} LPT ({:.0}%) is in favour, {:.0} LPT ({:.0}%) is against, {:.0} LPT ({:.0}%) has abstained",
        wei_to_ether(tally.for_votes),
        share(tally.for_votes),
        wei_to_ether(tally.against),
        share(tally.against),
        wei_to_ether(tally.abstain),
        share(tally.abstain)
    )
}

#[derive(Clone)]
pub struct Governance {
    client: Arc<dyn LedgerClient>,
    contracts: ContractSet,
    scanner: ScannerConfig,
}

impl std::fmt::Debug for Governance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Governance")
            .field("contracts", &self.contracts)
            .field("scanner", &self.scanner)
            .finish()
    }
}

impl Governance {
    pub fn new(client: Arc<dyn LedgerClient>, contracts: ContractSet, scanner: ScannerConfig) -> Self {
        Self {
            client,
            contracts,
            scanner,
        }
    }

    /// Blocks in which a proposal can still be pending or active
    pub async fn voting_window(&self) -> u64 {
        match self.read_voting_window().await {
            Ok(window) => window,
            Err(e) => {
                warn!(
                    error = %e,
                    fallback = FALLBACK_VOTING_WINDOW_BLOCKS,
                    "Could not get voting parameters, using fallback window"
                );
                FALLBACK_VOTING_WINDOW_BLOCKS
            }
        }
    }

    async fn read_voting_window(&self) -> LedgerResult<u64> {
        let client = self.client.as_ref();
        let governor = &self.contracts.governor;
        let voting_delay = governor.voting_delay(client).await?;
        let voting_period = governor.voting_period(client).await?;
        let round_length_l1 = self.contracts.rounds_manager.round_length(client).await?;

        let total_rounds = voting_delay.saturating_add(voting_period);
        let window = total_rounds
            .saturating_mul(round_length_l1)
            .saturating_mul(L1_TO_L2_BLOCK_RATIO);
        debug!(
            voting_delay,
            voting_period,
            round_length_l1,
            window,
            "Voting window: {total_rounds} rounds = {window} L2 blocks"
        );
        Ok(window)
    }

    /// `[max(0, head - window - buffer), head]`
    pub async fn search_range(&self) -> LedgerResult<BlockRange> {
        let head = self.client.current_block().await?;
        let window = self.voting_window().await;
        Ok(BlockRange {
            from: head.saturating_sub(window).saturating_sub(SEARCH_BUFFER_BLOCKS),
            to: head,
        })
    }

    pub async fn scan_proposals(&self, range: BlockRange) -> ScanReport {
        let scanner = RangeScanner::new(self.client.as_ref(), self.scanner.clone());
        scanner
            .scan(&self.contracts.governor.proposal_created_filter(), range.from, range.to)
            .await
    }

    /// Proposals currently open for voting
    pub async fn active_proposals(&self) -> LedgerResult<Vec<Proposal>> {
        let range = self.search_range().await?;
        info!(
            from_block = range.from,
            to_block = range.to,
            "Searching for proposals"
        );

        let report = self.scan_proposals(range).await;
        if report.events.is_empty() {
            info!("No proposals found in search range");
            return Ok(Vec::new());
        }
        info!(
            found = report.events.len(),
            "Found proposals, checking states..."
        );

        let mut active = Vec::new();
        for event in &report.events {
            let Some(mut proposal) = decode_proposal(event) else {
                continue;
            };
            let Some(state) = self.proposal_state(proposal.proposal_id).await else {
                continue;
            };
            debug!(title = %truncate(&proposal.title, 50), state = %state, "Proposal state");
            if state == ProposalState::Active {
                proposal.state = state;
                active.push(proposal);
            }
        }

        info!(active = active.len(), "Found active proposals");
        Ok(active)
    }

    /// `None` when the state cannot be read or is not a known code
    pub async fn proposal_state(&self, proposal_id: U256) -> Option<ProposalState> {
        match self
            .contracts
            .governor
            .state(self.client.as_ref(), proposal_id)
            .await
        {
            Ok(code) => {
                let state = ProposalState::from_code(code);
                if state.is_none() {
                    warn!(%proposal_id, code, "Unknown proposal state");
                }
                state
            }
            Err(e) => {
                warn!(%proposal_id, error = %e, "Unable to get proposal state");
                None
            }
        }
    }

    pub async fn tally(&self, proposal_id: U256) -> LedgerResult<VoteTally> {
        self.contracts
            .governor
            .proposal_votes(self.client.as_ref(), proposal_id)
            .await
    }

    pub async fn has_voted(&self, proposal_id: U256, account: Address) -> LedgerResult<bool> {
        self.contracts
            .governor
            .has_voted(self.client.as_ref(), proposal_id, account)
            .await
    }
}

fn decode_proposal(event: &LogEvent) -> Option<Proposal> {
    let decoded = (|| {
        LedgerResult::Ok(Proposal {
            proposal_id: event.arg("proposalId")?.as_uint()?,
            proposer: event.arg("proposer")?.as_address()?,
            vote_start: event.arg("voteStart")?.as_u64()?,
            vote_end: event.arg("voteEnd")?.as_u64()?,
            title: proposal_title(event.arg("description")?.as_text()?),
            state: ProposalState::Pending,
        })
    })();

    match decoded {
        Ok(proposal) => Some(proposal),
        Err(e) => {
            warn!(
                block = event.block_number,
                tx = %event.transaction_hash,
                error = %e,
                "Skipping undecodable ProposalCreated event"
            );
            None
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
