//! # Interactive Session
//!
//! Manual operator actions while automation is paused: voting on active
//! treasury proposals and changing commission rates. Each call to
//! [`InteractiveCollaborator::handle`] presents the top-level menu once; the
//! core keeps calling it for as long as the controller stays interactive.
//!
//! Execution failures are reported to the operator and never end the
//! session. Only console failures (closed input) propagate.

use alloy_primitives::U256;
use async_trait::async_trait;
use tracing::{info, warn};

use crate::constants::VoteSupport;
use crate::error::Result;
use crate::governance::{describe_tally, Governance, Proposal};
use crate::operator::commission::{parse_percentage, CommissionRates};
use crate::operator::console::OperatorConsole;
use crate::orchestration::{Action, ActionExecutor, InteractiveCollaborator, SiphonContext};

const MENU_PROPOSALS: &str = "Treasury proposals";
const MENU_COMMISSION: &str = "Set commission rates";
const MENU_RESUME: &str = "Resume automation";

/// What a top-level selection leads to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuEntry {
    Proposals,
    Commission,
    Resume,
}

pub struct InteractiveSession<C> {
    console: C,
    governance: Governance,
    executor: ActionExecutor,
}

impl<C: OperatorConsole> InteractiveSession<C> {
    pub fn new(console: C, governance: Governance, executor: ActionExecutor) -> Self {
        Self {
            console,
            governance,
            executor,
        }
    }

    pub fn console(&self) -> &C {
        &self.console
    }

    pub fn into_console(self) -> C {
        self.console
    }

    fn menu(locked: bool) -> Vec<(MenuEntry, &'static str)> {
        let mut entries = vec![
            (MenuEntry::Proposals, MENU_PROPOSALS),
            (MenuEntry::Commission, MENU_COMMISSION),
        ];
        if !locked {
            entries.push((MenuEntry::Resume, MENU_RESUME));
        }
        entries
    }

    async fn treasury(&mut self, ctx: &SiphonContext) -> Result<()> {
        let proposals = match self.governance.active_proposals().await {
            Ok(proposals) => proposals,
            Err(e) => {
                warn!(error = %e, "Unable to retrieve proposals");
                return self
                    .console
                    .notify(&format!("Unable to retrieve proposals: {e}"))
                    .await;
            }
        };
        if proposals.is_empty() {
            return self.console.notify("No active proposals found.").await;
        }

        loop {
            let mut options: Vec<String> = proposals.iter().map(|p| p.title.clone()).collect();
            options.push("Back to menu".to_string());

            let choice = self
                .console
                .select("Active treasury proposals", &options)
                .await?;
            match proposals.get(choice) {
                Some(proposal) => self.proposal(ctx, proposal).await?,
                None => return Ok(()),
            }
        }
    }

    async fn proposal(&mut self, ctx: &SiphonContext, proposal: &Proposal) -> Result<()> {
        loop {
            match self.governance.tally(proposal.proposal_id).await {
                Ok(tally) => self.console.notify(&describe_tally(&tally)).await?,
                Err(e) => {
                    self.console
                        .notify(&format!("Unable to read current votes: {e}"))
                        .await?
                }
            }

            let mut can_vote = Vec::with_capacity(ctx.orchestrators.len());
            let mut options = Vec::with_capacity(ctx.orchestrators.len() + 1);
            for orchestrator in &ctx.orchestrators {
                let voted = match self
                    .governance
                    .has_voted(proposal.proposal_id, orchestrator.address())
                    .await
                {
                    Ok(voted) => voted,
                    Err(e) => {
                        warn!(orchestrator = %orchestrator.label(), error = %e, "Unable to read vote status");
                        false
                    }
                };
                can_vote.push(!voted);
                options.push(if voted {
                    format!("{} has already voted on this proposal", orchestrator.label())
                } else {
                    format!("Vote with {}", orchestrator.label())
                });
            }
            options.push("Back to proposals".to_string());

            let choice = self.console.select(&proposal.title, &options).await?;
            match can_vote.get(choice) {
                None => return Ok(()),
                Some(false) => {
                    let label = ctx.orchestrators[choice].label();
                    self.console
                        .notify(&format!("{label} has already voted on this proposal"))
                        .await?
                }
                Some(true) => self.vote(ctx, choice, proposal.proposal_id).await?,
            }
        }
    }

    async fn vote(&mut self, ctx: &SiphonContext, idx: usize, proposal_id: U256) -> Result<()> {
        let orchestrator = &ctx.orchestrators[idx];
        let label = orchestrator.label();
        let choices = [
            (VoteSupport::Abstain, "Abstain"),
            (VoteSupport::For, "Vote for the proposal"),
            (VoteSupport::Against, "Vote against the proposal"),
        ];

        loop {
            let mut options: Vec<String> = choices.iter().map(|(_, text)| text.to_string()).collect();
            options.push("Back to wallet selection".to_string());

            let choice = self
                .console
                .select(&format!("{label} wants to vote"), &options)
                .await?;
            let Some((support, _)) = choices.get(choice).copied() else {
                return Ok(());
            };

            let reason = self
                .console
                .prompt("Type in a reason or leave empty to vote without reason: ")
                .await?;
            let reason = (!reason.is_empty()).then_some(reason);
            let summary = match &reason {
                Some(reason) => format!("{label} is about to vote {support} this proposal with reason: '{reason}'"),
                None => format!("{label} is about to vote {support} this proposal without a reason"),
            };

            if !self.console.confirm(&summary).await? {
                self.console.notify("Vote aborted").await?;
                continue;
            }

            let action = Action::CastVote {
                proposal_id,
                support,
                reason,
            };
            return self.execute(ctx, idx, action).await;
        }
    }

    async fn commission(&mut self, ctx: &SiphonContext) -> Result<()> {
        let mut options: Vec<String> = ctx.orchestrators.iter().map(|o| o.label()).collect();
        options.push("Back to menu".to_string());

        let idx = self
            .console
            .select("Choose an orchestrator to set commission rates for", &options)
            .await?;
        let Some(orchestrator) = ctx.orchestrators.get(idx) else {
            return Ok(());
        };
        let label = orchestrator.label();
        self.console
            .notify(&format!("Setting commission rates for {label}"))
            .await?;

        let reward_percent = self
            .read_percentage("Enter % of rewards to keep (e.g., 30 or 11.5 for 30% or 11.5%): ")
            .await?;
        let fee_percent = self
            .read_percentage("Enter % of fees to keep (e.g., 30 or 11.5 for 30% or 11.5%): ")
            .await?;

        let summary = format!(
            "{label} will keep {reward_percent}% of rewards and {fee_percent}% of fees\n\
             This means delegators will receive {}% of rewards and {}% of fees",
            100.0 - reward_percent,
            100.0 - fee_percent
        );
        if !self.console.confirm(&summary).await? {
            return self.console.notify("Transaction aborted").await;
        }

        let rates = CommissionRates::from_kept_percentages(reward_percent, fee_percent);
        let action = Action::SetCommission {
            reward_cut: rates.reward_cut,
            fee_share: rates.fee_share,
        };
        self.execute(ctx, idx, action).await
    }

    async fn read_percentage(&mut self, message: &str) -> Result<f64> {
        loop {
            let input = self.console.prompt(message).await?;
            match parse_percentage(&input) {
                Ok(value) => return Ok(value),
                Err(e) => self.console.notify(&e.to_string()).await?,
            }
        }
    }

    async fn execute(&mut self, ctx: &SiphonContext, idx: usize, action: Action) -> Result<()> {
        let orchestrator = &ctx.orchestrators[idx];
        match self.executor.execute(orchestrator, &action).await {
            Ok(receipt) => {
                self.console
                    .notify(&format!(
                        "Done: {action} (tx {}, block {})",
                        receipt.transaction_hash, receipt.block_number
                    ))
                    .await
            }
            Err(e) => self.console.notify(&format!("Failed to {action}: {e}")).await,
        }
    }
}

#[async_trait]
impl<C: OperatorConsole> InteractiveCollaborator for InteractiveSession<C> {
    async fn handle(&mut self, ctx: &mut SiphonContext) -> Result<()> {
        let menu = Self::menu(ctx.mode.is_locked());
        let options: Vec<String> = menu.iter().map(|(_, text)| text.to_string()).collect();

        let choice = self.console.select("Interactive mode", &options).await?;
        match menu.get(choice).map(|(entry, _)| *entry) {
            Some(MenuEntry::Proposals) => self.treasury(ctx).await,
            Some(MenuEntry::Commission) => self.commission(ctx).await,
            Some(MenuEntry::Resume) => {
                ctx.mode.resume()?;
                info!("Resuming automated mode");
                self.console.notify("Resuming automation").await
            }
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_menu_hides_resume_when_locked() {
        let open = InteractiveSession::<crate::operator::StdioConsole<&[u8], Vec<u8>>>::menu(false);
        assert_eq!(open.last().map(|(entry, _)| *entry), Some(MenuEntry::Resume));

        let locked = InteractiveSession::<crate::operator::StdioConsole<&[u8], Vec<u8>>>::menu(true);
        assert!(locked.iter().all(|(entry, _)| *entry != MenuEntry::Resume));
        assert_eq!(locked.len(), 2);
    }
}
