//! # Siphon Core
//!
//! The automation loop. Each iteration checks the mode flag first:
//!
//! - `Automated`: run one policy tick, then idle in bounded slices so a
//!   pause request is honoured within one slice.
//! - `Interactive`: hand the context to the interactive collaborator until
//!   it resumes automation.
//!
//! The loop never ends on its own. It only returns when the terminate
//! signal fires or the collaborator fails fatally.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::error::Result;
use crate::ledger::{ContractSet, LedgerClient};
use crate::orchestration::action_executor::ActionExecutor;
use crate::orchestration::context::SiphonContext;
use crate::orchestration::mode_switch::{IdleOutcome, Mode};
use crate::orchestration::policy_engine::{PolicyEngine, TickReport};
use crate::orchestration::refresh_scheduler::RefreshScheduler;

/// Manual operator work performed while automation is paused
#[async_trait]
pub trait InteractiveCollaborator: Send {
    async fn handle(&mut self, ctx: &mut SiphonContext) -> Result<()>;
}

/// Why [`SiphonCore::run`] returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiphonExit {
    Terminated,
}

impl SiphonExit {
    pub fn exit_code(self) -> i32 {
        match self {
            SiphonExit::Terminated => 1,
        }
    }
}

/// Result of a single [`SiphonCore::step`]
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Ticked {
        report: TickReport,
        idle: IdleOutcome,
    },
    Interactive,
}

pub struct SiphonCore<I> {
    ctx: SiphonContext,
    engine: PolicyEngine,
    collaborator: I,
}

impl<I: InteractiveCollaborator> SiphonCore<I> {
    pub fn new(ctx: SiphonContext, engine: PolicyEngine, collaborator: I) -> Self {
        Self {
            ctx,
            engine,
            collaborator,
        }
    }

    /// Wire the scheduler and executor over one shared ledger client
    pub fn from_client(
        ctx: SiphonContext,
        client: Arc<dyn LedgerClient>,
        contracts: ContractSet,
        collaborator: I,
    ) -> Self {
        let settings = &ctx.settings;
        let scheduler = RefreshScheduler::new(
            client.clone(),
            contracts,
            settings.ttls,
            settings.thresholds.eth_warn,
        );
        let executor = ActionExecutor::new(client, contracts);
        let engine = PolicyEngine::new(scheduler, executor);
        Self::new(ctx, engine, collaborator)
    }

    pub fn context(&self) -> &SiphonContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut SiphonContext {
        &mut self.ctx
    }

    pub fn engine(&self) -> &PolicyEngine {
        &self.engine
    }

    pub fn into_parts(self) -> (SiphonContext, I) {
        (self.ctx, self.collaborator)
    }

    /// One loop iteration
    pub async fn step(&mut self) -> Result<StepOutcome> {
        match self.ctx.mode.mode() {
            Mode::Interactive => {
                self.collaborator.handle(&mut self.ctx).await?;
                Ok(StepOutcome::Interactive)
            }
            Mode::Automated => {
                let report = self.engine.tick(&mut self.ctx).await;
                let settings = &self.ctx.settings;
                let idle = self
                    .ctx
                    .mode
                    .idle_sleep(settings.idle_wait, settings.idle_slice)
                    .await;
                if let IdleOutcome::Interrupted { remaining } = idle {
                    info!(
                        remaining_secs = remaining.as_secs_f64(),
                        "Idle wait interrupted, switching to interactive mode"
                    );
                }
                Ok(StepOutcome::Ticked { report, idle })
            }
        }
    }

    async fn run_forever(&mut self) -> Result<()> {
        loop {
            if let Err(e) = self.step().await {
                if e.is_fatal() {
                    return Err(e);
                }
                warn!(error = %e, "Loop iteration failed, continuing");
            }
        }
    }

    /// Run until terminated
    pub async fn run(&mut self) -> Result<SiphonExit> {
        info!(
            orchestrators = self.ctx.orchestrators.len(),
            locked = self.ctx.mode.is_locked(),
            "🚀 Starting automation loop"
        );

        let mode = self.ctx.mode.clone();
        tokio::select! {
            _ = mode.terminated() => {
                info!("🛑 Terminate requested, exiting");
                Ok(SiphonExit::Terminated)
            }
            result = self.run_forever() => {
                if let Err(e) = &result {
                    error!(error = %e, "Automation loop stopped");
                }
                result.map(|()| SiphonExit::Terminated)
            }
        }
    }
}
