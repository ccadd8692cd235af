// ABOUTME: Destroy action: tears stacks down, dependents before their dependencies.
// ABOUTME: Without force it only prints the plan; protected stacks are never destroyed.

use async_trait::async_trait;
use snafu::ResultExt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::error::ProviderSnafu;
use super::{ActionEnv, ActionError, RunOptions, build_graph, emit_warnings, run_plan};
use crate::diagnostics::{Diagnostics, Warning};
use crate::error::Result;
use crate::hooks::HookStage;
use crate::plan::{Plan, StackAction};
use crate::provider::{DestroyOutcome, Provider};
use crate::stack::Stack;
use crate::status::{SkipReason, Status};
use crate::walker::RunSummary;

pub const DESCRIPTION: &str = "Destroy stacks";

pub struct DestroyAction {
    provider: Arc<dyn Provider>,
}

impl DestroyAction {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl StackAction for DestroyAction {
    async fn run(
        &self,
        stack: &Arc<Stack>,
        cancel: &CancellationToken,
    ) -> std::result::Result<Status, ActionError> {
        if cancel.is_cancelled() {
            return Ok(Status::Interrupted);
        }
        if stack.is_protected() {
            tracing::info!(stack = %stack.name(), "stack is protected, not destroying");
            return Ok(Status::NotSubmitted("protected".into()));
        }
        if !stack.is_enabled() {
            return Ok(Status::NotSubmitted("disabled".into()));
        }

        let outcome = self
            .provider
            .destroy(stack.fqn())
            .await
            .context(ProviderSnafu { fqn: stack.fqn() })?;

        match outcome {
            DestroyOutcome::Destroyed => {
                tracing::info!(stack = %stack.name(), fqn = %stack.fqn(), "stack destroyed");
                Ok(Status::Complete)
            }
            DestroyOutcome::NotFound => {
                tracing::debug!(stack = %stack.name(), "stack does not exist");
                Ok(Status::Skipped(SkipReason::StackDoesNotExist))
            }
        }
    }
}

/// Destroy every targeted stack and its dependents.
///
/// Without `force` the plan is only outlined.
pub async fn destroy(env: &ActionEnv, options: &RunOptions) -> Result<RunSummary> {
    let mut output = env.output.clone();
    output.start_timer();
    let mut diagnostics = Diagnostics::default();

    env.validate_hooks(&[HookStage::PreDestroy, HookStage::PostDestroy])?;

    let graph = build_graph(&env.context, &options.targets, true)?;
    let action = Arc::new(DestroyAction::new(Arc::clone(&env.provider)));
    let plan = Plan::new(DESCRIPTION, graph, env.context.stacks(), action)?;

    if !options.force || options.dry_run {
        if !options.force {
            diagnostics.warn(Warning::destroy_not_forced());
        }
        let outline = RunOptions {
            dry_run: true,
            ..options.clone()
        };
        let summary = run_plan(env, &plan, &outline, &mut diagnostics).await?;
        emit_warnings(&output, &diagnostics);
        return Ok(summary);
    }

    env.run_hooks(HookStage::PreDestroy, &mut diagnostics).await?;
    output.progress(&format!("Destroying stacks in {}", env.context.namespace()));

    let summary = match run_plan(env, &plan, options, &mut diagnostics).await {
        Ok(summary) => summary,
        Err(e) => {
            emit_warnings(&output, &diagnostics);
            return Err(e);
        }
    };

    env.run_hooks(HookStage::PostDestroy, &mut diagnostics).await?;
    emit_warnings(&output, &diagnostics);
    output.success("Destroy complete");
    Ok(summary)
}
