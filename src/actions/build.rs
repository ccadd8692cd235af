// ABOUTME: Build action: creates or updates every stack in dependency order.
// ABOUTME: Runs pre_build hooks first and post_build hooks after a successful plan.

use async_trait::async_trait;
use snafu::ResultExt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::error::ProviderSnafu;
use super::{ActionEnv, ActionError, RunOptions, build_graph, emit_warnings, prepare_stack, run_plan};
use crate::context::Context;
use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::hooks::HookStage;
use crate::plan::{Plan, StackAction};
use crate::provider::{Provider, StackLookup};
use crate::stack::Stack;
use crate::status::Status;
use crate::walker::RunSummary;

pub const DESCRIPTION: &str = "Create/Update stacks";

/// Creates or updates one stack and records its outputs for dependents.
pub struct BuildAction {
    context: Arc<Context>,
    provider: Arc<dyn Provider>,
}

impl BuildAction {
    pub fn new(context: Arc<Context>, provider: Arc<dyn Provider>) -> Self {
        Self { context, provider }
    }
}

#[async_trait]
impl StackAction for BuildAction {
    async fn run(
        &self,
        stack: &Arc<Stack>,
        cancel: &CancellationToken,
    ) -> std::result::Result<Status, ActionError> {
        if cancel.is_cancelled() {
            return Ok(Status::Interrupted);
        }
        if !stack.is_enabled() {
            tracing::debug!(stack = %stack.name(), "stack is disabled, not submitting");
            return Ok(Status::NotSubmitted("disabled".into()));
        }

        let existing = self
            .provider
            .get_stack(stack.fqn())
            .await
            .context(ProviderSnafu { fqn: stack.fqn() })?;

        // A locked stack is still created when it does not exist yet.
        if stack.is_locked()
            && let StackLookup::Found(description) = existing
        {
            tracing::debug!(stack = %stack.name(), "stack is locked, reading outputs only");
            stack.set_outputs(description.outputs)?;
            return Ok(Status::NotUpdated("locked".into()));
        }

        let prepared = prepare_stack(&self.context, self.provider.as_ref(), stack).await?;
        tracing::debug!(
            stack = %stack.name(),
            version = %prepared.template.version,
            "submitting template"
        );

        let outcome = self
            .provider
            .create_or_update(prepared.request(stack))
            .await
            .context(ProviderSnafu { fqn: stack.fqn() })?;

        let changed = outcome.is_changed();
        stack.set_outputs(outcome.into_outputs())?;

        if changed {
            tracing::info!(stack = %stack.name(), fqn = %stack.fqn(), "stack created/updated");
            Ok(Status::Complete)
        } else {
            tracing::info!(stack = %stack.name(), fqn = %stack.fqn(), "no changes");
            Ok(Status::NotUpdated("nochange".into()))
        }
    }
}

/// Build every targeted stack between the pre and post build hooks.
pub async fn build(env: &ActionEnv, options: &RunOptions) -> Result<RunSummary> {
    let mut output = env.output.clone();
    output.start_timer();
    let mut diagnostics = Diagnostics::default();

    env.validate_hooks(&[HookStage::PreBuild, HookStage::PostBuild])?;

    let graph = build_graph(&env.context, &options.targets, false)?;
    let action = Arc::new(BuildAction::new(
        Arc::clone(&env.context),
        Arc::clone(&env.provider),
    ));
    let plan = Plan::new(DESCRIPTION, graph, env.context.stacks(), action)?;
    env.context.reset_outputs();

    if options.dry_run {
        let summary = run_plan(env, &plan, options, &mut diagnostics).await?;
        emit_warnings(&output, &diagnostics);
        return Ok(summary);
    }

    env.run_hooks(HookStage::PreBuild, &mut diagnostics).await?;
    output.progress(&format!("Building stacks in {}", env.context.namespace()));

    let result = run_plan(env, &plan, options, &mut diagnostics).await;
    let summary = match result {
        Ok(summary) => summary,
        Err(e) => {
            emit_warnings(&output, &diagnostics);
            return Err(e);
        }
    };

    env.run_hooks(HookStage::PostBuild, &mut diagnostics).await?;
    emit_warnings(&output, &diagnostics);
    output.success("Build complete");
    Ok(summary)
}
