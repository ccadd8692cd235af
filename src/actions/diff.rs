// ABOUTME: Diff action: compares deployed stack parameters and outputs against the config.
// ABOUTME: Never changes a stack; previews outputs so dependents can be diffed too.

use async_trait::async_trait;
use snafu::ResultExt;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::error::ProviderSnafu;
use super::{ActionEnv, ActionError, RunOptions, build_graph, emit_warnings, prepare_stack, run_plan};
use crate::context::Context;
use crate::diagnostics::Diagnostics;
use crate::diff::{diff_mappings, diff_parameters, format_params_diff};
use crate::error::Result;
use crate::output::Output;
use crate::plan::{Plan, StackAction};
use crate::provider::{ChangeOutcome, Provider, StackLookup};
use crate::stack::Stack;
use crate::status::Status;
use crate::walker::RunSummary;

pub const DESCRIPTION: &str = "Diff stacks";

pub struct DiffAction {
    context: Arc<Context>,
    provider: Arc<dyn Provider>,
    output: Output,
}

impl DiffAction {
    pub fn new(context: Arc<Context>, provider: Arc<dyn Provider>, output: Output) -> Self {
        Self {
            context,
            provider,
            output,
        }
    }

    fn report_outputs(
        &self,
        stack: &Stack,
        old: &BTreeMap<String, String>,
        new: &BTreeMap<String, String>,
    ) {
        let (changes, entries) = diff_mappings(old, new);
        if changes == 0 {
            return;
        }
        let mut lines = vec![
            "--- Old Outputs".to_string(),
            "+++ New Outputs".to_string(),
            "******************".to_string(),
        ];
        lines.extend(entries.iter().flat_map(|entry| entry.changes()));
        self.output.report(stack.fqn(), &lines.join("\n"));
    }
}

#[async_trait]
impl StackAction for DiffAction {
    async fn run(
        &self,
        stack: &Arc<Stack>,
        cancel: &CancellationToken,
    ) -> std::result::Result<Status, ActionError> {
        if cancel.is_cancelled() {
            return Ok(Status::Interrupted);
        }
        if !stack.is_enabled() {
            return Ok(Status::NotSubmitted("disabled".into()));
        }

        let existing = self
            .provider
            .get_stack(stack.fqn())
            .await
            .context(ProviderSnafu { fqn: stack.fqn() })?;

        if stack.is_locked() {
            if let StackLookup::Found(description) = existing {
                stack.set_outputs(description.outputs)?;
            }
            return Ok(Status::NotUpdated("locked".into()));
        }

        let (old_parameters, old_outputs) = match existing {
            StackLookup::Found(description) => (description.parameters, description.outputs),
            StackLookup::NotFound => {
                self.output
                    .report(stack.fqn(), &format!("{}: new stack", stack.fqn()));
                (BTreeMap::new(), BTreeMap::new())
            }
        };

        let prepared = prepare_stack(&self.context, self.provider.as_ref(), stack).await?;

        let entries = diff_parameters(&old_parameters, &prepared.parameters);
        if !entries.is_empty() {
            self.output.report(stack.fqn(), &format_params_diff(&entries));
        }

        let outcome = self
            .provider
            .get_stack_changes(prepared.request(stack))
            .await
            .context(ProviderSnafu { fqn: stack.fqn() })?;

        if let ChangeOutcome::Unchanged { .. } = outcome {
            tracing::info!(stack = %stack.name(), "No changes: {}", stack.fqn());
        } else {
            self.report_outputs(stack, &old_outputs, outcome.outputs());
        }

        stack.set_outputs(outcome.into_outputs())?;
        Ok(Status::Complete)
    }
}

/// Diff every targeted stack. Hooks never run.
pub async fn diff(env: &ActionEnv, options: &RunOptions) -> Result<RunSummary> {
    let mut diagnostics = Diagnostics::default();

    let graph = build_graph(&env.context, &options.targets, false)?;
    let action = Arc::new(DiffAction::new(
        Arc::clone(&env.context),
        Arc::clone(&env.provider),
        env.output.clone(),
    ));
    let plan = Plan::new(DESCRIPTION, graph, env.context.stacks(), action)?;
    env.context.reset_outputs();

    if !options.dry_run && !plan.is_empty() {
        let fqns: Vec<&str> = plan
            .keys()
            .iter()
            .filter_map(|name| plan.stack(name))
            .map(|stack| stack.fqn())
            .collect();
        tracing::info!("Diffing stacks: {}", fqns.join(", "));
    }

    let result = run_plan(env, &plan, options, &mut diagnostics).await;
    emit_warnings(&env.output, &diagnostics);
    result
}
