// ABOUTME: Build, diff, destroy and info actions over the stacks of one context.
// ABOUTME: Shares plan construction, stack preparation and the run loop between actions.

mod build;
mod destroy;
mod diff;
pub mod error;
mod info;

pub use build::{BuildAction, build};
pub use destroy::{DestroyAction, destroy};
pub use diff::{DiffAction, diff};
pub use error::{ActionError, ActionErrorKind};
pub use info::info;

use snafu::ResultExt;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::blueprint::Template;
use crate::context::Context;
use crate::diagnostics::{Diagnostics, Warning};
use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::hooks::{HookRegistry, HookStage, StageHooks, handle_hooks};
use crate::lookups::LookupContext;
use crate::output::Output;
use crate::plan::Plan;
use crate::provider::{ChangeRequest, Provider};
use crate::stack::Stack;
use crate::types::StackName;
use crate::walker::{RunSummary, Walker};
use error::{RenderSnafu, ResolveSnafu, VariablesSnafu};

/// Everything an action needs besides its options.
#[derive(Clone)]
pub struct ActionEnv {
    pub context: Arc<Context>,
    pub provider: Arc<dyn Provider>,
    pub output: Output,
    pub hooks: StageHooks,
    pub hook_registry: HookRegistry,
}

impl ActionEnv {
    pub fn new(context: Context, provider: Arc<dyn Provider>, output: Output) -> Self {
        Self {
            context: Arc::new(context),
            provider,
            output,
            hooks: StageHooks::new(),
            hook_registry: HookRegistry::with_builtins(),
        }
    }

    pub fn with_hooks(mut self, hooks: StageHooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_hook_registry(mut self, registry: HookRegistry) -> Self {
        self.hook_registry = registry;
        self
    }

    /// Reject unknown hook paths before anything runs.
    fn validate_hooks(&self, stages: &[HookStage]) -> Result<()> {
        for stage in stages {
            self.hook_registry.validate(*stage, self.hooks.get(*stage))?;
        }
        Ok(())
    }

    async fn run_hooks(&self, stage: HookStage, diagnostics: &mut Diagnostics) -> Result<()> {
        handle_hooks(
            stage,
            self.hooks.get(stage),
            &self.hook_registry,
            &self.context,
            self.provider.as_ref(),
            diagnostics,
        )
        .await?;
        Ok(())
    }
}

impl std::fmt::Debug for ActionEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionEnv")
            .field("namespace", &self.context.namespace())
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

/// Options shared by build, diff and destroy.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// `0` is unbounded.
    pub concurrency: usize,
    /// Restrict the run to these stacks and what they need; empty means all.
    pub targets: Vec<StackName>,
    /// Only print the plan outline.
    pub dry_run: bool,
    /// Required for destroy to do anything.
    pub force: bool,
    pub cancel: CancellationToken,
}

/// Inputs for one provider call, derived from a stack's resolved variables.
#[derive(Debug)]
pub(crate) struct PreparedStack {
    pub template: Template,
    pub parameters: BTreeMap<String, String>,
    pub tags: BTreeMap<String, String>,
}

impl PreparedStack {
    pub fn request<'a>(&'a self, stack: &'a Stack) -> ChangeRequest<'a> {
        ChangeRequest {
            fqn: stack.fqn(),
            template: &self.template,
            parameters: &self.parameters,
            tags: &self.tags,
        }
    }
}

/// Resolve, validate and render one stack.
pub(crate) async fn prepare_stack(
    context: &Context,
    provider: &dyn Provider,
    stack: &Stack,
) -> std::result::Result<PreparedStack, ActionError> {
    let lookup_ctx = LookupContext::new(context, provider);
    let variables = stack
        .resolve_variables(context.lookups(), &lookup_ctx)
        .await
        .context(VariablesSnafu {
            stack: stack.name().clone(),
        })?;

    let blueprint = stack.blueprint();
    let resolved = blueprint
        .resolve_variables(&variables)
        .context(ResolveSnafu {
            stack: stack.name().clone(),
            blueprint: blueprint.name(),
        })?;
    let template = blueprint.render(&resolved).context(RenderSnafu {
        blueprint: blueprint.name(),
    })?;

    Ok(PreparedStack {
        parameters: resolved.parameter_values(),
        tags: context.stack_tags(stack),
        template,
    })
}

/// Dependency graph for a run, restricted to `targets` when any are given.
///
/// `reverse` transposes the graph so dependents run first.
pub fn build_graph(context: &Context, targets: &[StackName], reverse: bool) -> Result<Graph> {
    if let Some(unknown) = targets.iter().find(|name| context.stack(name).is_none()) {
        return Err(Error::UnknownStack(unknown.to_string()));
    }

    let graph = Graph::from_stacks(context.stacks())?;
    let graph = if reverse { graph.transposed() } else { graph };

    if targets.is_empty() {
        return Ok(graph);
    }
    Ok(graph.filtered(|name| targets.contains(name)))
}

/// Outline or execute a plan, then turn failed or interrupted stacks into an error.
pub(crate) async fn run_plan(
    env: &ActionEnv,
    plan: &Plan,
    options: &RunOptions,
    diagnostics: &mut Diagnostics,
) -> Result<RunSummary> {
    if plan.is_empty() {
        tracing::warn!("No stacks detected (error in config?)");
        diagnostics.warn(Warning::no_stacks_detected());
        return Ok(RunSummary::default());
    }

    if options.dry_run {
        for line in plan.outline_lines() {
            env.output.progress(&line);
        }
        return Ok(RunSummary::default());
    }

    plan.outline(tracing::Level::DEBUG);
    let walker = Walker::new(options.concurrency).with_cancellation(options.cancel.clone());
    let summary = plan.execute(&walker).await?;
    env.output.summary(&summary);

    let failed = summary.failed();
    if !failed.is_empty() {
        return Err(Error::PlanFailed(failed));
    }
    let interrupted = summary.interrupted();
    if !interrupted.is_empty() {
        return Err(Error::Interrupted(interrupted));
    }
    Ok(summary)
}

fn emit_warnings(output: &Output, diagnostics: &Diagnostics) {
    for warning in diagnostics.warnings() {
        output.warning(&warning.message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blueprint::ConfigBlueprint;

    fn stack(name: &str, requires: &[&str]) -> Stack {
        let mut stack = Stack::new(
            StackName::new(name).unwrap(),
            "acme",
            Arc::new(ConfigBlueprint::new(name)),
        );
        for r in requires {
            stack = stack.with_requires(StackName::new(r).unwrap());
        }
        stack
    }

    fn context() -> Context {
        Context::new("acme")
            .with_stack(stack("vpc", &[]))
            .with_stack(stack("db", &["vpc"]))
            .with_stack(stack("app", &["db"]))
            .with_stack(stack("cdn", &[]))
    }

    fn names(graph: &Graph) -> Vec<String> {
        graph.nodes().map(|name| name.to_string()).collect()
    }

    #[test]
    fn targets_keep_their_dependencies() {
        let graph = build_graph(&context(), &[StackName::new("db").unwrap()], false).unwrap();
        assert_eq!(names(&graph), vec!["db", "vpc"]);
    }

    #[test]
    fn reversed_targets_keep_their_dependents() {
        let graph = build_graph(&context(), &[StackName::new("db").unwrap()], true).unwrap();
        assert_eq!(names(&graph), vec!["app", "db"]);
        assert_eq!(
            graph.topological_order().unwrap(),
            vec![StackName::new("app").unwrap(), StackName::new("db").unwrap()]
        );
    }

    #[test]
    fn unknown_target_is_rejected() {
        let err = build_graph(&context(), &[StackName::new("nope").unwrap()], false).unwrap_err();
        assert!(matches!(err, Error::UnknownStack(name) if name == "nope"));
    }
}
