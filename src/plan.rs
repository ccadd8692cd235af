// ABOUTME: Binds a dependency graph to one per-stack action.
// ABOUTME: Can outline its ordering without running anything, or execute through a walker.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::Level;

use crate::actions::ActionError;
use crate::graph::{Graph, GraphError};
use crate::stack::Stack;
use crate::status::Status;
use crate::types::StackName;
use crate::walker::{RunSummary, WalkError, Walker};

/// The operation a plan applies to every stack.
///
/// Implementations check `cancel` on entry. Returning an error marks the stack
/// failed; the returned status must be terminal.
#[async_trait]
pub trait StackAction: Send + Sync {
    async fn run(
        &self,
        stack: &Arc<Stack>,
        cancel: &CancellationToken,
    ) -> Result<Status, ActionError>;
}

pub struct Plan {
    description: String,
    graph: Graph,
    steps: Vec<Vec<StackName>>,
    stacks: BTreeMap<StackName, Arc<Stack>>,
    action: Arc<dyn StackAction>,
}

impl Plan {
    /// Every graph node must have a matching stack.
    pub fn new(
        description: impl Into<String>,
        graph: Graph,
        stacks: &[Arc<Stack>],
        action: Arc<dyn StackAction>,
    ) -> Result<Self, GraphError> {
        let steps = graph.topological_steps().collect::<Result<Vec<_>, _>>()?;

        let stacks = graph
            .nodes()
            .map(|name| {
                stacks
                    .iter()
                    .find(|stack| stack.name() == name)
                    .map(|stack| (name.clone(), Arc::clone(stack)))
                    .ok_or_else(|| GraphError::UnknownNode(name.clone()))
            })
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        Ok(Self {
            description: description.into(),
            graph,
            steps,
            stacks,
            action,
        })
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn action(&self) -> &Arc<dyn StackAction> {
        &self.action
    }

    pub fn stack(&self, name: &StackName) -> Option<&Arc<Stack>> {
        self.stacks.get(name)
    }

    /// Layers in execution order.
    pub fn steps(&self) -> &[Vec<StackName>] {
        &self.steps
    }

    /// Stack names in execution order.
    pub fn keys(&self) -> Vec<StackName> {
        self.steps.iter().flatten().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.stacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stacks.is_empty()
    }

    pub fn outline_lines(&self) -> Vec<String> {
        let mut lines = vec![format!("Plan \"{}\":", self.description)];
        for (index, step) in self.steps.iter().enumerate() {
            for name in step {
                let fqn = self.stacks.get(name).map_or(name.as_str(), |s| s.fqn());
                lines.push(format!("  - step {}: {fqn}", index + 1));
            }
        }
        lines
    }

    /// Log the execution order at `level` without running anything.
    pub fn outline(&self, level: Level) {
        for line in self.outline_lines() {
            match level {
                Level::ERROR => tracing::error!("{line}"),
                Level::WARN => tracing::warn!("{line}"),
                Level::INFO => tracing::info!("{line}"),
                Level::DEBUG => tracing::debug!("{line}"),
                Level::TRACE => tracing::trace!("{line}"),
            }
        }
    }

    pub async fn execute(&self, walker: &Walker) -> Result<RunSummary, WalkError> {
        walker.walk(self).await
    }
}

impl std::fmt::Debug for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plan")
            .field("description", &self.description)
            .field("steps", &self.steps)
            .finish_non_exhaustive()
    }
}
