// ABOUTME: Concurrency-bounded scheduler that runs a plan's action over its graph.
// ABOUTME: Releases stacks once dependencies finish and propagates failure and cancellation.

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::plan::Plan;
use crate::status::{SkipReason, Status, StatusError, StatusTable};
use crate::types::StackName;

#[derive(Debug, thiserror::Error)]
pub enum WalkError {
    #[error(transparent)]
    Status(#[from] StatusError),

    #[error("stack {0} is in the plan graph but has no stack definition")]
    UnknownStack(StackName),

    #[error("walk stalled with stacks still pending: {}", .pending.iter().map(StackName::as_str).collect::<Vec<_>>().join(", "))]
    Stalled { pending: Vec<StackName> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryEntry {
    pub stack: StackName,
    pub fqn: String,
    pub status: Status,
}

/// Final status of every stack in a run, in plan order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    entries: Vec<SummaryEntry>,
}

impl RunSummary {
    pub fn entries(&self) -> &[SummaryEntry] {
        &self.entries
    }

    pub fn status(&self, stack: &StackName) -> Option<&Status> {
        self.entries
            .iter()
            .find(|entry| &entry.stack == stack)
            .map(|entry| &entry.status)
    }

    pub fn failed(&self) -> Vec<StackName> {
        self.matching(|status| matches!(status, Status::Failed(_)))
    }

    pub fn interrupted(&self) -> Vec<StackName> {
        self.matching(Status::is_interrupted)
    }

    pub fn is_success(&self) -> bool {
        self.entries
            .iter()
            .all(|entry| !entry.status.is_failure() && !entry.status.is_interrupted())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn matching(&self, predicate: impl Fn(&Status) -> bool) -> Vec<StackName> {
        self.entries
            .iter()
            .filter(|entry| predicate(&entry.status))
            .map(|entry| entry.stack.clone())
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Walker {
    concurrency: usize,
    cancel: CancellationToken,
}

impl Walker {
    /// `0` runs every eligible stack at once; `1` is strictly serial.
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    fn has_capacity(&self, in_flight: usize) -> bool {
        self.concurrency == 0 || in_flight < self.concurrency
    }

    pub async fn walk(&self, plan: &Plan) -> Result<RunSummary, WalkError> {
        let order = plan.keys();
        let table = StatusTable::new(&order);
        let mut pending = order.clone();
        let mut in_flight = FuturesUnordered::new();

        loop {
            let mut waiting = Vec::with_capacity(pending.len());

            for name in pending {
                let dependencies: Vec<(&StackName, Status)> = plan
                    .graph()
                    .dependencies(&name)
                    .filter_map(|dep| table.get(dep).map(|status| (dep, status)))
                    .collect();

                if !dependencies.iter().all(|(_, status)| status.is_terminal()) {
                    waiting.push(name);
                    continue;
                }

                if let Some((failed, _)) = dependencies.iter().find(|(_, s)| s.is_failure()) {
                    tracing::warn!(stack = %name, dependency = %failed, "skipping, dependency failed");
                    table.transition(
                        &name,
                        Status::Skipped(SkipReason::DependencyFailed((*failed).clone())),
                    )?;
                    continue;
                }

                if self.cancel.is_cancelled()
                    || dependencies.iter().any(|(_, s)| s.is_interrupted())
                {
                    tracing::debug!(stack = %name, "interrupted before submission");
                    table.transition(&name, Status::Interrupted)?;
                    continue;
                }

                if !self.has_capacity(in_flight.len()) {
                    waiting.push(name);
                    continue;
                }

                let stack = plan
                    .stack(&name)
                    .cloned()
                    .ok_or_else(|| WalkError::UnknownStack(name.clone()))?;
                table.transition(&name, Status::Submitted)?;
                tracing::debug!(stack = %name, "submitted");

                let action = Arc::clone(plan.action());
                let cancel = self.cancel.clone();
                in_flight.push(async move {
                    let result = action.run(&stack, &cancel).await;
                    (stack, result)
                });
            }

            pending = waiting;

            let Some((stack, result)) = in_flight.next().await else {
                if pending.is_empty() {
                    break;
                }
                return Err(WalkError::Stalled { pending });
            };

            let status = match result {
                Ok(status) if status.is_terminal() => status,
                Ok(status) => Status::Failed(format!("action returned non-terminal status {status}")),
                Err(e) => {
                    tracing::error!(stack = %stack.name(), error = %e, "stack action failed");
                    Status::Failed(e.to_string())
                }
            };
            tracing::info!(stack = %stack.name(), status = %status, "finished");
            table.transition(stack.name(), status)?;
        }

        let statuses = table.snapshot();
        let entries = order
            .into_iter()
            .filter_map(|name| {
                let status = statuses.get(&name)?.clone();
                let fqn = plan
                    .stack(&name)
                    .map_or_else(|| name.to_string(), |s| s.fqn().to_string());
                Some(SummaryEntry {
                    stack: name,
                    fqn,
                    status,
                })
            })
            .collect();

        Ok(RunSummary { entries })
    }
}
