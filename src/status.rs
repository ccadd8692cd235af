// ABOUTME: Per-stack execution status and the shared status table for one run.
// ABOUTME: Enforces monotonic transitions toward sticky terminal states.

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::types::StackName;

/// Why a stack was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum SkipReason {
    /// An upstream stack failed, directly or transitively.
    DependencyFailed(StackName),
    /// The stack was not found by the provider.
    StackDoesNotExist,
    Other(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::DependencyFailed(dep) => write!(f, "dependency {dep} has failed"),
            SkipReason::StackDoesNotExist => write!(f, "stack does not exist"),
            SkipReason::Other(reason) => write!(f, "{reason}"),
        }
    }
}

/// Execution state of one stack during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "reason")]
pub enum Status {
    Pending,
    Submitted,
    Complete,
    Skipped(SkipReason),
    Failed(String),
    NotSubmitted(String),
    NotUpdated(String),
    Interrupted,
}

impl Status {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Status::Pending | Status::Submitted)
    }

    /// Terminal states that release dependents.
    pub fn is_success(&self) -> bool {
        match self {
            Status::Complete | Status::NotSubmitted(_) | Status::NotUpdated(_) => true,
            Status::Skipped(reason) => !matches!(reason, SkipReason::DependencyFailed(_)),
            _ => false,
        }
    }

    /// Failure that must propagate to dependents as a skip.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Status::Failed(_) | Status::Skipped(SkipReason::DependencyFailed(_))
        )
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, Status::Interrupted)
    }

    /// Short machine name, e.g. `not_submitted`.
    pub fn code(&self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Submitted => "submitted",
            Status::Complete => "complete",
            Status::Skipped(_) => "skipped",
            Status::Failed(_) => "failed",
            Status::NotSubmitted(_) => "not_submitted",
            Status::NotUpdated(_) => "not_updated",
            Status::Interrupted => "interrupted",
        }
    }

    pub fn reason(&self) -> Option<String> {
        match self {
            Status::Skipped(reason) => Some(reason.to_string()),
            Status::Failed(reason) | Status::NotSubmitted(reason) | Status::NotUpdated(reason) => {
                Some(reason.clone())
            }
            _ => None,
        }
    }

    /// Check whether moving from `self` to `next` is allowed.
    pub fn can_transition_to(&self, next: &Status) -> bool {
        match self {
            Status::Pending => matches!(
                next,
                Status::Submitted
                    | Status::Skipped(_)
                    | Status::NotSubmitted(_)
                    | Status::NotUpdated(_)
                    | Status::Interrupted
            ),
            Status::Submitted => next.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = self.code().replace('_', " ");
        match self.reason() {
            Some(reason) => write!(f, "{label} ({reason})"),
            None => write!(f, "{label}"),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StatusError {
    #[error("invalid status transition for {stack}: {from} -> {to}")]
    InvalidTransition {
        stack: StackName,
        from: String,
        to: String,
    },

    #[error("stack {0} is not tracked by this run")]
    UnknownStack(StackName),
}

/// Status of every stack in a run, shared between concurrently running actions.
#[derive(Debug, Default)]
pub struct StatusTable {
    entries: Mutex<BTreeMap<StackName, Status>>,
}

impl StatusTable {
    /// Track the given stacks, all starting as pending.
    pub fn new<'a>(stacks: impl IntoIterator<Item = &'a StackName>) -> Self {
        let entries = stacks
            .into_iter()
            .map(|name| (name.clone(), Status::Pending))
            .collect();
        Self {
            entries: Mutex::new(entries),
        }
    }

    pub fn get(&self, stack: &StackName) -> Option<Status> {
        self.entries.lock().get(stack).cloned()
    }

    pub fn transition(&self, stack: &StackName, next: Status) -> Result<(), StatusError> {
        let mut entries = self.entries.lock();
        let current = entries
            .get_mut(stack)
            .ok_or_else(|| StatusError::UnknownStack(stack.clone()))?;

        if !current.can_transition_to(&next) {
            return Err(StatusError::InvalidTransition {
                stack: stack.clone(),
                from: current.to_string(),
                to: next.to_string(),
            });
        }

        tracing::debug!(stack = %stack, from = %current, to = %next, "status changed");
        *current = next;
        Ok(())
    }

    pub fn snapshot(&self) -> BTreeMap<StackName, Status> {
        self.entries.lock().clone()
    }
}
