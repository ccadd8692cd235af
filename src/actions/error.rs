// ABOUTME: Per-stack action errors with SNAFU pattern.
// ABOUTME: Wraps resolution, rendering and provider failures with the stack they hit.

use snafu::Snafu;

use crate::blueprint::{BlueprintError, ResolveError};
use crate::lookups::LookupError;
use crate::provider::ProviderError;
use crate::stack::OutputsAlreadySet;
use crate::types::StackName;
use crate::variables::VariableError;

/// Failure of one stack's action. Marks that stack failed and skips its dependents.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ActionError {
    #[snafu(display("failed to resolve variables for {stack}: {source}"))]
    Variables {
        stack: StackName,
        source: VariableError,
    },

    #[snafu(display("blueprint {blueprint} rejected the variables of {stack}: {source}"))]
    Resolve {
        stack: StackName,
        blueprint: String,
        source: ResolveError,
    },

    #[snafu(display("failed to render blueprint {blueprint}: {source}"))]
    Render {
        blueprint: String,
        source: BlueprintError,
    },

    #[snafu(display("provider call for {fqn} failed: {source}"))]
    Provider { fqn: String, source: ProviderError },

    #[snafu(display("{source}"))]
    Outputs { source: OutputsAlreadySet },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionErrorKind {
    /// A required value was missing or unresolved.
    MissingValue,
    /// A lookup could not be evaluated.
    Lookup,
    /// A value failed validation or type checks.
    InvalidValue,
    /// The blueprint could not produce a template.
    Render,
    /// The provider call failed.
    Provider,
    /// The stack's outputs were recorded twice.
    Internal,
}

impl ActionError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> ActionErrorKind {
        match self {
            ActionError::Variables { source, .. } => match source {
                VariableError::FailedLookup {
                    source: LookupError::Provider(_),
                    ..
                } => ActionErrorKind::Provider,
                VariableError::FailedLookup { .. } => ActionErrorKind::Lookup,
                VariableError::Unresolved(_) => ActionErrorKind::MissingValue,
                _ => ActionErrorKind::InvalidValue,
            },
            ActionError::Resolve { source, .. } => match source {
                ResolveError::MissingVariable { .. } | ResolveError::UnresolvedVariable { .. } => {
                    ActionErrorKind::MissingValue
                }
                _ => ActionErrorKind::InvalidValue,
            },
            ActionError::Render { .. } => ActionErrorKind::Render,
            ActionError::Provider { .. } => ActionErrorKind::Provider,
            ActionError::Outputs { .. } => ActionErrorKind::Internal,
        }
    }
}

impl From<OutputsAlreadySet> for ActionError {
    fn from(source: OutputsAlreadySet) -> Self {
        ActionError::Outputs { source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_classifies_missing_variables() {
        let err = ActionError::Resolve {
            stack: StackName::new("vpc").unwrap(),
            blueprint: "vpc".into(),
            source: ResolveError::MissingVariable {
                blueprint: "vpc".into(),
                variable: "Cidr".into(),
            },
        };
        assert_eq!(err.kind(), ActionErrorKind::MissingValue);
        assert!(err.to_string().contains("Cidr"));
    }

    #[test]
    fn kind_classifies_lookup_failures() {
        let err = ActionError::Variables {
            stack: StackName::new("app").unwrap(),
            source: VariableError::FailedLookup {
                variable: "User".into(),
                lookup: "${envvar USER}".into(),
                source: LookupError::MissingEnvironmentVariable("USER".into()),
            },
        };
        assert_eq!(err.kind(), ActionErrorKind::Lookup);
    }
}
