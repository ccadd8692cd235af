// ABOUTME: Pluggable handlers for `${type input}` lookups, keyed by type.
// ABOUTME: The registry validates lookup types up front and dispatches at resolution time.

mod env;
mod hook_data;
mod output;
mod xref;

pub use env::{DefaultLookup, EnvVarLookup};
pub use hook_data::HookDataLookup;
pub use output::{OutputLookup, parse_output_reference};
pub use xref::XrefLookup;

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::context::Context;
use crate::provider::{Provider, ProviderError};
use crate::types::StackName;
use crate::variables::{Lookup, VariableValue};

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("unknown lookup type: {0}")]
    UnknownType(String),

    #[error("invalid input for {kind} lookup '{input}': {reason}")]
    InvalidInput {
        kind: String,
        input: String,
        reason: String,
    },

    #[error("stack {0} is not defined in this config")]
    UnknownStack(StackName),

    #[error("stack {0} does not exist")]
    StackDoesNotExist(String),

    #[error("output {output} does not exist on stack {stack}")]
    OutputDoesNotExist { stack: String, output: String },

    #[error("environment variable {0} is not set")]
    MissingEnvironmentVariable(String),

    #[error("no hook data stored under {0}")]
    MissingHookData(String),

    #[error("hook data {key} has no field {field}")]
    MissingHookField { key: String, field: String },

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// What a handler can see while evaluating a lookup.
#[derive(Clone, Copy)]
pub struct LookupContext<'a> {
    pub context: &'a Context,
    pub provider: &'a dyn Provider,
}

impl<'a> LookupContext<'a> {
    pub fn new(context: &'a Context, provider: &'a dyn Provider) -> Self {
        Self { context, provider }
    }
}

#[async_trait]
pub trait LookupHandler: Send + Sync {
    async fn handle(
        &self,
        input: &str,
        ctx: &LookupContext<'_>,
    ) -> Result<VariableValue, LookupError>;
}

#[derive(Clone, Default)]
pub struct LookupRegistry {
    handlers: HashMap<String, Arc<dyn LookupHandler>>,
}

impl LookupRegistry {
    /// An empty registry with no handlers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the `output`, `xref`, `envvar`, `default` and `hook_data` handlers.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(output::KIND, OutputLookup);
        registry.register(xref::KIND, XrefLookup);
        registry.register(env::ENVVAR_KIND, EnvVarLookup);
        registry.register(env::DEFAULT_KIND, DefaultLookup);
        registry.register(hook_data::KIND, HookDataLookup);
        registry
    }

    /// Register a handler, replacing any previous handler for `kind`.
    pub fn register(&mut self, kind: &str, handler: impl LookupHandler + 'static) {
        self.handlers.insert(kind.to_string(), Arc::new(handler));
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.handlers.contains_key(kind)
    }

    pub fn validate(&self, lookup: &Lookup) -> Result<(), LookupError> {
        if self.contains(&lookup.kind) {
            Ok(())
        } else {
            Err(LookupError::UnknownType(lookup.kind.clone()))
        }
    }

    pub async fn resolve(
        &self,
        lookup: &Lookup,
        ctx: &LookupContext<'_>,
    ) -> Result<VariableValue, LookupError> {
        let handler = self
            .handlers
            .get(&lookup.kind)
            .ok_or_else(|| LookupError::UnknownType(lookup.kind.clone()))?;
        tracing::debug!(lookup = %lookup, "evaluating lookup");
        handler.handle(&lookup.input, ctx).await
    }
}

impl fmt::Debug for LookupRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<&String> = self.handlers.keys().collect();
        kinds.sort();
        f.debug_struct("LookupRegistry").field("kinds", &kinds).finish()
    }
}

/// Split `left::right` on the first separator.
pub(crate) fn split_pair<'a>(kind: &str, input: &'a str) -> Result<(&'a str, &'a str), LookupError> {
    input
        .split_once("::")
        .map(|(left, right)| (left.trim(), right.trim()))
        .ok_or_else(|| LookupError::InvalidInput {
            kind: kind.to_string(),
            input: input.to_string(),
            reason: "expected <name>::<value>".to_string(),
        })
}
