// ABOUTME: Hooks run before and after build and destroy, looked up in a registry by path.
// ABOUTME: Required hooks abort the run on failure; optional ones only warn.

mod command;

pub use command::CommandHook;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::blueprint::BoxError;
use crate::context::Context;
use crate::diagnostics::{Diagnostics, Warning};
use crate::provider::Provider;

/// Points in a run where hooks execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookStage {
    PreBuild,
    PostBuild,
    PreDestroy,
    PostDestroy,
}

impl HookStage {
    pub fn name(&self) -> &'static str {
        match self {
            HookStage::PreBuild => "pre_build",
            HookStage::PostBuild => "post_build",
            HookStage::PreDestroy => "pre_destroy",
            HookStage::PostDestroy => "post_destroy",
        }
    }
}

impl fmt::Display for HookStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

fn default_true() -> bool {
    true
}

/// A hook as declared in config.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HookDefinition {
    /// Registry identifier of the hook.
    pub path: String,
    /// Where a mapping result is stored for `hook_data` lookups.
    #[serde(default)]
    pub data_key: Option<String>,
    #[serde(default = "default_true")]
    pub required: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub args: Map<String, Value>,
}

impl HookDefinition {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            data_key: None,
            required: true,
            enabled: true,
            args: Map::new(),
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn with_data_key(mut self, key: impl Into<String>) -> Self {
        self.data_key = Some(key.into());
        self
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }
}

/// Hook definitions for every stage of a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageHooks {
    pre_build: Vec<HookDefinition>,
    post_build: Vec<HookDefinition>,
    pre_destroy: Vec<HookDefinition>,
    post_destroy: Vec<HookDefinition>,
}

impl StageHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, stage: HookStage, hooks: Vec<HookDefinition>) -> Self {
        *self.slot(stage) = hooks;
        self
    }

    pub fn get(&self, stage: HookStage) -> &[HookDefinition] {
        match stage {
            HookStage::PreBuild => &self.pre_build,
            HookStage::PostBuild => &self.post_build,
            HookStage::PreDestroy => &self.pre_destroy,
            HookStage::PostDestroy => &self.post_destroy,
        }
    }

    fn slot(&mut self, stage: HookStage) -> &mut Vec<HookDefinition> {
        match stage {
            HookStage::PreBuild => &mut self.pre_build,
            HookStage::PostBuild => &mut self.post_build,
            HookStage::PreDestroy => &mut self.pre_destroy,
            HookStage::PostDestroy => &mut self.post_destroy,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HookOutcome {
    Success,
    Failure,
    Data(Map<String, Value>),
}

impl HookOutcome {
    /// Failure and empty data count as a failed hook.
    pub fn is_truthy(&self) -> bool {
        match self {
            HookOutcome::Success => true,
            HookOutcome::Failure => false,
            HookOutcome::Data(data) => !data.is_empty(),
        }
    }
}

#[async_trait]
pub trait Hook: Send + Sync {
    async fn run(
        &self,
        context: &Context,
        provider: &dyn Provider,
        args: &Map<String, Value>,
    ) -> Result<HookOutcome, BoxError>;
}

#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("unknown {stage} hook: {path}")]
    UnknownHook { stage: HookStage, path: String },

    #[error("required {stage} hook {path} failed")]
    RequiredHookFailed { stage: HookStage, path: String },

    #[error("required {stage} hook {path} raised an error: {source}")]
    HookRaised {
        stage: HookStage,
        path: String,
        #[source]
        source: BoxError,
    },
}

#[derive(Clone, Default)]
pub struct HookRegistry {
    hooks: HashMap<String, Arc<dyn Hook>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in `command` hook.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(command::PATH, CommandHook);
        registry
    }

    pub fn register(&mut self, path: &str, hook: impl Hook + 'static) {
        self.hooks.insert(path.to_string(), Arc::new(hook));
    }

    pub fn get(&self, path: &str) -> Option<&Arc<dyn Hook>> {
        self.hooks.get(path)
    }

    /// Fail fast on any hook path that is not registered.
    pub fn validate(&self, stage: HookStage, hooks: &[HookDefinition]) -> Result<(), HookError> {
        match hooks.iter().find(|hook| !self.hooks.contains_key(&hook.path)) {
            Some(hook) => Err(HookError::UnknownHook {
                stage,
                path: hook.path.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut paths: Vec<&String> = self.hooks.keys().collect();
        paths.sort();
        f.debug_struct("HookRegistry").field("paths", &paths).finish()
    }
}

/// Run every hook of one stage in declaration order.
pub async fn handle_hooks(
    stage: HookStage,
    hooks: &[HookDefinition],
    registry: &HookRegistry,
    context: &Context,
    provider: &dyn Provider,
    diagnostics: &mut Diagnostics,
) -> Result<(), HookError> {
    if hooks.is_empty() {
        tracing::debug!("No {stage} hooks defined.");
        return Ok(());
    }
    registry.validate(stage, hooks)?;

    let paths: Vec<&str> = hooks.iter().map(|hook| hook.path.as_str()).collect();
    tracing::info!("Executing {stage} hooks: {}", paths.join(", "));

    for definition in hooks {
        if !definition.enabled {
            tracing::debug!(hook = %definition.path, "hook is disabled, skipping");
            continue;
        }

        let Some(hook) = registry.get(&definition.path) else {
            return Err(HookError::UnknownHook {
                stage,
                path: definition.path.clone(),
            });
        };

        let outcome = match hook.run(context, provider, &definition.args).await {
            Ok(outcome) => outcome,
            Err(source) if definition.required => {
                tracing::error!(hook = %definition.path, error = %source, "required hook raised an error");
                return Err(HookError::HookRaised {
                    stage,
                    path: definition.path.clone(),
                    source,
                });
            }
            Err(e) => {
                diagnostics.warn(Warning::optional_hook_failed(format!(
                    "{stage} hook {} raised an error: {e}",
                    definition.path
                )));
                continue;
            }
        };

        if !outcome.is_truthy() {
            if definition.required {
                tracing::error!(hook = %definition.path, outcome = ?outcome, "required hook failed");
                return Err(HookError::RequiredHookFailed {
                    stage,
                    path: definition.path.clone(),
                });
            }
            diagnostics.warn(Warning::optional_hook_failed(format!(
                "Non-required {stage} hook {} failed. Return value: {outcome:?}",
                definition.path
            )));
            continue;
        }

        if let HookOutcome::Data(data) = outcome {
            match &definition.data_key {
                Some(key) => context.set_hook_data(key, data),
                None => tracing::debug!(
                    hook = %definition.path,
                    "hook returned data but no data_key is set, ignoring"
                ),
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_names() {
        assert_eq!(HookStage::PreBuild.name(), "pre_build");
        assert_eq!(HookStage::PostDestroy.to_string(), "post_destroy");
    }

    #[test]
    fn empty_data_is_falsy() {
        assert!(HookOutcome::Success.is_truthy());
        assert!(!HookOutcome::Failure.is_truthy());
        assert!(!HookOutcome::Data(Map::new()).is_truthy());
    }

    #[test]
    fn definition_defaults_from_yaml() {
        let hook: HookDefinition = serde_yaml::from_str("path: command").unwrap();
        assert!(hook.required);
        assert!(hook.enabled);
        assert!(hook.data_key.is_none());
        assert!(hook.args.is_empty());
    }

    #[test]
    fn validate_rejects_unknown_paths() {
        let registry = HookRegistry::with_builtins();
        let hooks = [HookDefinition::new("command"), HookDefinition::new("missing")];
        let err = registry.validate(HookStage::PreBuild, &hooks).unwrap_err();
        assert!(matches!(err, HookError::UnknownHook { path, .. } if path == "missing"));
    }
}
