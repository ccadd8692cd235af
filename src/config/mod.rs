// ABOUTME: Configuration types and parsing for strata.yml.
// ABOUTME: Handles YAML parsing, file discovery and building the run context.

mod blueprint;
mod init;
mod stack;

pub use blueprint::{BlueprintConfig, VariableSpec};
pub use init::init_config;
pub use stack::StackConfig;

use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::hooks::{HookDefinition, HookStage, StageHooks};
use crate::lookups::LookupRegistry;
use crate::types::StackName;
use crate::variables::VariableError;

pub const CONFIG_FILENAME: &str = "strata.yml";
pub const CONFIG_FILENAME_ALT: &str = "strata.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".strata/config.yml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("stack {0} is defined more than once")]
    DuplicateStack(StackName),

    #[error("variable {variable} of blueprint {blueprint} has no type")]
    VariableTypeRequired { blueprint: String, variable: String },

    #[error("variable {variable} of blueprint {blueprint} has unknown type {var_type}")]
    UnknownVariableType {
        blueprint: String,
        variable: String,
        var_type: String,
    },

    #[error("invalid value for variable {variable} of {owner}: {source}")]
    InvalidValue {
        owner: String,
        variable: String,
        #[source]
        source: VariableError,
    },

    #[error("unknown lookup type {kind} in variable {variable} of stack {stack}")]
    UnknownLookupType {
        stack: StackName,
        variable: String,
        kind: String,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Prefix of every stack's fully-qualified name.
    #[serde(default)]
    pub namespace: String,

    /// Default stack concurrency; `0` is unbounded.
    #[serde(default)]
    pub concurrency: usize,

    #[serde(default)]
    pub tags: BTreeMap<String, String>,

    /// Values read by the `default` lookup.
    #[serde(default)]
    pub environment: BTreeMap<String, String>,

    #[serde(default)]
    pub pre_build: Vec<HookDefinition>,

    #[serde(default)]
    pub post_build: Vec<HookDefinition>,

    #[serde(default)]
    pub pre_destroy: Vec<HookDefinition>,

    #[serde(default)]
    pub post_destroy: Vec<HookDefinition>,

    #[serde(default)]
    pub stacks: Vec<StackConfig>,
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(Error::from)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                tracing::debug!("loading config from {}", path.display());
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    pub fn hooks(&self, stage: HookStage) -> &[HookDefinition] {
        match stage {
            HookStage::PreBuild => &self.pre_build,
            HookStage::PostBuild => &self.post_build,
            HookStage::PreDestroy => &self.pre_destroy,
            HookStage::PostDestroy => &self.post_destroy,
        }
    }

    pub fn stage_hooks(&self) -> StageHooks {
        [
            HookStage::PreBuild,
            HookStage::PostBuild,
            HookStage::PreDestroy,
            HookStage::PostDestroy,
        ]
        .into_iter()
        .fold(StageHooks::new(), |hooks, stage| {
            hooks.with(stage, self.hooks(stage).to_vec())
        })
    }

    /// Build the run context with the built-in lookups.
    pub fn context(&self) -> std::result::Result<Context, ConfigError> {
        self.context_with(LookupRegistry::with_builtins())
    }

    /// Build the run context, validating every lookup against `lookups`.
    pub fn context_with(
        &self,
        lookups: LookupRegistry,
    ) -> std::result::Result<Context, ConfigError> {
        let mut seen = BTreeSet::new();
        let mut stacks = Vec::with_capacity(self.stacks.len());
        for stack in &self.stacks {
            if !seen.insert(stack.name.clone()) {
                return Err(ConfigError::DuplicateStack(stack.name.clone()));
            }
            stacks.push(stack.to_stack(&self.namespace, &lookups)?);
        }

        let mut context = Context::new(self.namespace.clone())
            .with_environment(self.environment.clone())
            .with_tags(self.tags.clone())
            .with_lookups(lookups);
        for stack in stacks {
            context = context.with_stack(stack);
        }
        Ok(context)
    }

    pub fn template(namespace: &str) -> String {
        format!(
            r#"namespace: {namespace}
# Maximum stacks deployed at once; 0 means unbounded.
concurrency: 0
tags:
  managed_by: strata
environment:
  region: us-east-1
pre_build: []
post_build: []
stacks:
  - name: vpc
    variables:
      Cidr: "10.0.0.0/16"
      Region: "${{default region::us-east-1}}"
    blueprint:
      description: Core network
      variables:
        Cidr: {{ type: parameter, parameter_type: String }}
        Region: {{ type: string }}
      outputs:
        VpcId: "vpc-${{Region}}"
  - name: app
    variables:
      VpcId: "${{output vpc::VpcId}}"
    blueprint:
      variables:
        VpcId: {{ type: parameter, parameter_type: String }}
"#
        )
    }
}
