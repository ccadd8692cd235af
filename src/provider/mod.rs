// ABOUTME: Narrow contract to the deployment backend that actually owns stacks.
// ABOUTME: No-change and not-found are explicit outcome variants, not errors.

mod state_file;

pub use state_file::StateFileProvider;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::blueprint::Template;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("template for {stack} is not valid: {reason}")]
    InvalidTemplate { stack: String, reason: String },

    #[error("state file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("state file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// A deployed stack as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackDescription {
    pub fqn: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
    #[serde(default)]
    pub outputs: BTreeMap<String, String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub template_version: Option<String>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackLookup {
    Found(StackDescription),
    NotFound,
}

/// Everything the provider needs to create, update or preview a stack.
#[derive(Debug, Clone, Copy)]
pub struct ChangeRequest<'a> {
    pub fqn: &'a str,
    pub template: &'a Template,
    pub parameters: &'a BTreeMap<String, String>,
    pub tags: &'a BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeOutcome {
    Changed { outputs: BTreeMap<String, String> },
    Unchanged { outputs: BTreeMap<String, String> },
}

impl ChangeOutcome {
    pub fn outputs(&self) -> &BTreeMap<String, String> {
        match self {
            ChangeOutcome::Changed { outputs } | ChangeOutcome::Unchanged { outputs } => outputs,
        }
    }

    pub fn into_outputs(self) -> BTreeMap<String, String> {
        match self {
            ChangeOutcome::Changed { outputs } | ChangeOutcome::Unchanged { outputs } => outputs,
        }
    }

    pub fn is_changed(&self) -> bool {
        matches!(self, ChangeOutcome::Changed { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestroyOutcome {
    Destroyed,
    NotFound,
}

#[async_trait]
pub trait Provider: Send + Sync {
    async fn get_stack(&self, fqn: &str) -> Result<StackLookup, ProviderError>;

    /// Preview the outputs a change request would produce without applying it.
    async fn get_stack_changes(
        &self,
        request: ChangeRequest<'_>,
    ) -> Result<ChangeOutcome, ProviderError>;

    async fn create_or_update(
        &self,
        request: ChangeRequest<'_>,
    ) -> Result<ChangeOutcome, ProviderError>;

    async fn destroy(&self, fqn: &str) -> Result<DestroyOutcome, ProviderError>;
}
