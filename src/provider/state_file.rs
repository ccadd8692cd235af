// ABOUTME: Provider that records deployed stacks in a local JSON state file.
// ABOUTME: Deploying stores parameters and the template's Outputs section.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use super::{
    ChangeOutcome, ChangeRequest, DestroyOutcome, Provider, ProviderError, StackDescription,
    StackLookup,
};

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct StateFile {
    #[serde(default)]
    stacks: BTreeMap<String, StackDescription>,
}

#[derive(Debug)]
pub struct StateFileProvider {
    path: Option<PathBuf>,
    state: Mutex<StateFile>,
}

impl StateFileProvider {
    /// Load state from `path`, starting empty if the file does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ProviderError> {
        let path = path.as_ref();
        let state = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_json::from_str(&content)?
        } else {
            StateFile::default()
        };

        Ok(Self {
            path: Some(path.to_path_buf()),
            state: Mutex::new(state),
        })
    }

    /// State kept only in memory.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            state: Mutex::new(StateFile::default()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Names of every recorded stack.
    pub async fn stack_names(&self) -> Vec<String> {
        self.state.lock().await.stacks.keys().cloned().collect()
    }

    async fn persist(&self, state: &StateFile) -> Result<(), ProviderError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(state)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}

/// Values of the rendered template's `Outputs` section.
fn template_outputs(request: &ChangeRequest<'_>) -> Result<BTreeMap<String, String>, ProviderError> {
    let invalid = |reason: String| ProviderError::InvalidTemplate {
        stack: request.fqn.to_string(),
        reason,
    };

    let body: serde_json::Value =
        serde_json::from_str(&request.template.body).map_err(|e| invalid(e.to_string()))?;

    let Some(outputs) = body.get("Outputs") else {
        return Ok(BTreeMap::new());
    };
    let outputs = outputs
        .as_object()
        .ok_or_else(|| invalid("Outputs must be a mapping".to_string()))?;

    outputs
        .iter()
        .map(|(name, output)| {
            let value = match output.get("Value") {
                Some(serde_json::Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => return Err(invalid(format!("output {name} has no Value"))),
            };
            Ok((name.clone(), value))
        })
        .collect()
}

fn is_unchanged(existing: &StackDescription, request: &ChangeRequest<'_>) -> bool {
    existing.parameters == *request.parameters
        && existing.tags == *request.tags
        && existing.template_version.as_deref() == Some(request.template.version.as_str())
}

#[async_trait]
impl Provider for StateFileProvider {
    async fn get_stack(&self, fqn: &str) -> Result<StackLookup, ProviderError> {
        let state = self.state.lock().await;
        Ok(match state.stacks.get(fqn) {
            Some(description) => StackLookup::Found(description.clone()),
            None => StackLookup::NotFound,
        })
    }

    async fn get_stack_changes(
        &self,
        request: ChangeRequest<'_>,
    ) -> Result<ChangeOutcome, ProviderError> {
        let outputs = template_outputs(&request)?;
        let state = self.state.lock().await;
        Ok(match state.stacks.get(request.fqn) {
            Some(existing) if is_unchanged(existing, &request) => ChangeOutcome::Unchanged {
                outputs: existing.outputs.clone(),
            },
            _ => ChangeOutcome::Changed { outputs },
        })
    }

    async fn create_or_update(
        &self,
        request: ChangeRequest<'_>,
    ) -> Result<ChangeOutcome, ProviderError> {
        let outputs = template_outputs(&request)?;
        let mut state = self.state.lock().await;

        if let Some(existing) = state.stacks.get(request.fqn) {
            if is_unchanged(existing, &request) {
                return Ok(ChangeOutcome::Unchanged {
                    outputs: existing.outputs.clone(),
                });
            }
        }

        tracing::debug!(stack = %request.fqn, version = %request.template.version, "recording stack");
        let mut next = state.clone();
        next.stacks.insert(
            request.fqn.to_string(),
            StackDescription {
                fqn: request.fqn.to_string(),
                parameters: request.parameters.clone(),
                outputs: outputs.clone(),
                tags: request.tags.clone(),
                template_version: Some(request.template.version.clone()),
                last_updated: Some(Utc::now()),
            },
        );
        // Memory only changes once the file write succeeded.
        self.persist(&next).await?;
        *state = next;
        Ok(ChangeOutcome::Changed { outputs })
    }

    async fn destroy(&self, fqn: &str) -> Result<DestroyOutcome, ProviderError> {
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        if next.stacks.remove(fqn).is_none() {
            return Ok(DestroyOutcome::NotFound);
        }
        self.persist(&next).await?;
        *state = next;
        Ok(DestroyOutcome::Destroyed)
    }
}
