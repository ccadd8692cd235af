// ABOUTME: Application-wide error types for strata.
// ABOUTME: Uses thiserror for ergonomic error handling.

use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigError;
use crate::graph::GraphError;
use crate::hooks::HookError;
use crate::provider::ProviderError;
use crate::types::StackName;
use crate::walker::WalkError;

fn join(names: &[StackName]) -> String {
    names
        .iter()
        .map(StackName::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("configuration file not found in {0}")]
    ConfigNotFound(PathBuf),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unknown stack: {0}")]
    UnknownStack(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Hook(#[from] HookError),

    #[error(transparent)]
    Walk(#[from] WalkError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("the following stacks failed: {}", join(.0))]
    PlanFailed(Vec<StackName>),

    #[error("run interrupted before these stacks ran: {}", join(.0))]
    Interrupted(Vec<StackName>),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
