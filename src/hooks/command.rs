// ABOUTME: Built-in hook that runs a shell command.
// ABOUTME: Returns exit code and captured output as hook data; non-zero exit is a failure.

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::process::Stdio;
use tokio::process::Command;

use super::{Hook, HookOutcome};
use crate::blueprint::BoxError;
use crate::context::Context;
use crate::provider::Provider;

pub(super) const PATH: &str = "command";

#[derive(Debug, Default, Clone, Copy)]
pub struct CommandHook;

/// Environment passed to the command.
fn command_env(context: &Context, args: &Map<String, Value>) -> HashMap<String, String> {
    let mut env = HashMap::new();
    env.insert(
        "STRATA_NAMESPACE".to_string(),
        context.namespace().to_string(),
    );
    if let Some(Value::Object(extra)) = args.get("env") {
        for (key, value) in extra {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            env.insert(key.clone(), value);
        }
    }
    env
}

#[async_trait]
impl Hook for CommandHook {
    async fn run(
        &self,
        context: &Context,
        _provider: &dyn Provider,
        args: &Map<String, Value>,
    ) -> Result<HookOutcome, BoxError> {
        let command = args
            .get("command")
            .and_then(Value::as_str)
            .ok_or("command hook requires a string `command` argument")?;

        tracing::info!("Running command hook: {command}");

        let output = Command::new("sh")
            .arg("-c")
            .arg(command)
            .envs(command_env(context, args))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim_end().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim_end().to_string();

        if !output.status.success() {
            tracing::warn!(
                "command hook failed with exit code {:?}: {}",
                output.status.code(),
                stderr
            );
            return Ok(HookOutcome::Failure);
        }

        tracing::info!("command hook completed successfully");
        let data = json!({
            "exit_code": output.status.code(),
            "stdout": stdout,
            "stderr": stderr,
        });
        match data {
            Value::Object(map) => Ok(HookOutcome::Data(map)),
            _ => Ok(HookOutcome::Success),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_includes_namespace_and_extra_vars() {
        let context = Context::new("acme");
        let args = json!({ "command": "true", "env": { "REGION": "us-east-1", "COUNT": 2 } });
        let args = args.as_object().cloned().unwrap();

        let env = command_env(&context, &args);
        assert_eq!(env.get("STRATA_NAMESPACE"), Some(&"acme".to_string()));
        assert_eq!(env.get("REGION"), Some(&"us-east-1".to_string()));
        assert_eq!(env.get("COUNT"), Some(&"2".to_string()));
    }
}
