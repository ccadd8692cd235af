// ABOUTME: Info action: prints the outputs of every deployed stack.
// ABOUTME: Stacks the provider does not know are noted and skipped.

use std::collections::BTreeMap;

use super::ActionEnv;
use crate::diagnostics::{Diagnostics, Warning};
use crate::error::Result;
use crate::provider::StackLookup;

/// Print outputs per stack and return them keyed by fully-qualified name.
pub async fn info(env: &ActionEnv) -> Result<BTreeMap<String, BTreeMap<String, String>>> {
    let mut diagnostics = Diagnostics::default();
    let namespace = env.context.namespace();
    env.output.progress(&format!("Outputs for stacks: {namespace}"));

    let stacks = env.context.stacks();
    if stacks.is_empty() {
        diagnostics.warn(Warning::no_stacks_detected());
    }

    let mut reported = BTreeMap::new();
    for stack in stacks {
        let description = match env.provider.get_stack(stack.fqn()).await? {
            StackLookup::Found(description) => description,
            StackLookup::NotFound => {
                tracing::info!("Stack \"{}\" does not exist.", stack.fqn());
                continue;
            }
        };

        let mut lines = vec![format!("{}:", stack.fqn())];
        lines.extend(
            description
                .outputs
                .iter()
                .map(|(key, value)| format!("\t{key}: {value}")),
        );
        env.output.report(stack.fqn(), &lines.join("\n"));
        reported.insert(stack.fqn().to_string(), description.outputs);
    }

    for warning in diagnostics.warnings() {
        env.output.warning(&warning.message);
    }
    Ok(reported)
}
