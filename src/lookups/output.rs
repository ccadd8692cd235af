// ABOUTME: `${output stack::Output}` lookup against stacks in the same config.
// ABOUTME: Reads recorded outputs, falling back to the provider for stacks not deployed this run.

use async_trait::async_trait;

use super::{LookupContext, LookupError, LookupHandler, split_pair};
use crate::provider::{Provider, StackLookup};
use crate::types::StackName;
use crate::variables::VariableValue;

pub(super) const KIND: &str = "output";

/// Parse `stack::Output` into the referenced stack and output name.
///
/// Used both when inferring graph edges and when evaluating the lookup.
pub fn parse_output_reference(input: &str) -> Result<(StackName, String), LookupError> {
    let (stack, output) = split_pair(KIND, input)?;
    let invalid = |reason: String| LookupError::InvalidInput {
        kind: KIND.to_string(),
        input: input.to_string(),
        reason,
    };

    let stack = StackName::new(stack).map_err(|e| invalid(e.to_string()))?;
    if output.is_empty() {
        return Err(invalid("output name cannot be empty".to_string()));
    }
    Ok((stack, output.to_string()))
}

#[derive(Debug, Default, Clone, Copy)]
pub struct OutputLookup;

#[async_trait]
impl LookupHandler for OutputLookup {
    async fn handle(
        &self,
        input: &str,
        ctx: &LookupContext<'_>,
    ) -> Result<VariableValue, LookupError> {
        let (name, output) = parse_output_reference(input)?;
        let stack = ctx
            .context
            .stack(&name)
            .ok_or_else(|| LookupError::UnknownStack(name.clone()))?;

        if let Some(outputs) = stack.outputs() {
            return outputs
                .get(&output)
                .map(|value| VariableValue::String(value.clone()))
                .ok_or_else(|| LookupError::OutputDoesNotExist {
                    stack: stack.fqn().to_string(),
                    output,
                });
        }

        // Nothing recorded this run (disabled or not targeted): use the deployed stack.
        tracing::debug!(stack = %name, "no recorded outputs, fetching from provider");
        fetch_output(ctx.provider, stack.fqn(), &output).await
    }
}

pub(super) async fn fetch_output(
    provider: &dyn Provider,
    fqn: &str,
    output: &str,
) -> Result<VariableValue, LookupError> {
    match provider.get_stack(fqn).await? {
        StackLookup::Found(description) => description
            .outputs
            .get(output)
            .map(|value| VariableValue::String(value.clone()))
            .ok_or_else(|| LookupError::OutputDoesNotExist {
                stack: fqn.to_string(),
                output: output.to_string(),
            }),
        StackLookup::NotFound => Err(LookupError::StackDoesNotExist(fqn.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_stack_and_output() {
        let (stack, output) = parse_output_reference("vpc::VpcId").unwrap();
        assert_eq!(stack.as_str(), "vpc");
        assert_eq!(output, "VpcId");
    }

    #[test]
    fn rejects_bad_references() {
        assert!(parse_output_reference("vpc").is_err());
        assert!(parse_output_reference("vpc::").is_err());
        assert!(parse_output_reference("my_vpc::Id").is_err());
    }
}
