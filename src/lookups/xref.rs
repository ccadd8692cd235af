// ABOUTME: `${xref fqn::Output}` lookup for stacks managed outside this config.
// ABOUTME: Always fetches the live output from the provider and adds no graph edge.

use async_trait::async_trait;

use super::output::fetch_output;
use super::{LookupContext, LookupError, LookupHandler, split_pair};
use crate::variables::VariableValue;

pub(super) const KIND: &str = "xref";

#[derive(Debug, Default, Clone, Copy)]
pub struct XrefLookup;

#[async_trait]
impl LookupHandler for XrefLookup {
    async fn handle(
        &self,
        input: &str,
        ctx: &LookupContext<'_>,
    ) -> Result<VariableValue, LookupError> {
        let (fqn, output) = split_pair(KIND, input)?;
        if fqn.is_empty() || output.is_empty() {
            return Err(LookupError::InvalidInput {
                kind: KIND.to_string(),
                input: input.to_string(),
                reason: "expected <fully-qualified-stack>::<output>".to_string(),
            });
        }
        fetch_output(ctx.provider, fqn, output).await
    }
}
