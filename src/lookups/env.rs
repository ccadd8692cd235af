// ABOUTME: Lookups reading the process environment and the config environment map.
// ABOUTME: `envvar NAME` requires the variable; `default key::fallback` never fails.

use async_trait::async_trait;

use super::{LookupContext, LookupError, LookupHandler, split_pair};
use crate::variables::VariableValue;

pub(super) const ENVVAR_KIND: &str = "envvar";
pub(super) const DEFAULT_KIND: &str = "default";

#[derive(Debug, Default, Clone, Copy)]
pub struct EnvVarLookup;

#[async_trait]
impl LookupHandler for EnvVarLookup {
    async fn handle(
        &self,
        input: &str,
        _ctx: &LookupContext<'_>,
    ) -> Result<VariableValue, LookupError> {
        let name = input.trim();
        std::env::var(name)
            .map(VariableValue::String)
            .map_err(|_| LookupError::MissingEnvironmentVariable(name.to_string()))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultLookup;

#[async_trait]
impl LookupHandler for DefaultLookup {
    async fn handle(
        &self,
        input: &str,
        ctx: &LookupContext<'_>,
    ) -> Result<VariableValue, LookupError> {
        let (key, fallback) = split_pair(DEFAULT_KIND, input)?;
        let value = ctx
            .context
            .environment()
            .get(key)
            .cloned()
            .unwrap_or_else(|| fallback.to_string());
        Ok(VariableValue::String(value))
    }
}
