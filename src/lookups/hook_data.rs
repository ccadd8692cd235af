// ABOUTME: `${hook_data key::field}` lookup over data stored by earlier hooks.
// ABOUTME: Values come back typed; strings, booleans, integers and lists map directly.

use async_trait::async_trait;
use serde_json::Value;

use super::{LookupContext, LookupError, LookupHandler, split_pair};
use crate::variables::VariableValue;

pub(super) const KIND: &str = "hook_data";

#[derive(Debug, Default, Clone, Copy)]
pub struct HookDataLookup;

#[async_trait]
impl LookupHandler for HookDataLookup {
    async fn handle(
        &self,
        input: &str,
        ctx: &LookupContext<'_>,
    ) -> Result<VariableValue, LookupError> {
        let (key, field) = split_pair(KIND, input)?;
        let data = ctx
            .context
            .hook_data(key)
            .ok_or_else(|| LookupError::MissingHookData(key.to_string()))?;
        let value = data.get(field).ok_or_else(|| LookupError::MissingHookField {
            key: key.to_string(),
            field: field.to_string(),
        })?;
        Ok(json_to_value(value))
    }
}

fn json_to_value(value: &Value) -> VariableValue {
    match value {
        Value::String(s) => VariableValue::String(s.clone()),
        Value::Bool(b) => VariableValue::Bool(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => VariableValue::Integer(i),
            None => VariableValue::String(n.to_string()),
        },
        Value::Array(items) => VariableValue::List(
            items
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
        ),
        other => VariableValue::String(other.to_string()),
    }
}
