// ABOUTME: A named stack variable that is resolved exactly once.
// ABOUTME: Evaluates lookups through the registry and enforces concatenation rules.

use super::{RawValue, Segment, VariableError, VariableValue};
use crate::lookups::{LookupContext, LookupRegistry};

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    name: String,
    raw: RawValue,
    resolved: Option<VariableValue>,
}

impl Variable {
    pub fn new(name: impl Into<String>, raw: impl Into<RawValue>) -> Self {
        Self {
            name: name.into(),
            raw: raw.into(),
            resolved: None,
        }
    }

    pub fn from_yaml(name: &str, value: &serde_yaml::Value) -> Result<Self, VariableError> {
        Ok(Self::new(name, RawValue::from_yaml(value)?))
    }

    /// A variable that is already resolved to `value`.
    pub fn resolved(name: impl Into<String>, value: VariableValue) -> Self {
        Self {
            name: name.into(),
            raw: RawValue::Literal(value.clone()),
            resolved: Some(value),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn raw(&self) -> &RawValue {
        &self.raw
    }

    pub fn value(&self) -> Result<&VariableValue, VariableError> {
        self.resolved
            .as_ref()
            .ok_or_else(|| VariableError::Unresolved(self.name.clone()))
    }

    /// Evaluate every lookup in the raw value and store the result.
    pub async fn resolve(
        &mut self,
        registry: &LookupRegistry,
        ctx: &LookupContext<'_>,
    ) -> Result<(), VariableError> {
        if self.resolved.is_some() {
            return Ok(());
        }

        let value = match &self.raw {
            RawValue::Literal(value) => value.clone(),
            RawValue::Template(segments) => {
                resolve_template(&self.name, segments, registry, ctx).await?
            }
            RawValue::List(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    let value = match item {
                        RawValue::Literal(value) => value.clone(),
                        RawValue::Template(segments) => {
                            resolve_template(&self.name, segments, registry, ctx).await?
                        }
                        RawValue::List(_) => return Err(VariableError::NestedList),
                    };
                    values.push(list_item(&self.name, value)?);
                }
                VariableValue::List(values)
            }
        };

        tracing::trace!(variable = %self.name, "resolved variable");
        self.resolved = Some(value);
        Ok(())
    }
}

async fn resolve_template(
    variable: &str,
    segments: &[Segment],
    registry: &LookupRegistry,
    ctx: &LookupContext<'_>,
) -> Result<VariableValue, VariableError> {
    // A lone lookup keeps whatever kind the handler returned.
    if let [Segment::Lookup(lookup)] = segments {
        return registry
            .resolve(lookup, ctx)
            .await
            .map_err(|source| VariableError::FailedLookup {
                variable: variable.to_string(),
                lookup: lookup.to_string(),
                source,
            });
    }

    let mut joined = String::new();
    for segment in segments {
        match segment {
            Segment::Text(text) => joined.push_str(text),
            Segment::Lookup(lookup) => {
                let value = registry.resolve(lookup, ctx).await.map_err(|source| {
                    VariableError::FailedLookup {
                        variable: variable.to_string(),
                        lookup: lookup.to_string(),
                        source,
                    }
                })?;
                match value {
                    VariableValue::String(s) => joined.push_str(&s),
                    other => {
                        return Err(VariableError::InvalidLookupConcatenation {
                            variable: variable.to_string(),
                            lookup: lookup.to_string(),
                            kind: other.kind(),
                        });
                    }
                }
            }
        }
    }
    Ok(VariableValue::String(joined))
}

fn list_item(variable: &str, value: VariableValue) -> Result<String, VariableError> {
    match value {
        VariableValue::String(s) => Ok(s),
        VariableValue::Integer(n) => Ok(n.to_string()),
        VariableValue::Bool(b) => Ok(b.to_string()),
        other => Err(VariableError::InvalidListItem {
            variable: variable.to_string(),
            kind: other.kind(),
        }),
    }
}
