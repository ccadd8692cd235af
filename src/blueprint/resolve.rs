// ABOUTME: Turns provided stack variables into the typed values a blueprint renders with.
// ABOUTME: Applies defaults, validators, type coercion and allowed-value checks in that order.

use std::collections::BTreeMap;

use super::ResolveError;
use super::definition::{VariableDefinition, VariableType};
use crate::variables::{ProviderParameter, ValueKind, Variable, VariableValue};

/// Resolved values for every variable a blueprint defines.
///
/// Only produced by [`resolve_variables`], so a blueprint can never observe an
/// unresolved value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedVariables {
    values: BTreeMap<String, VariableValue>,
}

impl ResolvedVariables {
    pub fn get(&self, name: &str) -> Option<&VariableValue> {
        self.values.get(name)
    }

    pub fn as_map(&self) -> &BTreeMap<String, VariableValue> {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Provider parameters keyed by their parameter name, ready for submission.
    pub fn parameter_values(&self) -> BTreeMap<String, String> {
        self.values
            .values()
            .filter_map(|value| match value {
                VariableValue::Parameter(p) => {
                    Some((p.name.clone(), p.to_parameter_value().to_string()))
                }
                _ => None,
            })
            .collect()
    }
}

/// Resolve a single blueprint variable.
pub fn resolve_variable(
    name: &str,
    definition: &VariableDefinition,
    provided: Option<&Variable>,
    blueprint: &str,
) -> Result<VariableValue, ResolveError> {
    let value = match provided {
        Some(variable) => variable
            .value()
            .map_err(|_| ResolveError::UnresolvedVariable {
                blueprint: blueprint.to_string(),
                variable: name.to_string(),
            })?
            .clone(),
        None => definition
            .default
            .clone()
            .ok_or_else(|| ResolveError::MissingVariable {
                blueprint: blueprint.to_string(),
                variable: name.to_string(),
            })?,
    };

    let value = match &definition.validator {
        Some(validator) => {
            validator
                .apply(value.clone())
                .map_err(|source| ResolveError::ValidatorError {
                    variable: name.to_string(),
                    validator: validator.name().to_string(),
                    value: value.to_string(),
                    source,
                })?
        }
        None => value,
    };

    let value = coerce(name, &definition.var_type, value)?;

    if !definition.allowed_values.is_empty()
        && value.kind() != ValueKind::Parameter
        && !definition.allowed_values.contains(&value)
    {
        return Err(ResolveError::InvalidAllowedValue {
            variable: name.to_string(),
            value: value.to_string(),
            allowed: definition
                .allowed_values
                .iter()
                .map(ToString::to_string)
                .collect(),
        });
    }

    Ok(value)
}

fn coerce(
    name: &str,
    var_type: &VariableType,
    value: VariableValue,
) -> Result<VariableValue, ResolveError> {
    let mismatch = |actual: ValueKind| ResolveError::TypeMismatch {
        variable: name.to_string(),
        expected: var_type.name(),
        actual,
    };

    match (var_type, value) {
        (VariableType::Parameter { .. }, VariableValue::Parameter(p)) => {
            Ok(VariableValue::Parameter(ProviderParameter::new(name, p.value)))
        }
        (VariableType::Parameter { .. }, VariableValue::Resource(_)) => {
            Err(mismatch(ValueKind::Resource))
        }
        (VariableType::Parameter { .. }, value) => Ok(VariableValue::Parameter(
            ProviderParameter::new(name, value.to_string()),
        )),
        (VariableType::Resource(factory), VariableValue::Resource(resource))
            if resource.resource_type == factory.resource_type() =>
        {
            Ok(VariableValue::Resource(resource))
        }
        (VariableType::Resource(factory), value) => factory
            .create(&value)
            .map(VariableValue::Resource)
            .map_err(|source| ResolveError::ValidatorError {
                variable: name.to_string(),
                validator: format!("{}.create", factory.resource_type()),
                value: value.to_string(),
                source,
            }),
        (VariableType::String, value @ VariableValue::String(_))
        | (VariableType::Bool, value @ VariableValue::Bool(_))
        | (VariableType::Integer, value @ VariableValue::Integer(_))
        | (VariableType::List, value @ VariableValue::List(_)) => Ok(value),
        (_, value) => Err(mismatch(value.kind())),
    }
}

/// Resolve every variable `definitions` declares from the provided variables.
///
/// Provided variables the blueprint does not define are ignored.
pub fn resolve_variables(
    blueprint: &str,
    definitions: &BTreeMap<String, VariableDefinition>,
    provided: &[Variable],
) -> Result<ResolvedVariables, ResolveError> {
    for variable in provided {
        if !definitions.contains_key(variable.name()) {
            tracing::warn!(
                blueprint,
                variable = variable.name(),
                "variable is not defined by the blueprint, ignoring"
            );
        }
    }

    let values = definitions
        .iter()
        .map(|(name, definition)| {
            let provided = provided.iter().find(|v| v.name() == name);
            resolve_variable(name, definition, provided, blueprint).map(|v| (name.clone(), v))
        })
        .collect::<Result<BTreeMap<_, _>, _>>()?;

    Ok(ResolvedVariables { values })
}
