// ABOUTME: Closed set of variable value kinds fed into blueprints.
// ABOUTME: Provider parameters and typed resources are first-class variants.

use serde::Serialize;
use std::fmt;

use super::VariableError;

/// A value wrapped for submission to the provider as a stack parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderParameter {
    pub name: String,
    pub value: String,
}

impl ProviderParameter {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Value submitted to the provider.
    pub fn to_parameter_value(&self) -> &str {
        &self.value
    }
}

/// A value produced by a resource factory for a typed-resource variable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypedResource {
    pub resource_type: String,
    pub properties: serde_json::Value,
}

/// Kind tag of a [`VariableValue`], used in type errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    String,
    Bool,
    Integer,
    List,
    Parameter,
    Resource,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::String => "string",
            ValueKind::Bool => "bool",
            ValueKind::Integer => "integer",
            ValueKind::List => "list",
            ValueKind::Parameter => "parameter",
            ValueKind::Resource => "resource",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum VariableValue {
    String(String),
    Bool(bool),
    Integer(i64),
    List(Vec<String>),
    Parameter(ProviderParameter),
    Resource(TypedResource),
}

impl VariableValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            VariableValue::String(_) => ValueKind::String,
            VariableValue::Bool(_) => ValueKind::Bool,
            VariableValue::Integer(_) => ValueKind::Integer,
            VariableValue::List(_) => ValueKind::List,
            VariableValue::Parameter(_) => ValueKind::Parameter,
            VariableValue::Resource(_) => ValueKind::Resource,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            VariableValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Convert a scalar or list of scalars from YAML config.
    pub fn from_yaml(value: &serde_yaml::Value) -> Result<Self, VariableError> {
        use serde_yaml::Value;

        match value {
            Value::String(s) => Ok(VariableValue::String(s.clone())),
            Value::Bool(b) => Ok(VariableValue::Bool(*b)),
            Value::Number(n) => n.as_i64().map(VariableValue::Integer).ok_or_else(|| {
                VariableError::UnsupportedValue(format!("number {n} is not an integer"))
            }),
            Value::Sequence(items) => items
                .iter()
                .map(scalar_to_string)
                .collect::<Result<Vec<_>, _>>()
                .map(VariableValue::List),
            Value::Null => Err(VariableError::UnsupportedValue("null".to_string())),
            Value::Mapping(_) | Value::Tagged(_) => Err(VariableError::UnsupportedValue(
                "mappings are not valid variable values".to_string(),
            )),
        }
    }
}

fn scalar_to_string(value: &serde_yaml::Value) -> Result<String, VariableError> {
    use serde_yaml::Value;

    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(VariableError::UnsupportedValue(format!(
            "list items must be scalars, got {other:?}"
        ))),
    }
}

impl fmt::Display for VariableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariableValue::String(s) => write!(f, "{s}"),
            VariableValue::Bool(b) => write!(f, "{b}"),
            VariableValue::Integer(n) => write!(f, "{n}"),
            VariableValue::List(items) => write!(f, "{}", items.join(",")),
            VariableValue::Parameter(p) => write!(f, "{}", p.value),
            VariableValue::Resource(r) => write!(f, "{}", r.properties),
        }
    }
}

impl From<&str> for VariableValue {
    fn from(value: &str) -> Self {
        VariableValue::String(value.to_string())
    }
}

impl From<String> for VariableValue {
    fn from(value: String) -> Self {
        VariableValue::String(value)
    }
}

impl From<bool> for VariableValue {
    fn from(value: bool) -> Self {
        VariableValue::Bool(value)
    }
}

impl From<i64> for VariableValue {
    fn from(value: i64) -> Self {
        VariableValue::Integer(value)
    }
}
