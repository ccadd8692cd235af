// ABOUTME: Declarations of blueprint variables: type, default, validator and allowed values.
// ABOUTME: Resource factories and validators are shared trait objects.

use std::fmt;
use std::sync::Arc;

use crate::variables::{TypedResource, VariableValue};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Builds a typed resource from a resolved value.
pub trait ResourceFactory: Send + Sync {
    fn resource_type(&self) -> &str;

    fn create(&self, value: &VariableValue) -> Result<TypedResource, BoxError>;
}

#[derive(Clone)]
pub enum VariableType {
    String,
    Bool,
    Integer,
    List,
    /// Submitted to the provider as a stack parameter of `parameter_type`.
    Parameter { parameter_type: String },
    Resource(Arc<dyn ResourceFactory>),
}

impl VariableType {
    pub fn parameter(parameter_type: impl Into<String>) -> Self {
        VariableType::Parameter {
            parameter_type: parameter_type.into(),
        }
    }

    pub fn is_parameter(&self) -> bool {
        matches!(self, VariableType::Parameter { .. })
    }

    pub fn name(&self) -> String {
        match self {
            VariableType::String => "string".to_string(),
            VariableType::Bool => "bool".to_string(),
            VariableType::Integer => "integer".to_string(),
            VariableType::List => "list".to_string(),
            VariableType::Parameter { parameter_type } => format!("parameter<{parameter_type}>"),
            VariableType::Resource(factory) => format!("resource<{}>", factory.resource_type()),
        }
    }
}

impl fmt::Debug for VariableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

type ValidatorFn = dyn Fn(VariableValue) -> Result<VariableValue, BoxError> + Send + Sync;

/// Named callback that may transform or reject a value.
#[derive(Clone)]
pub struct Validator {
    name: String,
    check: Arc<ValidatorFn>,
}

impl Validator {
    pub fn new<F>(name: impl Into<String>, check: F) -> Self
    where
        F: Fn(VariableValue) -> Result<VariableValue, BoxError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            check: Arc::new(check),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn apply(&self, value: VariableValue) -> Result<VariableValue, BoxError> {
        (self.check)(value)
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator").field("name", &self.name).finish()
    }
}

#[derive(Debug, Clone)]
pub struct VariableDefinition {
    pub var_type: VariableType,
    pub default: Option<VariableValue>,
    pub description: Option<String>,
    pub validator: Option<Validator>,
    pub allowed_values: Vec<VariableValue>,
}

impl VariableDefinition {
    pub fn new(var_type: VariableType) -> Self {
        Self {
            var_type,
            default: None,
            description: None,
            validator: None,
            allowed_values: Vec::new(),
        }
    }

    pub fn with_default(mut self, default: impl Into<VariableValue>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn with_allowed_values<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<VariableValue>,
    {
        self.allowed_values = values.into_iter().map(Into::into).collect();
        self
    }
}
