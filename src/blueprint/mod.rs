// ABOUTME: The template-producing object bound to each stack.
// ABOUTME: Declares variables, resolves them and renders a versioned template.

mod config;
mod definition;
mod resolve;
mod userdata;

pub use config::ConfigBlueprint;
pub use definition::{
    BoxError, ResourceFactory, Validator, VariableDefinition, VariableType,
};
pub use resolve::{ResolvedVariables, resolve_variable, resolve_variables};
pub use userdata::parse_user_data;

use std::collections::BTreeMap;
use std::fmt;

use crate::variables::{ValueKind, Variable};

/// Length of the content-derived template version tag.
pub const TEMPLATE_VERSION_LEN: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("variable {variable} of blueprint {blueprint} was provided but not resolved")]
    UnresolvedVariable { blueprint: String, variable: String },

    #[error("variable {variable} is required by blueprint {blueprint} but was not provided")]
    MissingVariable { blueprint: String, variable: String },

    #[error("validator {validator} rejected value '{value}' of variable {variable}: {source}")]
    ValidatorError {
        variable: String,
        validator: String,
        value: String,
        #[source]
        source: BoxError,
    },

    #[error("variable {variable} must be of type {expected}, got {actual}")]
    TypeMismatch {
        variable: String,
        expected: String,
        actual: ValueKind,
    },

    #[error("invalid value '{value}' for variable {variable}, allowed values: {}", .allowed.join(", "))]
    InvalidAllowedValue {
        variable: String,
        value: String,
        allowed: Vec<String>,
    },

    #[error("invalid user data placeholder in blueprint {blueprint}: {message}")]
    InvalidUserdataPlaceholder { blueprint: String, message: String },
}

#[derive(Debug, thiserror::Error)]
pub enum BlueprintError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("failed to serialize template: {0}")]
    Json(#[from] serde_json::Error),
}

/// Rendered template body plus a short content hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub body: String,
    pub version: String,
}

impl Template {
    pub fn new(body: impl Into<String>) -> Self {
        let body = body.into();
        let hash = blake3::hash(body.as_bytes()).to_hex();
        let version = hash.as_str()[..TEMPLATE_VERSION_LEN].to_string();
        Self { body, version }
    }
}

pub trait Blueprint: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn description(&self) -> Option<&str> {
        None
    }

    fn defined_variables(&self) -> BTreeMap<String, VariableDefinition>;

    fn render(&self, variables: &ResolvedVariables) -> Result<Template, BlueprintError>;

    /// Variables submitted to the provider as stack parameters.
    fn parameter_definitions(&self) -> BTreeMap<String, VariableDefinition> {
        self.defined_variables()
            .into_iter()
            .filter(|(_, definition)| definition.var_type.is_parameter())
            .collect()
    }

    /// Parameters the provider must be given because they have no default.
    fn required_parameter_definitions(&self) -> BTreeMap<String, VariableDefinition> {
        self.parameter_definitions()
            .into_iter()
            .filter(|(_, definition)| definition.default.is_none())
            .collect()
    }

    fn resolve_variables(&self, provided: &[Variable]) -> Result<ResolvedVariables, ResolveError> {
        resolve_variables(self.name(), &self.defined_variables(), provided)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_version_is_a_short_content_hash() {
        let a = Template::new("{}");
        let b = Template::new("{}");
        let c = Template::new("{ }");

        assert_eq!(a.version.len(), TEMPLATE_VERSION_LEN);
        assert_eq!(a.version, b.version);
        assert_ne!(a.version, c.version);
        assert!(a.version.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
