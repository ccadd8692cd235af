// ABOUTME: `blueprint:` section of a stack: declared variables and templated outputs.
// ABOUTME: Converts YAML variable specs into typed variable definitions.

use serde::Deserialize;
use std::collections::BTreeMap;

use super::ConfigError;
use crate::blueprint::{ConfigBlueprint, VariableDefinition, VariableType};
use crate::variables::VariableValue;

const DEFAULT_PARAMETER_TYPE: &str = "String";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BlueprintConfig {
    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub variables: BTreeMap<String, VariableSpec>,

    /// Output name to user-data template over resolved variables.
    #[serde(default)]
    pub outputs: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariableSpec {
    #[serde(default, rename = "type")]
    pub var_type: Option<String>,

    #[serde(default)]
    pub parameter_type: Option<String>,

    #[serde(default)]
    pub default: Option<serde_yaml::Value>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub allowed_values: Vec<serde_yaml::Value>,
}

impl VariableSpec {
    fn to_definition(&self, blueprint: &str, variable: &str) -> Result<VariableDefinition, ConfigError> {
        let var_type = match self.var_type.as_deref() {
            None => {
                return Err(ConfigError::VariableTypeRequired {
                    blueprint: blueprint.to_string(),
                    variable: variable.to_string(),
                });
            }
            Some("string") => VariableType::String,
            Some("bool") => VariableType::Bool,
            Some("integer") => VariableType::Integer,
            Some("list") => VariableType::List,
            Some("parameter") => VariableType::parameter(
                self.parameter_type
                    .as_deref()
                    .unwrap_or(DEFAULT_PARAMETER_TYPE),
            ),
            Some(other) => {
                return Err(ConfigError::UnknownVariableType {
                    blueprint: blueprint.to_string(),
                    variable: variable.to_string(),
                    var_type: other.to_string(),
                });
            }
        };

        let value = |yaml: &serde_yaml::Value| {
            VariableValue::from_yaml(yaml).map_err(|source| ConfigError::InvalidValue {
                owner: blueprint.to_string(),
                variable: variable.to_string(),
                source,
            })
        };

        let mut definition = VariableDefinition::new(var_type);
        if let Some(default) = &self.default {
            definition.default = Some(value(default)?);
        }
        definition.description = self.description.clone();
        definition.allowed_values = self
            .allowed_values
            .iter()
            .map(value)
            .collect::<Result<_, _>>()?;
        Ok(definition)
    }
}

impl BlueprintConfig {
    pub fn to_blueprint(&self, name: &str) -> Result<ConfigBlueprint, ConfigError> {
        let mut blueprint = ConfigBlueprint::new(name);
        if let Some(description) = &self.description {
            blueprint = blueprint.with_description(description);
        }
        for (variable, spec) in &self.variables {
            blueprint = blueprint.with_variable(variable, spec.to_definition(name, variable)?);
        }
        for (output, template) in &self.outputs {
            blueprint = blueprint.with_output(output, template);
        }
        Ok(blueprint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blueprint::Blueprint;

    #[test]
    fn missing_type_is_rejected() {
        let config: BlueprintConfig =
            serde_yaml::from_str("variables:\n  Cidr:\n    default: 10.0.0.0/16\n").unwrap();
        assert!(matches!(
            config.to_blueprint("vpc"),
            Err(ConfigError::VariableTypeRequired { variable, .. }) if variable == "Cidr"
        ));
    }

    #[test]
    fn unknown_type_is_rejected() {
        let config: BlueprintConfig =
            serde_yaml::from_str("variables:\n  Cidr:\n    type: float\n").unwrap();
        assert!(matches!(
            config.to_blueprint("vpc"),
            Err(ConfigError::UnknownVariableType { .. })
        ));
    }

    #[test]
    fn builds_typed_definitions() {
        let yaml = r#"
description: Core network
variables:
  Cidr: { type: parameter, parameter_type: String, default: "10.0.0.0/16" }
  Size: { type: integer, default: 3, allowed_values: [1, 3, 5] }
outputs:
  VpcId: "vpc-${Cidr}"
"#;
        let config: BlueprintConfig = serde_yaml::from_str(yaml).unwrap();
        let blueprint = config.to_blueprint("vpc").unwrap();
        let variables = blueprint.defined_variables();

        assert!(variables["Cidr"].var_type.is_parameter());
        assert_eq!(variables["Size"].default, Some(VariableValue::Integer(3)));
        assert_eq!(variables["Size"].allowed_values.len(), 3);
        assert_eq!(blueprint.description(), Some("Core network"));
    }
}
