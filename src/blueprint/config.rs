// ABOUTME: Blueprint declared entirely in the YAML config.
// ABOUTME: Renders a JSON template with Parameters and user-data templated Outputs.

use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

use super::{
    Blueprint, BlueprintError, ResolvedVariables, Template, VariableDefinition, VariableType,
    parse_user_data,
};

const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

#[derive(Debug, Clone)]
pub struct ConfigBlueprint {
    name: String,
    description: Option<String>,
    variables: BTreeMap<String, VariableDefinition>,
    outputs: BTreeMap<String, String>,
}

impl ConfigBlueprint {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            variables: BTreeMap::new(),
            outputs: BTreeMap::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_variable(mut self, name: impl Into<String>, definition: VariableDefinition) -> Self {
        self.variables.insert(name.into(), definition);
        self
    }

    /// Add an output whose value is a user-data template over the resolved variables.
    pub fn with_output(mut self, name: impl Into<String>, template: impl Into<String>) -> Self {
        self.outputs.insert(name.into(), template.into());
        self
    }

    fn render_parameters(&self) -> Map<String, Value> {
        self.parameter_definitions()
            .into_iter()
            .filter_map(|(name, definition)| {
                let VariableType::Parameter { parameter_type } = &definition.var_type else {
                    return None;
                };

                let mut parameter = Map::new();
                parameter.insert("Type".into(), json!(parameter_type));
                if let Some(default) = &definition.default {
                    parameter.insert("Default".into(), json!(default.to_string()));
                }
                if let Some(description) = &definition.description {
                    parameter.insert("Description".into(), json!(description));
                }
                if !definition.allowed_values.is_empty() {
                    let allowed: Vec<String> = definition
                        .allowed_values
                        .iter()
                        .map(ToString::to_string)
                        .collect();
                    parameter.insert("AllowedValues".into(), json!(allowed));
                }
                Some((name, Value::Object(parameter)))
            })
            .collect()
    }
}

impl Blueprint for ConfigBlueprint {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn defined_variables(&self) -> BTreeMap<String, VariableDefinition> {
        self.variables.clone()
    }

    fn render(&self, variables: &ResolvedVariables) -> Result<Template, BlueprintError> {
        let mut outputs = Map::new();
        for (name, template) in &self.outputs {
            let value = parse_user_data(variables.as_map(), template, &self.name)?;
            outputs.insert(name.clone(), json!({ "Value": value }));
        }

        let mut body = Map::new();
        body.insert(
            "AWSTemplateFormatVersion".into(),
            json!(TEMPLATE_FORMAT_VERSION),
        );
        if let Some(description) = &self.description {
            body.insert("Description".into(), json!(description));
        }
        body.insert("Parameters".into(), Value::Object(self.render_parameters()));
        body.insert("Outputs".into(), Value::Object(outputs));

        Ok(Template::new(serde_json::to_string_pretty(&Value::Object(
            body,
        ))?))
    }
}
