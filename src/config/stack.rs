// ABOUTME: One entry of the `stacks:` list and its conversion into a Stack.
// ABOUTME: Parses raw variable values and rejects unknown lookup types up front.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::ConfigError;
use super::blueprint::BlueprintConfig;
use crate::lookups::LookupRegistry;
use crate::stack::Stack;
use crate::types::StackName;
use crate::variables::Variable;

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StackConfig {
    pub name: StackName,

    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Keep an existing stack as-is; only its outputs are read.
    #[serde(default)]
    pub locked: bool,

    /// Never destroy this stack.
    #[serde(default)]
    pub protected: bool,

    #[serde(default)]
    pub requires: Vec<StackName>,

    #[serde(default)]
    pub tags: BTreeMap<String, String>,

    #[serde(default)]
    pub variables: BTreeMap<String, serde_yaml::Value>,

    #[serde(default)]
    pub blueprint: BlueprintConfig,
}

impl StackConfig {
    pub fn to_stack(&self, namespace: &str, lookups: &LookupRegistry) -> Result<Stack, ConfigError> {
        let blueprint = self.blueprint.to_blueprint(self.name.as_str())?;

        let mut stack = Stack::new(self.name.clone(), namespace, Arc::new(blueprint))
            .enabled(self.enabled)
            .locked(self.locked)
            .protected(self.protected);

        for dependency in &self.requires {
            stack = stack.with_requires(dependency.clone());
        }
        for (key, value) in &self.tags {
            stack = stack.with_tag(key, value);
        }

        for (name, value) in &self.variables {
            let variable =
                Variable::from_yaml(name, value).map_err(|source| ConfigError::InvalidValue {
                    owner: self.name.to_string(),
                    variable: name.clone(),
                    source,
                })?;

            for lookup in variable.raw().lookups() {
                if lookups.validate(lookup).is_err() {
                    return Err(ConfigError::UnknownLookupType {
                        stack: self.name.clone(),
                        variable: name.clone(),
                        kind: lookup.kind.clone(),
                    });
                }
            }
            stack = stack.with_variable(variable);
        }

        Ok(stack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_lookup_type_is_rejected() {
        let config: StackConfig = serde_yaml::from_str(
            "name: app\nvariables:\n  Secret: \"${kms alias/app::token}\"\n",
        )
        .unwrap();
        let err = config
            .to_stack("acme", &LookupRegistry::with_builtins())
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownLookupType { kind, .. } if kind == "kms"));
    }

    #[test]
    fn flags_default_to_enabled_and_unlocked() {
        let config: StackConfig = serde_yaml::from_str("name: vpc\n").unwrap();
        let stack = config
            .to_stack("acme", &LookupRegistry::with_builtins())
            .unwrap();
        assert!(stack.is_enabled());
        assert!(!stack.is_locked());
        assert!(!stack.is_protected());
        assert_eq!(stack.fqn(), "acme-vpc");
    }

    #[test]
    fn invalid_stack_names_fail_to_parse() {
        assert!(serde_yaml::from_str::<StackConfig>("name: my_vpc\n").is_err());
    }
}
