// ABOUTME: A deployable stack: raw variables, dependencies, flags and per-run outputs.
// ABOUTME: Dependencies on other stacks' outputs are found by scanning raw lookup syntax.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use parking_lot::RwLock;
use std::sync::Arc;

use crate::blueprint::Blueprint;
use crate::lookups::{LookupContext, LookupError, LookupRegistry, parse_output_reference};
use crate::types::StackName;
use crate::variables::{Variable, VariableError};

/// Lookup type whose references become graph edges.
pub const OUTPUT_LOOKUP: &str = "output";

#[derive(Debug, thiserror::Error)]
#[error("outputs for stack {0} have already been recorded")]
pub struct OutputsAlreadySet(pub StackName);

pub struct Stack {
    name: StackName,
    fqn: String,
    variables: Vec<Variable>,
    requires: BTreeSet<StackName>,
    enabled: bool,
    locked: bool,
    protected: bool,
    tags: BTreeMap<String, String>,
    blueprint: Arc<dyn Blueprint>,
    outputs: RwLock<Option<BTreeMap<String, String>>>,
}

impl Stack {
    pub fn new(name: StackName, namespace: &str, blueprint: Arc<dyn Blueprint>) -> Self {
        Self {
            fqn: name.qualified(namespace),
            name,
            variables: Vec::new(),
            requires: BTreeSet::new(),
            enabled: true,
            locked: false,
            protected: false,
            tags: BTreeMap::new(),
            blueprint,
            outputs: RwLock::new(None),
        }
    }

    pub fn with_variable(mut self, variable: Variable) -> Self {
        self.variables.push(variable);
        self
    }

    pub fn with_requires(mut self, stack: StackName) -> Self {
        self.requires.insert(stack);
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn locked(mut self, locked: bool) -> Self {
        self.locked = locked;
        self
    }

    pub fn protected(mut self, protected: bool) -> Self {
        self.protected = protected;
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn name(&self) -> &StackName {
        &self.name
    }

    /// Name the provider knows this stack by.
    pub fn fqn(&self) -> &str {
        &self.fqn
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn is_protected(&self) -> bool {
        self.protected
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    pub fn blueprint(&self) -> &Arc<dyn Blueprint> {
        &self.blueprint
    }

    /// Explicit requirements plus every stack referenced by an `output` lookup.
    ///
    /// Only raw syntax is inspected; nothing is resolved.
    pub fn requires(&self) -> Result<BTreeSet<StackName>, LookupError> {
        let mut requires = self.requires.clone();
        for variable in &self.variables {
            for lookup in variable.raw().lookups() {
                if lookup.kind == OUTPUT_LOOKUP {
                    let (stack, _) = parse_output_reference(&lookup.input)?;
                    requires.insert(stack);
                }
            }
        }
        Ok(requires)
    }

    /// Outputs recorded during the current run.
    pub fn outputs(&self) -> Option<BTreeMap<String, String>> {
        self.outputs.read().clone()
    }

    /// Record outputs once per run; a second write before [`Stack::clear_outputs`] fails.
    pub fn set_outputs(&self, outputs: BTreeMap<String, String>) -> Result<(), OutputsAlreadySet> {
        let mut slot = self.outputs.write();
        if slot.is_some() {
            return Err(OutputsAlreadySet(self.name.clone()));
        }
        *slot = Some(outputs);
        Ok(())
    }

    pub fn clear_outputs(&self) {
        self.outputs.write().take();
    }

    /// Resolved copies of this stack's variables.
    ///
    /// Each call resolves independently, so one stack's lookup failure never
    /// touches another stack's variables.
    pub async fn resolve_variables(
        &self,
        registry: &LookupRegistry,
        ctx: &LookupContext<'_>,
    ) -> Result<Vec<Variable>, VariableError> {
        let mut resolved = Vec::with_capacity(self.variables.len());
        for variable in &self.variables {
            let mut variable = variable.clone();
            variable.resolve(registry, ctx).await?;
            resolved.push(variable);
        }
        Ok(resolved)
    }
}

impl fmt::Debug for Stack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stack")
            .field("name", &self.name)
            .field("fqn", &self.fqn)
            .field("requires", &self.requires)
            .field("enabled", &self.enabled)
            .field("locked", &self.locked)
            .field("protected", &self.protected)
            .field("blueprint", &self.blueprint.name())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blueprint::ConfigBlueprint;
    use crate::variables::RawValue;

    fn name(s: &str) -> StackName {
        StackName::new(s).unwrap()
    }

    fn stack(s: &str) -> Stack {
        Stack::new(name(s), "acme", Arc::new(ConfigBlueprint::new(s)))
    }

    #[test]
    fn fqn_includes_namespace() {
        assert_eq!(stack("vpc").fqn(), "acme-vpc");
    }

    #[test]
    fn requires_unions_explicit_and_output_references() {
        let app = stack("app")
            .with_requires(name("db"))
            .with_variable(Variable::new(
                "VpcId",
                RawValue::parse_str("${output vpc::VpcId}"),
            ))
            .with_variable(Variable::new("User", RawValue::parse_str("${envvar USER}")));

        let requires = app.requires().unwrap();
        assert_eq!(
            requires.into_iter().collect::<Vec<_>>(),
            vec![name("db"), name("vpc")]
        );
    }

    #[test]
    fn xref_lookups_add_no_dependency() {
        let app = stack("app").with_variable(Variable::new(
            "Shared",
            RawValue::parse_str("${xref other-vpc::VpcId}"),
        ));
        assert!(app.requires().unwrap().is_empty());
    }

    #[test]
    fn outputs_are_write_once() {
        let vpc = stack("vpc");
        assert!(vpc.outputs().is_none());
        vpc.set_outputs(BTreeMap::from([("VpcId".into(), "vpc-1".into())]))
            .unwrap();
        assert!(vpc.set_outputs(BTreeMap::new()).is_err());
        assert_eq!(vpc.outputs().unwrap()["VpcId"], "vpc-1");
    }

    #[test]
    fn cleared_outputs_can_be_recorded_again() {
        let vpc = stack("vpc");
        vpc.set_outputs(BTreeMap::from([("VpcId".into(), "vpc-1".into())]))
            .unwrap();
        vpc.clear_outputs();
        assert!(vpc.outputs().is_none());

        vpc.set_outputs(BTreeMap::from([("VpcId".into(), "vpc-2".into())]))
            .unwrap();
        assert_eq!(vpc.outputs().unwrap()["VpcId"], "vpc-2");
    }
}
