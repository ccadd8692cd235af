// ABOUTME: Run-scoped state shared by actions, lookups and hooks.
// ABOUTME: Holds the namespace, stacks, lookup registry and data stored by hooks.

use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::lookups::LookupRegistry;
use crate::stack::Stack;
use crate::types::StackName;

/// Tag key carrying the namespace on every deployed stack.
pub const NAMESPACE_TAG: &str = "strata_namespace";

#[derive(Debug)]
pub struct Context {
    namespace: String,
    environment: BTreeMap<String, String>,
    tags: BTreeMap<String, String>,
    stacks: Vec<Arc<Stack>>,
    lookups: LookupRegistry,
    hook_data: RwLock<BTreeMap<String, Map<String, Value>>>,
}

impl Context {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            environment: BTreeMap::new(),
            tags: BTreeMap::new(),
            stacks: Vec::new(),
            lookups: LookupRegistry::with_builtins(),
            hook_data: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn with_environment(mut self, environment: BTreeMap<String, String>) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_tags(mut self, tags: BTreeMap<String, String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_lookups(mut self, lookups: LookupRegistry) -> Self {
        self.lookups = lookups;
        self
    }

    pub fn with_stack(mut self, stack: Stack) -> Self {
        self.stacks.push(Arc::new(stack));
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn environment(&self) -> &BTreeMap<String, String> {
        &self.environment
    }

    pub fn lookups(&self) -> &LookupRegistry {
        &self.lookups
    }

    /// Stacks in declaration order.
    pub fn stacks(&self) -> &[Arc<Stack>] {
        &self.stacks
    }

    pub fn stack(&self, name: &StackName) -> Option<&Arc<Stack>> {
        self.stacks.iter().find(|stack| stack.name() == name)
    }

    /// Forget outputs recorded by a previous run. Runs on one context are sequential.
    pub fn reset_outputs(&self) {
        for stack in &self.stacks {
            stack.clear_outputs();
        }
    }

    /// Tags applied to a stack: config tags, then stack tags, then the namespace tag.
    pub fn stack_tags(&self, stack: &Stack) -> BTreeMap<String, String> {
        let mut tags = self.tags.clone();
        tags.extend(stack.tags().clone());
        if !self.namespace.is_empty() {
            tags.insert(NAMESPACE_TAG.to_string(), self.namespace.clone());
        }
        tags
    }

    /// Store data returned by a hook, replacing anything under the same key.
    pub fn set_hook_data(&self, key: &str, data: Map<String, Value>) {
        let previous = self.hook_data.write().insert(key.to_string(), data);
        if previous.is_some() {
            tracing::debug!(key, "replaced existing hook data");
        }
    }

    pub fn hook_data(&self, key: &str) -> Option<Map<String, Value>> {
        self.hook_data.read().get(key).cloned()
    }
}
