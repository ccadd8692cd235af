// ABOUTME: Directed acyclic graph of stacks, built from explicit and inferred dependencies.
// ABOUTME: Produces topological layers with Kahn's algorithm and detects cycles.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::sync::Arc;

use crate::lookups::LookupError;
use crate::stack::Stack;
use crate::types::StackName;

#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("stack {0} is not in the graph")]
    UnknownNode(StackName),

    #[error("stack {0} cannot depend on itself")]
    SelfDependency(StackName),

    #[error("stack {0} is defined more than once")]
    DuplicateStack(StackName),

    #[error("stack {stack} depends on {dependency}, which is not defined")]
    UnknownDependency {
        stack: StackName,
        dependency: StackName,
    },

    #[error("stack {stack} has an invalid output reference: {source}")]
    InvalidReference {
        stack: StackName,
        #[source]
        source: LookupError,
    },

    #[error("cyclic dependency between stacks: {}", join(.nodes))]
    CyclicDependency { nodes: Vec<StackName> },
}

fn join(names: &[StackName]) -> String {
    names
        .iter()
        .map(StackName::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Stack dependency graph. An edge `dependency -> stack` means `stack` needs
/// `dependency` to be applied first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Graph {
    dependencies: BTreeMap<StackName, BTreeSet<StackName>>,
    #[serde(skip)]
    dependents: BTreeMap<StackName, BTreeSet<StackName>>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph for `stacks`, adding explicit `requires` edges and one
    /// edge per `output` lookup. Fails on unknown references and cycles.
    pub fn from_stacks(stacks: &[Arc<Stack>]) -> Result<Self, GraphError> {
        let mut graph = Self::new();
        for stack in stacks {
            if !graph.add_node(stack.name().clone()) {
                return Err(GraphError::DuplicateStack(stack.name().clone()));
            }
        }

        for stack in stacks {
            let requires = stack
                .requires()
                .map_err(|source| GraphError::InvalidReference {
                    stack: stack.name().clone(),
                    source,
                })?;

            for dependency in requires {
                if !graph.contains(&dependency) {
                    return Err(GraphError::UnknownDependency {
                        stack: stack.name().clone(),
                        dependency,
                    });
                }
                graph.add_dependency(stack.name(), &dependency)?;
            }
        }

        // Surface cycles before anything runs.
        graph.topological_order()?;
        tracing::debug!(stacks = graph.len(), "built dependency graph");
        Ok(graph)
    }

    /// Add a node; returns false if it was already present.
    pub fn add_node(&mut self, stack: StackName) -> bool {
        if self.dependencies.contains_key(&stack) {
            return false;
        }
        self.dependencies.insert(stack.clone(), BTreeSet::new());
        self.dependents.insert(stack, BTreeSet::new());
        true
    }

    /// Record that `stack` depends on `dependency`.
    pub fn add_dependency(
        &mut self,
        stack: &StackName,
        dependency: &StackName,
    ) -> Result<(), GraphError> {
        if stack == dependency {
            return Err(GraphError::SelfDependency(stack.clone()));
        }
        for node in [stack, dependency] {
            if !self.contains(node) {
                return Err(GraphError::UnknownNode(node.clone()));
            }
        }

        if let Some(deps) = self.dependencies.get_mut(stack) {
            deps.insert(dependency.clone());
        }
        if let Some(dependents) = self.dependents.get_mut(dependency) {
            dependents.insert(stack.clone());
        }
        Ok(())
    }

    pub fn contains(&self, stack: &StackName) -> bool {
        self.dependencies.contains_key(stack)
    }

    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &StackName> {
        self.dependencies.keys()
    }

    /// Stacks that must be applied before `stack`.
    pub fn dependencies(&self, stack: &StackName) -> impl Iterator<Item = &StackName> {
        self.dependencies.get(stack).into_iter().flatten()
    }

    /// Stacks that depend directly on `stack`.
    pub fn dependents(&self, stack: &StackName) -> impl Iterator<Item = &StackName> {
        self.dependents.get(stack).into_iter().flatten()
    }

    /// Layers of stacks whose dependencies are all in earlier layers.
    ///
    /// The iterator is lazy and single-use; a cycle ends it with
    /// [`GraphError::CyclicDependency`].
    pub fn topological_steps(&self) -> TopologicalSteps<'_> {
        let in_degree = self
            .dependencies
            .iter()
            .map(|(stack, deps)| (stack.clone(), deps.len()))
            .collect();
        TopologicalSteps {
            graph: self,
            in_degree,
            failed: false,
        }
    }

    /// All layers flattened into one valid application order.
    pub fn topological_order(&self) -> Result<Vec<StackName>, GraphError> {
        let mut order = Vec::with_capacity(self.len());
        for step in self.topological_steps() {
            order.extend(step?);
        }
        Ok(order)
    }

    /// The same graph with every edge reversed, used for destroy order.
    pub fn transposed(&self) -> Self {
        Self {
            dependencies: self.dependents.clone(),
            dependents: self.dependencies.clone(),
        }
    }

    /// Induced subgraph over the matching stacks plus everything they depend on.
    pub fn filtered(&self, predicate: impl Fn(&StackName) -> bool) -> Self {
        let mut keep = BTreeSet::new();
        let mut stack: Vec<&StackName> = self.nodes().filter(|name| predicate(name)).collect();

        while let Some(name) = stack.pop() {
            if keep.insert(name.clone()) {
                stack.extend(self.dependencies(name));
            }
        }

        let mut graph = Self::new();
        for name in &keep {
            graph.add_node(name.clone());
        }
        for name in &keep {
            for dependency in self.dependencies(name) {
                if let Some(deps) = graph.dependencies.get_mut(name) {
                    deps.insert(dependency.clone());
                }
                if let Some(dependents) = graph.dependents.get_mut(dependency) {
                    dependents.insert(name.clone());
                }
            }
        }
        graph
    }

    /// Drop every edge already implied by a longer path.
    pub fn transitive_reduction(&self) -> Self {
        let mut reduced = Self::new();
        for name in self.nodes() {
            reduced.add_node(name.clone());
        }

        for (stack, deps) in &self.dependencies {
            for dependency in deps {
                let implied = deps
                    .iter()
                    .filter(|other| *other != dependency)
                    .any(|other| self.reaches(other, dependency));
                if !implied {
                    if let Some(set) = reduced.dependencies.get_mut(stack) {
                        set.insert(dependency.clone());
                    }
                    if let Some(set) = reduced.dependents.get_mut(dependency) {
                        set.insert(stack.clone());
                    }
                }
            }
        }
        reduced
    }

    /// True when `target` is a transitive dependency of `from`.
    fn reaches(&self, from: &StackName, target: &StackName) -> bool {
        let mut seen = BTreeSet::new();
        let mut pending = vec![from];
        while let Some(name) = pending.pop() {
            if name == target {
                return true;
            }
            if seen.insert(name) {
                pending.extend(self.dependencies(name));
            }
        }
        false
    }

    /// Graphviz rendering; each edge points from a stack to what it requires.
    pub fn to_dot(&self) -> String {
        let mut dot = String::from("digraph strata {\n");
        for name in self.nodes() {
            let _ = writeln!(dot, "  \"{name}\";");
        }
        for (stack, deps) in &self.dependencies {
            for dependency in deps {
                let _ = writeln!(dot, "  \"{stack}\" -> \"{dependency}\";");
            }
        }
        dot.push_str("}\n");
        dot
    }
}

pub struct TopologicalSteps<'a> {
    graph: &'a Graph,
    in_degree: BTreeMap<StackName, usize>,
    failed: bool,
}

impl TopologicalSteps<'_> {
    /// Narrow the unresolved set to nodes that sit on a cycle.
    fn cycle_members(&self) -> Vec<StackName> {
        let mut remaining: BTreeSet<&StackName> = self.in_degree.keys().collect();
        loop {
            let sinks: Vec<&StackName> = remaining
                .iter()
                .copied()
                .filter(|name| {
                    !self
                        .graph
                        .dependents(name)
                        .any(|dependent| remaining.contains(dependent))
                })
                .collect();
            if sinks.is_empty() {
                break;
            }
            for sink in sinks {
                remaining.remove(sink);
            }
        }
        remaining.into_iter().cloned().collect()
    }
}

impl Iterator for TopologicalSteps<'_> {
    type Item = Result<Vec<StackName>, GraphError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.in_degree.is_empty() {
            return None;
        }

        let ready: Vec<StackName> = self
            .in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(name, _)| name.clone())
            .collect();

        if ready.is_empty() {
            self.failed = true;
            return Some(Err(GraphError::CyclicDependency {
                nodes: self.cycle_members(),
            }));
        }

        for name in &ready {
            self.in_degree.remove(name);
            for dependent in self.graph.dependents(name) {
                if let Some(degree) = self.in_degree.get_mut(dependent) {
                    *degree = degree.saturating_sub(1);
                }
            }
        }
        Some(Ok(ready))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> StackName {
        StackName::new(s).unwrap()
    }

    /// vpc <- db <- app, vpc <- app
    fn sample() -> Graph {
        let mut graph = Graph::new();
        for n in ["vpc", "db", "app", "cdn"] {
            graph.add_node(name(n));
        }
        graph.add_dependency(&name("db"), &name("vpc")).unwrap();
        graph.add_dependency(&name("app"), &name("db")).unwrap();
        graph.add_dependency(&name("app"), &name("vpc")).unwrap();
        graph
    }

    #[test]
    fn layers_respect_dependencies() {
        let steps: Vec<Vec<StackName>> = sample()
            .topological_steps()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(
            steps,
            vec![
                vec![name("cdn"), name("vpc")],
                vec![name("db")],
                vec![name("app")],
            ]
        );
    }

    #[test]
    fn cycle_is_reported_with_members() {
        let mut graph = sample();
        graph.add_node(name("worker"));
        graph.add_dependency(&name("vpc"), &name("app")).unwrap();
        graph.add_dependency(&name("worker"), &name("app")).unwrap();

        match graph.topological_order().unwrap_err() {
            GraphError::CyclicDependency { nodes } => {
                assert_eq!(nodes, vec![name("app"), name("db"), name("vpc")]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn self_and_unknown_dependencies_are_rejected() {
        let mut graph = sample();
        assert!(matches!(
            graph.add_dependency(&name("vpc"), &name("vpc")),
            Err(GraphError::SelfDependency(_))
        ));
        assert!(matches!(
            graph.add_dependency(&name("vpc"), &name("ghost")),
            Err(GraphError::UnknownNode(_))
        ));
    }

    #[test]
    fn transposed_reverses_every_edge() {
        let graph = sample();
        let transposed = graph.transposed();
        for stack in graph.nodes() {
            for dependency in graph.dependencies(stack) {
                assert!(transposed.dependencies(dependency).any(|d| d == stack));
            }
        }
        assert_eq!(
            transposed.topological_order().unwrap().first(),
            Some(&name("app"))
        );
    }

    #[test]
    fn filtered_keeps_transitive_dependencies() {
        let filtered = sample().filtered(|n| n.as_str() == "app");
        let nodes: Vec<&StackName> = filtered.nodes().collect();
        assert_eq!(nodes, vec![&name("app"), &name("db"), &name("vpc")]);
        assert!(filtered.dependencies(&name("app")).any(|d| d == &name("db")));
    }

    #[test]
    fn transitive_reduction_drops_implied_edges() {
        let reduced = sample().transitive_reduction();
        let deps: Vec<&StackName> = reduced.dependencies(&name("app")).collect();
        assert_eq!(deps, vec![&name("db")]);
    }

    #[test]
    fn dot_lists_nodes_and_edges() {
        let dot = sample().to_dot();
        assert!(dot.starts_with("digraph strata {"));
        assert!(dot.contains("\"app\" -> \"db\";"));
        assert!(dot.contains("\"cdn\";"));
    }
}
