// ABOUTME: Integration tests for the stack dependency graph.
// ABOUTME: Covers edge inference from output lookups, cycles and ordering properties.

use proptest::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;
use strata::blueprint::ConfigBlueprint;
use strata::graph::{Graph, GraphError};
use strata::stack::Stack;
use strata::types::StackName;
use strata::variables::{RawValue, Variable};

fn name(value: &str) -> StackName {
    StackName::new(value).unwrap()
}

fn stack(value: &str) -> Stack {
    Stack::new(name(value), "acme", Arc::new(ConfigBlueprint::new(value)))
}

mod construction {
    use super::*;

    /// Test: an output lookup adds an edge without resolving anything
    #[test]
    fn output_lookup_creates_edge() {
        let stacks = vec![
            Arc::new(stack("vpc")),
            Arc::new(stack("app").with_variable(Variable::new(
                "VpcId",
                RawValue::parse_str("${output vpc::VpcId}"),
            ))),
        ];
        let graph = Graph::from_stacks(&stacks).unwrap();

        let deps: Vec<_> = graph.dependencies(&name("app")).cloned().collect();
        assert_eq!(deps, vec![name("vpc")]);
        let dependents: Vec<_> = graph.dependents(&name("vpc")).cloned().collect();
        assert_eq!(dependents, vec![name("app")]);
    }

    /// Test: xref lookups point outside the config and add no edge
    #[test]
    fn xref_lookup_creates_no_edge() {
        let stacks = vec![
            Arc::new(stack("vpc")),
            Arc::new(stack("app").with_variable(Variable::new(
                "VpcId",
                RawValue::parse_str("${xref other-vpc::VpcId}"),
            ))),
        ];
        let graph = Graph::from_stacks(&stacks).unwrap();
        assert_eq!(graph.dependencies(&name("app")).count(), 0);
    }

    #[test]
    fn reference_to_undeclared_stack_is_rejected() {
        let stacks = vec![Arc::new(stack("app").with_requires(name("vpc")))];
        let err = Graph::from_stacks(&stacks).unwrap_err();
        assert!(matches!(
            err,
            GraphError::UnknownDependency { dependency, .. } if dependency == name("vpc")
        ));
    }

    #[test]
    fn malformed_output_reference_is_rejected() {
        let stacks = vec![Arc::new(stack("app").with_variable(Variable::new(
            "VpcId",
            RawValue::parse_str("${output vpc}"),
        )))];
        assert!(matches!(
            Graph::from_stacks(&stacks),
            Err(GraphError::InvalidReference { .. })
        ));
    }

    #[test]
    fn self_dependency_is_rejected() {
        let mut graph = Graph::new();
        graph.add_node(name("vpc"));
        assert!(matches!(
            graph.add_dependency(&name("vpc"), &name("vpc")),
            Err(GraphError::SelfDependency(_))
        ));
    }
}

mod cycles {
    use super::*;

    /// Test: a cycle names only its members, not the stacks downstream of it
    #[test]
    fn cycle_error_names_members() {
        let stacks = vec![
            Arc::new(stack("a").with_requires(name("b"))),
            Arc::new(stack("b").with_requires(name("a"))),
            Arc::new(stack("c").with_requires(name("a"))),
            Arc::new(stack("d")),
        ];
        let err = Graph::from_stacks(&stacks).unwrap_err();
        match err {
            GraphError::CyclicDependency { nodes } => {
                assert_eq!(nodes, vec![name("a"), name("b")]);
            }
            other => panic!("expected a cycle, got {other:?}"),
        }
    }

    #[test]
    fn steps_yield_layers_before_the_cycle() {
        let mut graph = Graph::new();
        for n in ["base", "x", "y"] {
            graph.add_node(name(n));
        }
        graph.add_dependency(&name("x"), &name("base")).unwrap();
        graph.add_dependency(&name("x"), &name("y")).unwrap();
        graph.add_dependency(&name("y"), &name("x")).unwrap();

        let mut steps = graph.topological_steps();
        assert_eq!(steps.next().unwrap().unwrap(), vec![name("base")]);
        assert!(steps.next().unwrap().is_err());
        assert!(steps.next().is_none());
    }
}

mod derived {
    use super::*;

    fn chain() -> Graph {
        let stacks = vec![
            Arc::new(stack("vpc")),
            Arc::new(stack("db").with_requires(name("vpc"))),
            Arc::new(
                stack("app")
                    .with_requires(name("db"))
                    .with_requires(name("vpc")),
            ),
        ];
        Graph::from_stacks(&stacks).unwrap()
    }

    #[test]
    fn transitive_reduction_drops_implied_edges() {
        let reduced = chain().transitive_reduction();
        let deps: Vec<_> = reduced.dependencies(&name("app")).cloned().collect();
        assert_eq!(deps, vec![name("db")]);
        assert_eq!(reduced.len(), 3);
    }

    #[test]
    fn dot_output_lists_edges() {
        let dot = chain().to_dot();
        assert!(dot.starts_with("digraph strata {"));
        assert!(dot.contains("\"app\" -> \"db\";"));
        assert!(dot.contains("\"db\" -> \"vpc\";"));
    }

    #[test]
    fn json_output_lists_dependencies() {
        let json = serde_json::to_value(chain()).unwrap();
        assert_eq!(json["dependencies"]["db"], serde_json::json!(["vpc"]));
    }
}

/// Random DAG: node `i` may only depend on nodes with a smaller index.
fn dag() -> impl Strategy<Value = Graph> {
    (1usize..12)
        .prop_flat_map(|n| (Just(n), proptest::collection::vec(any::<bool>(), n * n)))
        .prop_map(|(n, edges)| {
            let mut graph = Graph::new();
            for i in 0..n {
                graph.add_node(name(&format!("s{i}")));
            }
            for i in 0..n {
                for j in 0..i {
                    if edges[i * n + j] {
                        graph
                            .add_dependency(&name(&format!("s{i}")), &name(&format!("s{j}")))
                            .unwrap();
                    }
                }
            }
            graph
        })
}

proptest! {
    /// Test: every stack appears after all of its dependencies
    #[test]
    fn order_respects_dependencies(graph in dag()) {
        let order = graph.topological_order().unwrap();
        prop_assert_eq!(order.len(), graph.len());

        let mut seen = BTreeSet::new();
        for stack in &order {
            for dependency in graph.dependencies(stack) {
                prop_assert!(seen.contains(dependency));
            }
            seen.insert(stack.clone());
        }
    }

    /// Test: transposing reverses every edge
    #[test]
    fn transposed_reverses_edges(graph in dag()) {
        let transposed = graph.transposed();
        for stack in graph.nodes() {
            for dependency in graph.dependencies(stack) {
                prop_assert!(transposed.dependencies(dependency).any(|d| d == stack));
            }
        }
        prop_assert_eq!(transposed.transposed(), graph);
    }

    /// Test: filtering keeps the target and everything it needs
    #[test]
    fn filtered_keeps_transitive_dependencies(graph in dag()) {
        let target = graph.nodes().last().cloned().unwrap();
        let filtered = graph.filtered(|n| *n == target);

        prop_assert!(filtered.contains(&target));
        for stack in filtered.nodes() {
            for dependency in graph.dependencies(stack) {
                prop_assert!(filtered.contains(dependency));
            }
        }
    }
}
