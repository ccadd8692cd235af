// ABOUTME: Integration tests for hook handling around a run.
// ABOUTME: Covers required/optional semantics, disabled hooks and stored hook data.

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use strata::blueprint::BoxError;
use strata::context::Context;
use strata::diagnostics::{Diagnostics, WarningKind};
use strata::hooks::{
    Hook, HookDefinition, HookError, HookOutcome, HookRegistry, HookStage, handle_hooks,
};
use strata::provider::{Provider, StateFileProvider};

/// Returns a fixed outcome and counts its calls.
struct Fixed {
    outcome: Result<HookOutcome, &'static str>,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Hook for Fixed {
    async fn run(
        &self,
        _context: &Context,
        _provider: &dyn Provider,
        _args: &Map<String, Value>,
    ) -> Result<HookOutcome, BoxError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone().map_err(Into::into)
    }
}

fn registry(outcome: Result<HookOutcome, &'static str>) -> (HookRegistry, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut registry = HookRegistry::with_builtins();
    registry.register(
        "fixed",
        Fixed {
            outcome,
            calls: Arc::clone(&calls),
        },
    );
    (registry, calls)
}

async fn run(
    registry: &HookRegistry,
    hooks: &[HookDefinition],
    context: &Context,
) -> (Result<(), HookError>, Diagnostics) {
    let provider = StateFileProvider::in_memory();
    let mut diagnostics = Diagnostics::default();
    let result = handle_hooks(
        HookStage::PreBuild,
        hooks,
        registry,
        context,
        &provider,
        &mut diagnostics,
    )
    .await;
    (result, diagnostics)
}

mod outcomes {
    use super::*;

    #[tokio::test]
    async fn required_failure_aborts() {
        let (registry, _) = registry(Ok(HookOutcome::Failure));
        let context = Context::new("acme");
        let (result, _) = run(&registry, &[HookDefinition::new("fixed")], &context).await;
        assert!(matches!(result, Err(HookError::RequiredHookFailed { .. })));
    }

    /// Test: an optional hook that errors is logged and the next hook still runs
    #[tokio::test]
    async fn optional_error_is_swallowed() {
        let (registry, calls) = registry(Err("exploded"));
        let context = Context::new("acme");
        let hooks = [
            HookDefinition::new("fixed").optional(),
            HookDefinition::new("fixed").optional(),
        ];
        let (result, diagnostics) = run(&registry, &hooks, &context).await;

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(diagnostics.count(WarningKind::OptionalHookFailed), 2);
        assert!(diagnostics.warnings()[0].message.contains("exploded"));
    }

    #[tokio::test]
    async fn required_error_aborts() {
        let (registry, _) = registry(Err("exploded"));
        let context = Context::new("acme");
        let (result, _) = run(&registry, &[HookDefinition::new("fixed")], &context).await;
        assert!(matches!(result, Err(HookError::HookRaised { .. })));
    }

    /// Test: an empty mapping counts as a failed hook
    #[tokio::test]
    async fn empty_data_is_a_failure() {
        let (registry, _) = registry(Ok(HookOutcome::Data(Map::new())));
        let context = Context::new("acme");
        let (result, _) = run(&registry, &[HookDefinition::new("fixed")], &context).await;
        assert!(matches!(result, Err(HookError::RequiredHookFailed { .. })));
    }

    #[tokio::test]
    async fn disabled_hooks_never_run() {
        let (registry, calls) = registry(Ok(HookOutcome::Failure));
        let context = Context::new("acme");
        let (result, _) = run(&registry, &[HookDefinition::new("fixed").disabled()], &context).await;

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}

mod data {
    use super::*;

    fn mapping(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    /// Test: a later hook with the same data key replaces the earlier data
    #[tokio::test]
    async fn data_key_overwrites_previous_value() {
        let context = Context::new("acme");
        context.set_hook_data("release", mapping(json!({ "version": "1" })));

        let (registry, _) = registry(Ok(HookOutcome::Data(mapping(json!({ "version": "2" })))));
        let hooks = [HookDefinition::new("fixed").with_data_key("release")];
        let (result, _) = run(&registry, &hooks, &context).await;

        assert!(result.is_ok());
        assert_eq!(context.hook_data("release").unwrap()["version"], "2");
    }

    #[tokio::test]
    async fn command_hook_stores_output() {
        let registry = HookRegistry::with_builtins();
        let context = Context::new("acme");
        let hooks = [HookDefinition::new("command")
            .with_data_key("setup")
            .with_arg("command", "echo $STRATA_NAMESPACE $GREETING")
            .with_arg("env", json!({ "GREETING": "hello" }))];
        let (result, _) = run(&registry, &hooks, &context).await;

        assert!(result.is_ok());
        let data = context.hook_data("setup").unwrap();
        assert_eq!(data["stdout"], "acme hello");
        assert_eq!(data["exit_code"], 0);
    }
}
