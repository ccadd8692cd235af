// ABOUTME: Integration tests for variable resolution, lookups and blueprint validation.
// ABOUTME: Environment lookups run under temp-env so tests never leak process state.

use std::collections::BTreeMap;
use std::sync::Arc;
use strata::blueprint::{
    ConfigBlueprint, ResolveError, Validator, VariableDefinition, VariableType, parse_user_data,
    resolve_variables,
};
use strata::context::Context;
use strata::lookups::{LookupContext, LookupError};
use strata::provider::{ChangeRequest, Provider, StateFileProvider};
use strata::stack::Stack;
use strata::types::StackName;
use strata::variables::{RawValue, Variable, VariableError, VariableValue};

fn name(value: &str) -> StackName {
    StackName::new(value).unwrap()
}

fn stack(value: &str) -> Stack {
    Stack::new(name(value), "acme", Arc::new(ConfigBlueprint::new(value)))
}

async fn resolve(
    context: &Context,
    provider: &dyn Provider,
    raw: &str,
) -> Result<VariableValue, VariableError> {
    let mut variable = Variable::new("Value", RawValue::parse_str(raw));
    variable
        .resolve(context.lookups(), &LookupContext::new(context, provider))
        .await?;
    variable.value().cloned()
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(future)
}

mod lookups {
    use super::*;

    #[test]
    fn envvar_reads_the_process_environment() {
        temp_env::with_var("STRATA_TEST_REGION", Some("ap-south-1"), || {
            let context = Context::new("acme");
            let provider = StateFileProvider::in_memory();
            let value = block_on(resolve(
                &context,
                &provider,
                "${envvar STRATA_TEST_REGION}",
            ))
            .unwrap();
            assert_eq!(value, VariableValue::String("ap-south-1".into()));
        });
    }

    /// Test: a lookup embedded in text must produce a string and is concatenated
    #[test]
    fn concatenated_lookups_build_a_string() {
        temp_env::with_vars(
            [("STRATA_TEST_A", Some("left")), ("STRATA_TEST_B", Some("right"))],
            || {
                let context = Context::new("acme");
                let provider = StateFileProvider::in_memory();
                let value = block_on(resolve(
                    &context,
                    &provider,
                    "${envvar STRATA_TEST_A}-${envvar STRATA_TEST_B}!",
                ))
                .unwrap();
                assert_eq!(value, VariableValue::String("left-right!".into()));
            },
        );
    }

    #[test]
    fn missing_envvar_fails_the_variable() {
        temp_env::with_var_unset("STRATA_TEST_MISSING", || {
            let context = Context::new("acme");
            let provider = StateFileProvider::in_memory();
            let err = block_on(resolve(&context, &provider, "${envvar STRATA_TEST_MISSING}"))
                .unwrap_err();
            assert!(matches!(
                err,
                VariableError::FailedLookup {
                    source: LookupError::MissingEnvironmentVariable(_),
                    ..
                }
            ));
        });
    }

    #[tokio::test]
    async fn default_lookup_falls_back() {
        let environment = BTreeMap::from([("region".to_string(), "eu-west-1".to_string())]);
        let context = Context::new("acme").with_environment(environment);
        let provider = StateFileProvider::in_memory();

        let set = resolve(&context, &provider, "${default region::us-east-1}").await;
        assert_eq!(set.unwrap(), VariableValue::String("eu-west-1".into()));
        let unset = resolve(&context, &provider, "${default zone::a}").await;
        assert_eq!(unset.unwrap(), VariableValue::String("a".into()));
    }

    /// Test: an output lookup reads the provider when nothing was recorded this run
    #[tokio::test]
    async fn output_lookup_falls_back_to_provider() {
        let provider = StateFileProvider::in_memory();
        let template = strata::blueprint::Template::new(r#"{"Outputs":{"VpcId":{"Value":"vpc-1"}}}"#);
        provider
            .create_or_update(ChangeRequest {
                fqn: "acme-vpc",
                template: &template,
                parameters: &BTreeMap::new(),
                tags: &BTreeMap::new(),
            })
            .await
            .unwrap();

        let context = Context::new("acme").with_stack(stack("vpc"));
        let value = resolve(&context, &provider, "${output vpc::VpcId}").await;
        assert_eq!(value.unwrap(), VariableValue::String("vpc-1".into()));
    }

    #[tokio::test]
    async fn output_lookup_prefers_recorded_outputs() {
        let context = Context::new("acme").with_stack(stack("vpc"));
        let outputs = BTreeMap::from([("VpcId".to_string(), "vpc-recorded".to_string())]);
        context.stacks()[0].set_outputs(outputs).unwrap();

        let provider = StateFileProvider::in_memory();
        let value = resolve(&context, &provider, "${output vpc::VpcId}").await;
        assert_eq!(value.unwrap(), VariableValue::String("vpc-recorded".into()));

        let missing = resolve(&context, &provider, "${output vpc::SubnetId}").await;
        assert!(matches!(
            missing,
            Err(VariableError::FailedLookup {
                source: LookupError::OutputDoesNotExist { .. },
                ..
            })
        ));
    }

    #[tokio::test]
    async fn xref_requires_a_deployed_stack() {
        let context = Context::new("acme");
        let provider = StateFileProvider::in_memory();
        let err = resolve(&context, &provider, "${xref shared-vpc::VpcId}")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            VariableError::FailedLookup {
                source: LookupError::StackDoesNotExist(_),
                ..
            }
        ));
    }
}

mod blueprint_variables {
    use super::*;

    fn definitions(pairs: Vec<(&str, VariableDefinition)>) -> BTreeMap<String, VariableDefinition> {
        pairs
            .into_iter()
            .map(|(name, definition)| (name.to_string(), definition))
            .collect()
    }

    #[test]
    fn defaults_fill_missing_variables() {
        let defs = definitions(vec![(
            "Size",
            VariableDefinition::new(VariableType::Integer).with_default(3_i64),
        )]);
        let resolved = resolve_variables("web", &defs, &[]).unwrap();
        assert_eq!(resolved.get("Size"), Some(&VariableValue::Integer(3)));
    }

    #[test]
    fn wrong_type_is_rejected() {
        let defs = definitions(vec![("Size", VariableDefinition::new(VariableType::Integer))]);
        let provided = [Variable::new("Size", VariableValue::from("three"))];
        let err = resolve_variables("web", &defs, &provided).unwrap_err();
        assert!(matches!(err, ResolveError::TypeMismatch { variable, .. } if variable == "Size"));
    }

    #[test]
    fn values_outside_allowed_set_are_rejected() {
        let defs = definitions(vec![(
            "Env",
            VariableDefinition::new(VariableType::String).with_allowed_values(["dev", "prod"]),
        )]);
        let provided = [Variable::new("Env", VariableValue::from("staging"))];
        let err = resolve_variables("web", &defs, &provided).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid value 'staging' for variable Env, allowed values: dev, prod"
        );
    }

    /// Test: a validator may transform the value before the type check
    #[test]
    fn validator_runs_before_coercion() {
        let upper = Validator::new("upper", |value: VariableValue| match value {
            VariableValue::String(s) => Ok(VariableValue::String(s.to_uppercase())),
            other => Err(format!("expected a string, got {}", other.kind()).into()),
        });
        let defs = definitions(vec![(
            "Env",
            VariableDefinition::new(VariableType::String).with_validator(upper),
        )]);

        let provided = [Variable::new("Env", VariableValue::from("prod"))];
        let resolved = resolve_variables("web", &defs, &provided).unwrap();
        assert_eq!(resolved.get("Env"), Some(&VariableValue::String("PROD".into())));

        let provided = [Variable::new("Env", VariableValue::from(true))];
        let err = resolve_variables("web", &defs, &provided).unwrap_err();
        assert!(matches!(err, ResolveError::ValidatorError { validator, .. } if validator == "upper"));
    }

    /// Test: any scalar becomes a provider parameter through its string form
    #[test]
    fn parameters_accept_scalars() {
        let defs = definitions(vec![(
            "Count",
            VariableDefinition::new(VariableType::parameter("Number")),
        )]);
        let provided = [Variable::new("Count", VariableValue::from(5_i64))];
        let resolved = resolve_variables("web", &defs, &provided).unwrap();
        assert_eq!(resolved.parameter_values()["Count"], "5");
    }
}

mod user_data {
    use super::*;

    fn vars() -> BTreeMap<String, VariableValue> {
        BTreeMap::from([
            ("Name".to_string(), VariableValue::from("web")),
            ("Port".to_string(), VariableValue::from(8080_i64)),
        ])
    }

    #[test]
    fn substitutes_both_placeholder_forms() {
        let rendered = parse_user_data(&vars(), "host=${Name} port=$Port cost=$$5", "web").unwrap();
        assert_eq!(rendered, "host=web port=8080 cost=$5");
    }

    #[test]
    fn invalid_placeholder_reports_position() {
        let err = parse_user_data(&vars(), "line one\nbad $1 here", "web").unwrap_err();
        match err {
            ResolveError::InvalidUserdataPlaceholder { blueprint, message } => {
                assert_eq!(blueprint, "web");
                assert_eq!(message, "Invalid placeholder in string: line 2, col 5");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
