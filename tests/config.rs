// ABOUTME: Integration tests for configuration parsing and validation.
// ABOUTME: Tests YAML parsing, file discovery and building the run context.

use strata::config::*;
use strata::error::Error;
use strata::hooks::HookStage;

mod parsing {
    use super::*;

    #[test]
    fn parse_minimal_config() {
        let config = Config::from_yaml("namespace: acme\nstacks:\n  - name: vpc\n").unwrap();
        assert_eq!(config.namespace, "acme");
        assert_eq!(config.concurrency, 0);
        assert_eq!(config.stacks.len(), 1);
        assert!(config.stacks[0].enabled);
    }

    #[test]
    fn parse_full_config() {
        let yaml = r#"
namespace: acme
concurrency: 2
tags: { team: platform }
environment: { region: us-east-1 }
pre_build:
  - path: command
    required: true
    data_key: setup
    args: { command: "echo ok" }
post_destroy:
  - path: command
    enabled: false
    args: { command: "echo bye" }
stacks:
  - name: vpc
    protected: true
    tags: { tier: network }
    variables:
      Cidr: "10.0.0.0/16"
      Zones: [a, b]
    blueprint:
      description: Core network
      variables:
        Cidr: { type: parameter, parameter_type: String, default: "10.0.0.0/16" }
        Zones: { type: list }
      outputs: { VpcId: "vpc-${Cidr}" }
  - name: app
    requires: [vpc]
    locked: true
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.concurrency, 2);
        assert_eq!(config.tags["team"], "platform");
        assert_eq!(config.hooks(HookStage::PreBuild)[0].data_key.as_deref(), Some("setup"));
        assert!(!config.hooks(HookStage::PostDestroy)[0].enabled);

        let context = config.context().unwrap();
        let vpc = &context.stacks()[0];
        assert!(vpc.is_protected());
        assert_eq!(vpc.fqn(), "acme-vpc");
        assert_eq!(vpc.variables().len(), 2);
        assert!(context.stacks()[1].is_locked());
    }

    #[test]
    fn stage_hooks_mirror_config() {
        let config = Config::from_yaml(
            "pre_destroy:\n  - path: command\n    args: { command: \"true\" }\n",
        )
        .unwrap();
        let hooks = config.stage_hooks();
        assert_eq!(hooks.get(HookStage::PreDestroy).len(), 1);
        assert!(hooks.get(HookStage::PreBuild).is_empty());
    }
}

mod validation {
    use super::*;

    #[test]
    fn variable_type_is_required() {
        let config = Config::from_yaml(
            "stacks:\n  - name: vpc\n    blueprint:\n      variables:\n        Cidr: {}\n",
        )
        .unwrap();
        assert!(matches!(
            config.context(),
            Err(ConfigError::VariableTypeRequired { .. })
        ));
    }

    #[test]
    fn unknown_lookup_type_is_rejected() {
        let config = Config::from_yaml(
            "stacks:\n  - name: vpc\n    variables:\n      Secret: \"${vault db::password}\"\n",
        )
        .unwrap();
        assert!(matches!(
            config.context(),
            Err(ConfigError::UnknownLookupType { kind, .. }) if kind == "vault"
        ));
    }

    #[test]
    fn float_values_are_rejected() {
        let config =
            Config::from_yaml("stacks:\n  - name: vpc\n    variables:\n      Ratio: 0.5\n").unwrap();
        assert!(matches!(
            config.context(),
            Err(ConfigError::InvalidValue { variable, .. }) if variable == "Ratio"
        ));
    }

    #[test]
    fn invalid_stack_name_fails_to_parse() {
        assert!(matches!(
            Config::from_yaml("stacks:\n  - name: Bad_Name\n"),
            Err(Error::Yaml(_))
        ));
    }
}

mod discovery {
    use super::*;
    use std::fs;

    #[test]
    fn finds_config_in_dot_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join(".strata")).unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME_DIR), "namespace: hidden\n").unwrap();

        let config = Config::discover(dir.path()).unwrap();
        assert_eq!(config.namespace, "hidden");
    }

    #[test]
    fn prefers_top_level_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME), "namespace: top\n").unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME_ALT), "namespace: alt\n").unwrap();

        assert_eq!(Config::discover(dir.path()).unwrap().namespace, "top");
    }

    #[test]
    fn missing_config_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Config::discover(dir.path()),
            Err(Error::ConfigNotFound(_))
        ));
    }
}
