// ABOUTME: Config scaffolding for new projects.
// ABOUTME: Creates strata.yml template files.

use std::path::Path;

use crate::error::{Error, Result};
use crate::types::StackName;

use super::{CONFIG_FILENAME, Config};

pub fn init_config(dir: &Path, namespace: Option<&str>, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let namespace = namespace.unwrap_or("my-project");
    // The namespace prefixes stack names, so it follows the same rules.
    StackName::new(namespace).map_err(|e| Error::InvalidConfig(e.to_string()))?;

    std::fs::write(&config_path, Config::template(namespace))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_a_loadable_template() {
        let dir = tempfile::tempdir().unwrap();
        init_config(dir.path(), Some("acme"), false).unwrap();

        let config = Config::discover(dir.path()).unwrap();
        assert_eq!(config.namespace, "acme");
    }

    #[test]
    fn refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        init_config(dir.path(), None, false).unwrap();

        assert!(matches!(
            init_config(dir.path(), None, false),
            Err(Error::AlreadyExists(_))
        ));
        assert!(init_config(dir.path(), None, true).is_ok());
    }

    #[test]
    fn rejects_invalid_namespaces() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            init_config(dir.path(), Some("bad_ns"), false),
            Err(Error::InvalidConfig(_))
        ));
    }
}
