// ABOUTME: Command handlers for the strata CLI.
// ABOUTME: Load config, wire the provider and output, then hand off to the library actions.

mod graph;
mod stacks;

pub use graph::graph;
pub use stacks::{build, destroy, diff, info};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use strata::actions::ActionEnv;
use strata::config::Config;
use strata::error::Result;
use strata::output::Output;
use strata::provider::StateFileProvider;

/// State file used when `--state` is not given.
pub const DEFAULT_STATE_FILE: &str = ".strata/state.json";

/// Discover the config in `cwd` and build the action environment around it.
fn load_env(cwd: &Path, state: Option<PathBuf>, output: Output) -> Result<(Config, ActionEnv)> {
    let config = Config::discover(cwd)?;
    let context = config.context()?;

    let state = state.unwrap_or_else(|| cwd.join(DEFAULT_STATE_FILE));
    tracing::debug!("using state file {}", state.display());
    let provider = StateFileProvider::open(&state)?;

    let env = ActionEnv::new(context, Arc::new(provider), output).with_hooks(config.stage_hooks());
    Ok((config, env))
}
