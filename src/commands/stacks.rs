// ABOUTME: build, diff, destroy and info command handlers.
// ABOUTME: Translate CLI arguments into run options for the library actions.

use std::path::{Path, PathBuf};

use strata::actions::{self, RunOptions};
use strata::config::Config;
use strata::error::Result;
use strata::output::Output;
use tokio_util::sync::CancellationToken;

use super::load_env;
use crate::cli::RunArgs;

fn run_options(config: &Config, args: RunArgs, force: bool, cancel: CancellationToken) -> RunOptions {
    RunOptions {
        concurrency: args.concurrency.unwrap_or(config.concurrency),
        targets: args.stacks,
        dry_run: args.dry_run,
        force,
        cancel,
    }
}

pub async fn build(cwd: &Path, args: RunArgs, output: Output, cancel: CancellationToken) -> Result<()> {
    let (config, env) = load_env(cwd, args.state.clone(), output)?;
    let options = run_options(&config, args, false, cancel);
    actions::build(&env, &options).await?;
    Ok(())
}

pub async fn diff(cwd: &Path, args: RunArgs, output: Output, cancel: CancellationToken) -> Result<()> {
    let (config, env) = load_env(cwd, args.state.clone(), output)?;
    let options = run_options(&config, args, false, cancel);
    actions::diff(&env, &options).await?;
    Ok(())
}

pub async fn destroy(
    cwd: &Path,
    args: RunArgs,
    force: bool,
    output: Output,
    cancel: CancellationToken,
) -> Result<()> {
    let (config, env) = load_env(cwd, args.state.clone(), output)?;
    let options = run_options(&config, args, force, cancel);
    actions::destroy(&env, &options).await?;
    Ok(())
}

pub async fn info(cwd: &Path, state: Option<PathBuf>, output: Output) -> Result<()> {
    let (_, env) = load_env(cwd, state, output)?;
    actions::info(&env).await?;
    Ok(())
}
