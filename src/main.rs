// ABOUTME: Entry point for the strata CLI application.
// ABOUTME: Parses arguments, installs logging and Ctrl-C cancellation, dispatches commands.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use std::env;
use strata::config;
use strata::error::Result;
use strata::output::{Output, OutputMode};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins over the verbose flag
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(cli.verbose)
        .with_writer(std::io::stderr)
        .init();

    let mode = if cli.json {
        OutputMode::Json
    } else if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Normal
    };
    let output = Output::new(mode);

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, letting in-flight stacks finish");
            on_signal.cancel();
        }
    });

    if let Err(e) = run(cli.command, output.clone(), cancel).await {
        output.error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(command: Commands, output: Output, cancel: CancellationToken) -> Result<()> {
    let cwd = env::current_dir()?;

    match command {
        Commands::Init { namespace, force } => {
            config::init_config(&cwd, namespace.as_deref(), force)?;
            output.success(&format!("Created {}", config::CONFIG_FILENAME));
            Ok(())
        }
        Commands::Build(args) => commands::build(&cwd, args, output, cancel).await,
        Commands::Diff(args) => commands::diff(&cwd, args, output, cancel).await,
        Commands::Destroy { run, force } => {
            commands::destroy(&cwd, run, force, output, cancel).await
        }
        Commands::Info { state } => commands::info(&cwd, state, output).await,
        Commands::Graph { format, reduce } => commands::graph(&cwd, format, reduce, &output),
    }
}
