// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use strata::types::StackName;

#[derive(Parser)]
#[command(name = "strata")]
#[command(about = "Dependency-ordered deployment of infrastructure stacks")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print final results
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Print JSON lines instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new strata.yml configuration file
    Init {
        /// Namespace prefixed to every stack name
        #[arg(short, long)]
        namespace: Option<String>,

        /// Overwrite an existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Create or update stacks in dependency order
    Build(RunArgs),

    /// Show what a build would change
    Diff(RunArgs),

    /// Destroy stacks, dependents first
    Destroy {
        #[command(flatten)]
        run: RunArgs,

        /// Actually destroy; without it only the plan is printed
        #[arg(short, long)]
        force: bool,
    },

    /// Print the outputs of deployed stacks
    Info {
        /// State file used as the deployment backend
        #[arg(long)]
        state: Option<PathBuf>,
    },

    /// Print the dependency graph
    Graph {
        #[arg(long, value_enum, default_value_t = GraphFormat::Dot)]
        format: GraphFormat,

        /// Drop edges implied by longer paths
        #[arg(long)]
        reduce: bool,
    },
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Limit the run to these stacks and their dependencies
    #[arg(long, value_delimiter = ',')]
    pub stacks: Vec<StackName>,

    /// Maximum stacks in flight; 0 is unbounded (defaults to the config value)
    #[arg(short, long)]
    pub concurrency: Option<usize>,

    /// Print the plan without running it
    #[arg(long)]
    pub dry_run: bool,

    /// State file used as the deployment backend
    #[arg(long)]
    pub state: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GraphFormat {
    Dot,
    Json,
}
