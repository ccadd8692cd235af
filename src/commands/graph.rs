// ABOUTME: graph command: prints the stack dependency graph.
// ABOUTME: Supports Graphviz dot and JSON, optionally transitively reduced.

use std::path::Path;

use strata::config::Config;
use strata::error::Result;
use strata::graph::Graph;
use strata::output::Output;

use crate::cli::GraphFormat;

pub fn graph(cwd: &Path, format: GraphFormat, reduce: bool, output: &Output) -> Result<()> {
    let config = Config::discover(cwd)?;
    let context = config.context()?;

    let graph = Graph::from_stacks(context.stacks())?;
    let graph = if reduce {
        graph.transitive_reduction()
    } else {
        graph
    };

    let text = match format {
        GraphFormat::Dot => graph.to_dot(),
        GraphFormat::Json => serde_json::to_string_pretty(&graph)?,
    };
    output.report(context.namespace(), &text);
    Ok(())
}
