// ABOUTME: Library root for strata - exposes public types for testing.
// ABOUTME: The main binary is in main.rs.

pub mod actions;
pub mod blueprint;
pub mod config;
pub mod context;
pub mod diagnostics;
pub mod diff;
pub mod error;
pub mod graph;
pub mod hooks;
pub mod lookups;
pub mod output;
pub mod plan;
pub mod provider;
pub mod stack;
pub mod status;
pub mod types;
pub mod variables;
pub mod walker;
