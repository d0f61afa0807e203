//! CLI command definitions and dispatch.

pub mod inspect;
pub mod plan;
pub mod validate;

use clap::{Parser, Subcommand};

/// bakery — machine-image build-spec compiler.
#[derive(Parser, Debug)]
#[command(name = bakery_common::constants::BIN_NAME, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load a build spec and report structural problems.
    Validate(validate::ValidateArgs),
    /// List the variables, builders, and provision steps of a build spec.
    Inspect(inspect::InspectArgs),
    /// Resolve a build spec into one execution plan per builder.
    Plan(plan::PlanArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Validate(args) => validate::execute(args),
        Command::Inspect(args) => inspect::execute(args),
        Command::Plan(args) => plan::execute(args),
    }
}
