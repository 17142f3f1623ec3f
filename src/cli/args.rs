//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};

use crate::cli::commands::{
    add::AddArgs, completions::CompletionsArgs, new::NewArgs, rm::RmArgs, run::RunArgs,
    show::ShowArgs, validate::ValidateArgs,
};

#[derive(Parser)]
#[command(name = "tolstack")]
#[command(author, version, about = "Monte Carlo tolerance stackup analysis")]
#[command(long_about = "Describe linear and radial dimension chains as plain YAML stack files, \
simulate them with a seeded Monte Carlo engine and report capability statistics.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output (debug logging on stderr)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new stack file
    New(NewArgs),

    /// Add a contributor to a stack
    Add(AddArgs),

    /// Remove a contributor from a stack
    Rm(RmArgs),

    /// Show a stack definition
    Show(ShowArgs),

    /// Check that a stack can be simulated
    Validate(ValidateArgs),

    /// Run the Monte Carlo simulation and report statistics
    Run(RunArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text on a terminal, YAML otherwise
    #[default]
    Auto,
    /// Human-readable text
    Text,
    /// YAML format (full fidelity)
    Yaml,
    /// JSON format (for programming)
    Json,
}
