//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand};

use crate::cli::commands::{
    completions::CompletionsArgs, generate::GenerateArgs, validate::ValidateArgs,
};

#[derive(Parser)]
#[command(name = "dtgen")]
#[command(author, version, about = "Data type code generator")]
#[command(long_about = "Renders every data type in a set of schema documents through a template, with Lua extensions for predefined types, filters and tags.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Only print errors
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Print debug logging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

impl GlobalOpts {
    /// Default log filter when RUST_LOG is unset
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else if self.verbose {
            "debug"
        } else {
            "warn"
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render one artifact per data type
    Generate(GenerateArgs),

    /// Parse and validate schema documents without rendering
    Validate(ValidateArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}
