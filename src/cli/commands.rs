//! Command-line interface definitions using clap derive.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Generate, verify, and interrogate machine-written simulations
#[derive(Debug, Parser)]
#[command(name = "simforge", version, about)]
pub struct Cli {
    /// Path to a config file (default: ./simforge.yml, then
    /// ~/.config/simforge/simforge.yml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Generate and verify a simulation program from an experiment
    /// metadata file (YAML or JSON)
    Generate {
        /// Path to the metadata file
        metadata: PathBuf,
    },

    /// Run a verified simulation once per row of a parameter grid file
    /// (YAML or JSON list of parameter objects)
    Sweep {
        /// Handle returned by `generate`
        handle: String,
        /// Path to the parameter grid file
        grid: PathBuf,
    },

    /// Ask a question about a simulation's swept results
    Ask {
        /// Handle returned by `generate`
        handle: String,
        /// The question to answer
        question: String,
    },

    /// List stored question/answer reports
    Reports {
        /// Only reports for this handle
        #[arg(long)]
        handle: Option<String>,
    },
}

impl Cli {
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}
