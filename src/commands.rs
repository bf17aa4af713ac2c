//! CLI command definitions
//!
//! Defines the clap commands for storecheck.

use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Run one or more built-in scenarios by name
    Run {
        /// Scenario names (see 'storecheck list')
        #[arg(required = true)]
        names: Vec<String>,

        #[command(flatten)]
        opts: RunOpts,
    },

    /// Run every built-in scenario
    All {
        #[command(flatten)]
        opts: RunOpts,
    },

    /// Run a scenario from a YAML file
    File {
        /// Path to the scenario file
        path: PathBuf,

        #[command(flatten)]
        opts: RunOpts,
    },

    /// List the built-in scenarios
    List,
}

/// Options shared by the run-style commands
#[derive(Args)]
pub struct RunOpts {
    /// Base URL of the API under test (overrides config)
    #[arg(long)]
    pub base_url: Option<String>,

    /// User id for the cart scenarios (overrides config)
    #[arg(long)]
    pub user: Option<u64>,

    /// Extract fields by parsing JSON instead of the default text scan
    #[arg(long)]
    pub structured: bool,

    /// Path to a config file (default: ./storecheck.toml if present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print response bodies for every step
    #[arg(long, short)]
    pub verbose: bool,
}
