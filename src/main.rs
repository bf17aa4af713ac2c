//! storecheck - sequential HTTP scenario runner
//!
//! Runs ordered plans of dependent HTTP requests against a commerce API,
//! threading extracted response values into later requests and reporting
//! pass/fail per assertion.

use clap::Parser;
use storecheck::{cli, commands, common};

use commands::Commands;

#[derive(Parser)]
#[command(name = "storecheck", about = "Sequential HTTP scenario runner for a commerce API")]
#[command(version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    common::logging::init();

    let cli = Cli::parse();

    if let Err(e) = cli::dispatch(cli.command).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
