//! RFP Intel CLI: document intelligence for government solicitations.
//!
//! Reads RFP documents, splits them into regulatory sections and tasks,
//! extracts requirements, and prints compliance and coverage data as JSON.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
