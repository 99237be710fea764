//! hazfill CLI: fill empty cells of an HMIS chemical gas table.
//!
//! Each row is filled from tiered web search (suppliers, standards,
//! regulators, open web) plus LLM extraction, with a bounded general
//! fallback whose estimates are flagged for review.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    // A missing .env is fine; keys may come from the real environment.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
