//! cvmaker CLI: résumé and cover-letter generator.
//!
//! Merges plain-text parameter files with language-specific LaTeX templates
//! and drives the typesetter to produce PDFs.

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
