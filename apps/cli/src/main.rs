//! sheet2xml CLI: export a conversation-design Google Sheet as grouped XML.
//!
//! Reads the first worksheet, forward-fills merged-looking blanks, groups
//! rows into conversations and response options, and writes one XML file.

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
