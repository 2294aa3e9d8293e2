//! Binary crate for the `rain` command-line tool.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - Collecting weather observations interactively
//! - Human-friendly output of predictions and service status

use clap::Parser;

mod cli;
mod form;
mod render;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cmd = cli::Cli::parse();
    cmd.run().await
}
