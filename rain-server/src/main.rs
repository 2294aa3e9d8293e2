//! Binary crate for the `rain-server` prediction service.
//!
//! This crate focuses on:
//! - Loading the trained model once at startup
//! - Serving the health and prediction endpoints
//! - Mapping prediction failures to HTTP status codes

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod routes;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = cli::Args::parse();
    args.run().await
}
