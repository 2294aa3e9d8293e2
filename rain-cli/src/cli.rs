use anyhow::anyhow;
use clap::{Parser, Subcommand};
use rain_core::{
    Config, PredictionService, WeatherRecord,
    client::{check_status, service_from_config},
};

use crate::{form, render};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "rain", version, about = "Next-day rain prediction client")]
pub struct Cli {
    /// Prediction service URL; overrides the configured `api_url`.
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Set the service URL and request timeouts.
    Configure,

    /// Check that the service is reachable and has a model loaded.
    Health,

    /// Enter today's observations and ask whether it will rain tomorrow.
    Predict {
        /// Skip the form and submit the default observations.
        #[arg(long)]
        defaults: bool,

        /// Also print the submitted record as JSON.
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let mut config = with_api_url(Config::load()?, self.api_url);

        match self.command {
            Command::Configure => {
                form::configure(&mut config.client)?;
                config.validate()?;
                config.save()?;
                println!("Saved configuration to {}", Config::config_file_path()?.display());
            }
            Command::Health => {
                config.validate()?;
                let service = service_from_config(&config.client)?;
                let status = check_status(service.as_ref()).await;
                println!("{}", render::status(&status));
            }
            Command::Predict { defaults, json } => {
                config.validate()?;
                let record = if defaults { WeatherRecord::with_defaults() } else { form::collect()? };

                let service = service_from_config(&config.client)?;
                let prediction = service
                    .predict(&record)
                    .await
                    .map_err(|e| anyhow!(render::failure(&e, &config.client.api_url)))?;

                println!("{}", render::prediction(&prediction));
                if json {
                    println!("\nModel input:\n{}", serde_json::to_string_pretty(&record)?);
                }
            }
        }

        Ok(())
    }
}

/// The `--api-url` flag wins over the saved value. Validation happens where
/// the URL is used, so `configure` can still repair a bad saved file.
fn with_api_url(mut config: Config, api_url: Option<String>) -> Config {
    if let Some(url) = api_url {
        config.client.api_url = url;
    }
    config
}
