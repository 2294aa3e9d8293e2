use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use rain_core::{Config, RainPredictor, load_predictor};
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::routes::{AppState, router};

/// Command-line arguments; each flag overrides the config file.
#[derive(Debug, Parser)]
#[command(name = "rain-server", version, about = "Rain prediction service")]
pub struct Args {
    /// Config file to read instead of the platform default.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Socket address to listen on, e.g. "0.0.0.0:8000".
    #[arg(long)]
    pub bind: Option<String>,

    /// Path to the XGBoost JSON model.
    #[arg(long)]
    pub model: Option<PathBuf>,
}

impl Args {
    pub fn resolve_config(&self) -> anyhow::Result<Config> {
        let mut cfg = match &self.config {
            Some(path) => Config::load_from(path)?,
            None => Config::load()?,
        };

        if let Some(bind) = &self.bind {
            cfg.server.bind = bind.clone();
        }
        if let Some(model) = &self.model {
            cfg.server.model_path = model.clone();
        }

        Ok(cfg)
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let cfg = self.resolve_config()?;

        let predictor = load_model(&cfg.server.model_path);
        let app = router(AppState::new(predictor));

        let listener = TcpListener::bind(&cfg.server.bind)
            .await
            .with_context(|| format!("Failed to bind {}", cfg.server.bind))?;

        info!(addr = %listener.local_addr()?, "rain prediction service listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("HTTP server terminated unexpectedly")?;

        info!("shut down");
        Ok(())
    }
}

/// A failed load leaves the service up without a model.
fn load_model(path: &std::path::Path) -> Option<RainPredictor> {
    match load_predictor(path) {
        Ok(predictor) => Some(predictor),
        Err(e) => {
            error!(path = %path.display(), kind = e.kind(), error = %e, "model failed to load; predictions disabled");
            None
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
