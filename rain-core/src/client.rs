use async_trait::async_trait;
use std::fmt::Debug;
use thiserror::Error;

use crate::{
    client::http::HttpPredictionService,
    config::ClientConfig,
    model::{HealthResponse, Prediction, RootResponse, WeatherRecord},
};

pub mod http;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Request timed out. Ensure the prediction service is running.")]
    Timeout,

    #[error("Cannot reach the prediction service: {0}")]
    Unreachable(String),

    #[error("Prediction failed: {status} - {detail}")]
    Api { status: u16, detail: String },

    #[error("Unexpected response from the prediction service: {0}")]
    Decode(String),
}

impl ClientError {
    /// Transport-level failure, as opposed to the service answering with an error.
    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Timeout | ClientError::Unreachable(_))
    }
}

#[async_trait]
pub trait PredictionService: Send + Sync + Debug {
    async fn health(&self) -> Result<HealthResponse, ClientError>;

    async fn info(&self) -> Result<RootResponse, ClientError>;

    async fn predict(&self, record: &WeatherRecord) -> Result<Prediction, ClientError>;
}

/// What a health poll found.
#[derive(Debug)]
pub enum ServiceStatus {
    Ready,
    ModelNotLoaded,
    Unavailable(ClientError),
}

impl ServiceStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, ServiceStatus::Ready)
    }
}

pub async fn check_status(service: &dyn PredictionService) -> ServiceStatus {
    match service.health().await {
        Ok(health) if health.model_loaded => ServiceStatus::Ready,
        Ok(_) => ServiceStatus::ModelNotLoaded,
        Err(e) => ServiceStatus::Unavailable(e),
    }
}

/// Construct the HTTP service client from config.
pub fn service_from_config(config: &ClientConfig) -> anyhow::Result<Box<dyn PredictionService>> {
    let service = HttpPredictionService::new(
        config.api_url.clone(),
        config.health_timeout(),
        config.predict_timeout(),
    )?;

    Ok(Box::new(service))
}
