use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use crate::model::{
    ErrorBody, HealthResponse, PredictRequest, PredictResponse, Prediction, RootResponse, WeatherRecord,
};

use super::{ClientError, PredictionService};

#[derive(Debug, Clone)]
pub struct HttpPredictionService {
    base_url: String,
    http: Client,
    health_timeout: Duration,
    predict_timeout: Duration,
}

impl HttpPredictionService {
    pub fn new(base_url: String, health_timeout: Duration, predict_timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder().build().context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            health_timeout,
            predict_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let res = request.send().await.map_err(transport_error)?;

        let status = res.status();
        let body = res.text().await.map_err(transport_error)?;

        if !status.is_success() {
            let detail = serde_json::from_str::<ErrorBody>(&body)
                .map(|e| e.detail)
                .unwrap_or_else(|_| truncate_body(&body));

            return Err(ClientError::Api { status: status.as_u16(), detail });
        }

        serde_json::from_str(&body)
            .map_err(|e| ClientError::Decode(format!("{e}: {}", truncate_body(&body))))
    }
}

#[async_trait]
impl PredictionService for HttpPredictionService {
    async fn health(&self) -> Result<HealthResponse, ClientError> {
        let request = self.http.get(self.url("/health")).timeout(self.health_timeout);
        self.send(request).await
    }

    async fn info(&self) -> Result<RootResponse, ClientError> {
        let request = self.http.get(self.url("/")).timeout(self.health_timeout);
        self.send(request).await
    }

    async fn predict(&self, record: &WeatherRecord) -> Result<Prediction, ClientError> {
        debug!(url = %self.base_url, "sending prediction request");

        let request = self
            .http
            .post(self.url("/predict"))
            .json(&PredictRequest::from_record(record))
            .timeout(self.predict_timeout);

        let response: PredictResponse = self.send(request).await?;
        Ok(response.into())
    }
}

fn transport_error(e: reqwest::Error) -> ClientError {
    if e.is_timeout() {
        ClientError::Timeout
    } else if e.is_decode() {
        ClientError::Decode(e.to_string())
    } else {
        ClientError::Unreachable(e.to_string())
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.chars().count() > MAX {
        format!("{}...", body.chars().take(MAX).collect::<String>())
    } else {
        body.to_string()
    }
}
