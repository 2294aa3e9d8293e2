//! HTTP surface of the prediction service: `/`, `/health` and `/predict`.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use rain_core::{
    PredictError, RainPredictor, WeatherRecord,
    model::{ErrorBody, HealthResponse, PredictRequest, PredictResponse, RootResponse},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, warn};

/// Shared, read-only service state. `None` means the model failed to load.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    predictor: Option<Arc<RainPredictor>>,
}

impl AppState {
    pub fn new(predictor: Option<RainPredictor>) -> Self {
        Self { predictor: predictor.map(Arc::new) }
    }

    pub fn model_loaded(&self) -> bool {
        self.predictor.is_some()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/predict", post(predict))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Model not loaded")]
    ModelUnavailable,

    #[error("{0}")]
    BadRequest(String),

    #[error("Prediction error: {0}")]
    Prediction(#[from] PredictError),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::ModelUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Prediction(PredictError::ModelUnavailable) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Prediction(e) if e.is_client_fault() => StatusCode::BAD_REQUEST,
            ApiError::Prediction(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let detail = self.to_string();

        if status.is_server_error() {
            warn!(%status, %detail, "prediction request failed");
        } else {
            debug!(%status, %detail, "prediction request rejected");
        }

        (status, Json(ErrorBody { detail })).into_response()
    }
}

/// GET /: service banner and the model's required feature columns.
async fn root(State(state): State<AppState>) -> Json<RootResponse> {
    let (status, features_required) = match &state.predictor {
        Some(p) => ("Model loaded", p.feature_names().to_vec()),
        None => ("Model not loaded", Vec::new()),
    };

    Json(RootResponse {
        message: "Rain Prediction API".to_string(),
        status: status.to_string(),
        features_required,
    })
}

/// GET /health: always 200; model availability is reported in the body.
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy".to_string(), model_loaded: state.model_loaded() })
}

/// POST /predict: `{"features": {...}}` in, `{"prediction", "probability"}` out.
async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let predictor = state.predictor.as_ref().ok_or(ApiError::ModelUnavailable)?;

    let Json(request) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

    let (record, unrecognized) = WeatherRecord::from_features(request.features).map_err(PredictError::from)?;
    if !unrecognized.is_empty() {
        debug!(keys = ?unrecognized, "ignoring unrecognized attributes");
    }

    let prediction = predictor.predict(&record)?;
    Ok(Json(prediction.into()))
}
