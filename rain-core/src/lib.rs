//! Core library for rain prediction.
//!
//! This crate defines:
//! - The weather record and the HTTP contract shared by service and collector
//! - Feature encoding against a trained model's column schema
//! - The classifier adapter and the XGBoost JSON model loader
//! - Configuration and the HTTP client for the prediction service
//!
//! It is used by `rain-server` and `rain-cli`.

pub mod classifier;
pub mod client;
pub mod config;
pub mod encoder;
pub mod error;
pub mod model;

pub use classifier::{Classifier, RainPredictor, load_predictor};
pub use client::{ClientError, PredictionService, ServiceStatus};
pub use config::{ClientConfig, Config, ServerConfig};
pub use encoder::{FeatureEncoder, FeatureFrame};
pub use error::{ModelLoadError, PredictError, RecordError};
pub use model::{Prediction, WeatherRecord};
