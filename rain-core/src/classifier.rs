use std::{fmt::Debug, path::Path, sync::Arc};

use tracing::{debug, info};

use crate::{
    classifier::xgboost::XgboostClassifier,
    encoder::{FeatureEncoder, FeatureFrame},
    error::{ModelLoadError, PredictError},
    model::{Prediction, WeatherRecord},
};

pub mod xgboost;

/// A pre-fitted probabilistic binary classifier.
pub trait Classifier: Send + Sync + Debug {
    /// Ordered feature columns the model was fitted on.
    fn feature_names(&self) -> &[String];

    /// Probability of the positive class for one aligned row.
    fn predict_proba(&self, row: &[f64]) -> f64;
}

/// Serialized model formats, recognised by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFormat {
    XgboostJson,
}

impl TryFrom<&Path> for ModelFormat {
    type Error = ModelLoadError;

    fn try_from(path: &Path) -> Result<Self, Self::Error> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "json" => Ok(ModelFormat::XgboostJson),
            "pkl" | "joblib" | "pickle" => Err(ModelLoadError::Unsupported(format!(
                "{} is a Python pickle.\nHint: export it with `model.save_model(\"rain_model.json\")` first.",
                path.display()
            ))),
            _ => Err(ModelLoadError::Unsupported(format!(
                "unrecognised model file extension for {}",
                path.display()
            ))),
        }
    }
}

/// Encoder and classifier bound together; the read-only handle shared by
/// all prediction requests.
#[derive(Debug, Clone)]
pub struct RainPredictor {
    classifier: Arc<dyn Classifier>,
    encoder: FeatureEncoder,
}

impl RainPredictor {
    /// Fails if the classifier's schema has columns the encoder cannot produce.
    pub fn new(classifier: Arc<dyn Classifier>) -> Result<Self, ModelLoadError> {
        let schema = classifier.feature_names().to_vec();
        FeatureEncoder::check_schema(&schema)?;

        Ok(Self { classifier, encoder: FeatureEncoder::new(schema) })
    }

    pub fn feature_names(&self) -> &[String] {
        self.classifier.feature_names()
    }

    pub fn encode(&self, record: &WeatherRecord) -> FeatureFrame {
        self.encoder.encode(record)
    }

    pub fn predict(&self, record: &WeatherRecord) -> Result<Prediction, PredictError> {
        let frame = self.encode(record);
        self.predict_frame(&frame)
    }

    /// Classify an encoded frame, checking it lines up with the model schema.
    pub fn predict_frame(&self, frame: &FeatureFrame) -> Result<Prediction, PredictError> {
        let expected = self.classifier.feature_names();
        if frame.columns() != expected {
            return Err(PredictError::Alignment(format!(
                "frame has {} columns, model expects {} in a fixed order",
                frame.len(),
                expected.len()
            )));
        }

        let row = frame.dense().map_err(|missing| {
            PredictError::Alignment(format!("missing required features: {}", missing.join(", ")))
        })?;

        let probability = self.classifier.predict_proba(&row);
        if !(0.0..=1.0).contains(&probability) {
            return Err(PredictError::InvalidProbability(probability));
        }

        let prediction = Prediction::from_probability(probability);
        debug!(probability, label = prediction.label, "prediction made");
        Ok(prediction)
    }
}

/// Load a model artifact and bind it to the encoder.
pub fn load_predictor(path: &Path) -> Result<RainPredictor, ModelLoadError> {
    let classifier = match ModelFormat::try_from(path)? {
        ModelFormat::XgboostJson => XgboostClassifier::load(path)?,
    };

    info!(
        path = %path.display(),
        trees = classifier.num_trees(),
        features = classifier.feature_names().len(),
        "model loaded"
    );

    RainPredictor::new(Arc::new(classifier))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::known_columns;
    use std::path::PathBuf;

    /// Returns a fixed probability and records nothing.
    #[derive(Debug)]
    struct ConstantClassifier {
        names: Vec<String>,
        probability: f64,
    }

    impl Classifier for ConstantClassifier {
        fn feature_names(&self) -> &[String] {
            &self.names
        }

        fn predict_proba(&self, _row: &[f64]) -> f64 {
            self.probability
        }
    }

    fn predictor(probability: f64) -> RainPredictor {
        RainPredictor::new(Arc::new(ConstantClassifier { names: known_columns(), probability })).unwrap()
    }

    fn fixture_path() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata/rain_model.json")
    }

    #[test]
    fn model_format_from_extension() {
        assert_eq!(ModelFormat::try_from(Path::new("rain_model.json")).unwrap(), ModelFormat::XgboostJson);

        let err = ModelFormat::try_from(Path::new("rain_model.pkl")).unwrap_err();
        assert!(err.to_string().contains("save_model"));

        assert!(ModelFormat::try_from(Path::new("rain_model")).is_err());
    }

    #[test]
    fn label_follows_probability() {
        let record = WeatherRecord::with_defaults();
        assert_eq!(predictor(0.7).predict(&record).unwrap(), Prediction { label: 1, probability: 0.7 });
        assert_eq!(predictor(0.2).predict(&record).unwrap().label, 0);
    }

    #[test]
    fn missing_numeric_is_an_alignment_fault() {
        let mut record = WeatherRecord::with_defaults();
        record.humidity_3pm = None;

        let err = predictor(0.5).predict(&record).unwrap_err();
        assert!(err.is_client_fault());
        assert!(err.to_string().contains("Humidity3pm"));
    }

    #[test]
    fn frame_for_another_schema_is_rejected() {
        let other = FeatureEncoder::new(vec!["MinTemp".to_string()]);
        let frame = other.encode(&WeatherRecord::with_defaults());

        let err = predictor(0.5).predict_frame(&frame).unwrap_err();
        assert!(matches!(err, PredictError::Alignment(_)));
    }

    #[test]
    fn out_of_range_probability_is_a_server_fault() {
        let err = predictor(f64::NAN).predict(&WeatherRecord::with_defaults()).unwrap_err();
        assert!(matches!(err, PredictError::InvalidProbability(_)));
        assert!(!err.is_client_fault());
    }

    #[test]
    fn schema_mismatch_fails_at_construction() {
        let classifier = ConstantClassifier { names: vec!["MinTemp".into(), "DewPoint".into()], probability: 0.5 };
        let err = RainPredictor::new(Arc::new(classifier)).unwrap_err();
        assert!(matches!(err, ModelLoadError::SchemaMismatch(cols) if cols == vec!["DewPoint".to_string()]));
    }

    #[test]
    fn fixture_model_predicts_dry_defaults() {
        let predictor = load_predictor(&fixture_path()).unwrap();
        assert_eq!(predictor.feature_names(), known_columns().as_slice());

        // Leaves: -0.8 (humidity below 65, dry today), -0.4 (sunny, not Darwin), -0.2 (calm).
        let prediction = predictor.predict(&WeatherRecord::with_defaults()).unwrap();
        let expected = 1.0 / (1.0 + 1.4f64.exp());
        assert!((prediction.probability - expected).abs() < 1e-9);
        assert_eq!(prediction.label, 0);
    }

    #[test]
    fn fixture_model_predicts_rain_for_humid_gusty_day() {
        let predictor = load_predictor(&fixture_path()).unwrap();

        let mut record = WeatherRecord::with_defaults();
        record.humidity_3pm = Some(90.0);
        record.sunshine = Some(2.0);
        record.wind_gust_speed = Some(60.0);

        let prediction = predictor.predict(&record).unwrap();
        let expected = 1.0 / (1.0 + (-2.5f64).exp());
        assert!((prediction.probability - expected).abs() < 1e-9);
        assert!(prediction.will_rain());
    }

    #[test]
    fn fixture_model_ignores_unknown_location() {
        let predictor = load_predictor(&fixture_path()).unwrap();

        let mut record = WeatherRecord::with_defaults();
        record.location = Some("NotARealCity".to_string());

        let prediction = predictor.predict(&record).unwrap();
        assert!((0.0..=1.0).contains(&prediction.probability));
        assert_eq!(prediction.label == 1, prediction.probability >= 0.5);
    }

    #[test]
    fn fixture_model_darwin_branch() {
        let predictor = load_predictor(&fixture_path()).unwrap();

        let mut record = WeatherRecord::with_defaults();
        record.location = Some("Darwin".to_string());

        // -0.8 + 0.5 - 0.2
        let prediction = predictor.predict(&record).unwrap();
        let expected = 1.0 / (1.0 + 0.5f64.exp());
        assert!((prediction.probability - expected).abs() < 1e-9);
    }
}
