use std::path::PathBuf;

use thiserror::Error;

/// Why the classifier artifact could not be loaded at startup.
///
/// Clients only ever see "model unavailable"; the kind is kept for logs.
#[derive(Error, Debug)]
pub enum ModelLoadError {
    #[error("Model file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read model file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Model file is not a valid XGBoost JSON model: {0}")]
    Corrupt(String),

    #[error("Unsupported model: {0}")]
    Unsupported(String),

    #[error("Model artifact carries no feature names")]
    MissingSchema,

    #[error("Model schema does not match the category tables: unknown columns {0:?}")]
    SchemaMismatch(Vec<String>),
}

impl ModelLoadError {
    /// Short stable label for the failure kind, used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            ModelLoadError::NotFound(_) => "not_found",
            ModelLoadError::Io { .. } => "io",
            ModelLoadError::Corrupt(_) => "corrupt",
            ModelLoadError::Unsupported(_) => "unsupported",
            ModelLoadError::MissingSchema => "missing_schema",
            ModelLoadError::SchemaMismatch(_) => "schema_mismatch",
        }
    }
}

/// The incoming `features` object could not be read as a weather record.
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("invalid attribute value: {0}")]
    InvalidAttribute(#[source] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum PredictError {
    #[error("Model not loaded")]
    ModelUnavailable,

    #[error(transparent)]
    InvalidInput(#[from] RecordError),

    #[error("feature alignment failed: {0}")]
    Alignment(String),

    #[error("model returned an invalid probability: {0}")]
    InvalidProbability(f64),
}

impl PredictError {
    /// True when the caller sent something the model cannot consume.
    pub fn is_client_fault(&self) -> bool {
        matches!(self, PredictError::InvalidInput(_) | PredictError::Alignment(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_faults_are_classified() {
        assert!(PredictError::Alignment("x".into()).is_client_fault());
        assert!(!PredictError::ModelUnavailable.is_client_fault());
        assert!(!PredictError::InvalidProbability(f64::NAN).is_client_fault());
    }

    #[test]
    fn load_error_kinds() {
        assert_eq!(ModelLoadError::NotFound(PathBuf::from("m.json")).kind(), "not_found");
        assert_eq!(ModelLoadError::SchemaMismatch(vec!["Foo".into()]).kind(), "schema_mismatch");
        assert!(ModelLoadError::MissingSchema.to_string().contains("no feature names"));
    }
}
