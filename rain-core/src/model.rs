use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::RecordError;

/// Numeric attribute keys, in the order the collector form presents them.
pub const NUMERIC_ATTRIBUTES: [&str; 17] = [
    "MinTemp",
    "MaxTemp",
    "Rainfall",
    "Evaporation",
    "Sunshine",
    "WindGustSpeed",
    "WindSpeed9am",
    "WindSpeed3pm",
    "Humidity9am",
    "Humidity3pm",
    "Pressure9am",
    "Pressure3pm",
    "Cloud9am",
    "Cloud3pm",
    "Temp9am",
    "Temp3pm",
    "RainToday",
];

/// Categorical attribute keys. Their category sets live in [`crate::encoder`].
pub const CATEGORICAL_ATTRIBUTES: [&str; 4] = ["Location", "WindGustDir", "WindDir9am", "WindDir3pm"];

/// One set of weather observations for a single station and day.
///
/// Every attribute is optional at the type level: an absent categorical
/// attribute simply matches no category, while an absent numeric attribute
/// is reported when the record is aligned against the model schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    #[serde(rename = "MinTemp", default, deserialize_with = "de_numeric", skip_serializing_if = "Option::is_none")]
    pub min_temp: Option<f64>,
    #[serde(rename = "MaxTemp", default, deserialize_with = "de_numeric", skip_serializing_if = "Option::is_none")]
    pub max_temp: Option<f64>,
    #[serde(rename = "Rainfall", default, deserialize_with = "de_numeric", skip_serializing_if = "Option::is_none")]
    pub rainfall: Option<f64>,
    #[serde(rename = "Evaporation", default, deserialize_with = "de_numeric", skip_serializing_if = "Option::is_none")]
    pub evaporation: Option<f64>,
    #[serde(rename = "Sunshine", default, deserialize_with = "de_numeric", skip_serializing_if = "Option::is_none")]
    pub sunshine: Option<f64>,
    #[serde(rename = "WindGustSpeed", default, deserialize_with = "de_numeric", skip_serializing_if = "Option::is_none")]
    pub wind_gust_speed: Option<f64>,
    #[serde(rename = "WindSpeed9am", default, deserialize_with = "de_numeric", skip_serializing_if = "Option::is_none")]
    pub wind_speed_9am: Option<f64>,
    #[serde(rename = "WindSpeed3pm", default, deserialize_with = "de_numeric", skip_serializing_if = "Option::is_none")]
    pub wind_speed_3pm: Option<f64>,
    #[serde(rename = "Humidity9am", default, deserialize_with = "de_numeric", skip_serializing_if = "Option::is_none")]
    pub humidity_9am: Option<f64>,
    #[serde(rename = "Humidity3pm", default, deserialize_with = "de_numeric", skip_serializing_if = "Option::is_none")]
    pub humidity_3pm: Option<f64>,
    #[serde(rename = "Pressure9am", default, deserialize_with = "de_numeric", skip_serializing_if = "Option::is_none")]
    pub pressure_9am: Option<f64>,
    #[serde(rename = "Pressure3pm", default, deserialize_with = "de_numeric", skip_serializing_if = "Option::is_none")]
    pub pressure_3pm: Option<f64>,
    #[serde(rename = "Cloud9am", default, deserialize_with = "de_numeric", skip_serializing_if = "Option::is_none")]
    pub cloud_9am: Option<f64>,
    #[serde(rename = "Cloud3pm", default, deserialize_with = "de_numeric", skip_serializing_if = "Option::is_none")]
    pub cloud_3pm: Option<f64>,
    #[serde(rename = "Temp9am", default, deserialize_with = "de_numeric", skip_serializing_if = "Option::is_none")]
    pub temp_9am: Option<f64>,
    #[serde(rename = "Temp3pm", default, deserialize_with = "de_numeric", skip_serializing_if = "Option::is_none")]
    pub temp_3pm: Option<f64>,
    /// 1 if it rained today, 0 otherwise.
    #[serde(rename = "RainToday", default, deserialize_with = "de_numeric", skip_serializing_if = "Option::is_none")]
    pub rain_today: Option<f64>,

    #[serde(rename = "Location", default, deserialize_with = "de_category", skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(rename = "WindGustDir", default, deserialize_with = "de_category", skip_serializing_if = "Option::is_none")]
    pub wind_gust_dir: Option<String>,
    #[serde(rename = "WindDir9am", default, deserialize_with = "de_category", skip_serializing_if = "Option::is_none")]
    pub wind_dir_9am: Option<String>,
    #[serde(rename = "WindDir3pm", default, deserialize_with = "de_category", skip_serializing_if = "Option::is_none")]
    pub wind_dir_3pm: Option<String>,
}

impl WeatherRecord {
    /// Record pre-filled with the collector form's starting values.
    pub fn with_defaults() -> Self {
        Self {
            min_temp: Some(13.0),
            max_temp: Some(23.0),
            rainfall: Some(0.0),
            evaporation: Some(5.0),
            sunshine: Some(8.0),
            wind_gust_speed: Some(35.0),
            wind_speed_9am: Some(15.0),
            wind_speed_3pm: Some(20.0),
            humidity_9am: Some(70.0),
            humidity_3pm: Some(50.0),
            pressure_9am: Some(1013.0),
            pressure_3pm: Some(1012.0),
            cloud_9am: Some(4.0),
            cloud_3pm: Some(5.0),
            temp_9am: Some(17.0),
            temp_3pm: Some(22.0),
            rain_today: Some(0.0),
            location: Some("Sydney".to_string()),
            wind_gust_dir: Some("N".to_string()),
            wind_dir_9am: Some("N".to_string()),
            wind_dir_3pm: Some("N".to_string()),
        }
    }

    /// Validate a loosely-typed `features` object into a typed record.
    ///
    /// Keys that are not weather attributes are dropped and returned so the
    /// caller can log them.
    pub fn from_features(features: Map<String, Value>) -> Result<(Self, Vec<String>), RecordError> {
        let unrecognized = features
            .keys()
            .filter(|key| !is_known_attribute(key))
            .cloned()
            .collect();

        let record = serde_json::from_value(Value::Object(features)).map_err(RecordError::InvalidAttribute)?;

        Ok((record, unrecognized))
    }

    /// Numeric attributes paired with their wire names, in form order.
    pub fn numeric_values(&self) -> [(&'static str, Option<f64>); 17] {
        [
            ("MinTemp", self.min_temp),
            ("MaxTemp", self.max_temp),
            ("Rainfall", self.rainfall),
            ("Evaporation", self.evaporation),
            ("Sunshine", self.sunshine),
            ("WindGustSpeed", self.wind_gust_speed),
            ("WindSpeed9am", self.wind_speed_9am),
            ("WindSpeed3pm", self.wind_speed_3pm),
            ("Humidity9am", self.humidity_9am),
            ("Humidity3pm", self.humidity_3pm),
            ("Pressure9am", self.pressure_9am),
            ("Pressure3pm", self.pressure_3pm),
            ("Cloud9am", self.cloud_9am),
            ("Cloud3pm", self.cloud_3pm),
            ("Temp9am", self.temp_9am),
            ("Temp3pm", self.temp_3pm),
            ("RainToday", self.rain_today),
        ]
    }

    /// Value of a categorical attribute by wire name.
    pub fn category(&self, attribute: &str) -> Option<&str> {
        match attribute {
            "Location" => self.location.as_deref(),
            "WindGustDir" => self.wind_gust_dir.as_deref(),
            "WindDir9am" => self.wind_dir_9am.as_deref(),
            "WindDir3pm" => self.wind_dir_3pm.as_deref(),
            _ => None,
        }
    }
}

pub fn is_known_attribute(key: &str) -> bool {
    NUMERIC_ATTRIBUTES.contains(&key) || CATEGORICAL_ATTRIBUTES.contains(&key)
}

/// Numbers pass through, numeric strings are parsed and booleans become 1/0.
fn de_numeric<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("number {n} is not representable as f64"))),
        Value::Bool(b) => Ok(Some(if b { 1.0 } else { 0.0 })),
        Value::String(s) => match s.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(Some(v)),
            _ => Err(D::Error::custom(format!("expected a finite number, found string {s:?}"))),
        },
        other => Err(D::Error::custom(format!("expected a number, found {other}"))),
    }
}

/// Anything that is not a string keeps its JSON text and so matches no category.
fn de_category<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}

/// Outcome of one classification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    /// 1 = rain tomorrow, 0 = no rain.
    pub label: u8,
    /// Probability of the positive class, in [0, 1].
    pub probability: f64,
}

impl Prediction {
    pub fn from_probability(probability: f64) -> Self {
        let label = if probability >= 0.5 { 1 } else { 0 };
        Self { label, probability }
    }

    pub fn will_rain(&self) -> bool {
        self.label == 1
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictRequest {
    pub features: Map<String, Value>,
}

impl PredictRequest {
    /// Attributes left unset on the record are omitted.
    pub fn from_record(record: &WeatherRecord) -> Self {
        let numeric = record
            .numeric_values()
            .into_iter()
            .filter_map(|(name, value)| value.map(|v| (name.to_string(), Value::from(v))));
        let categorical = CATEGORICAL_ATTRIBUTES
            .iter()
            .filter_map(|name| record.category(name).map(|c| (name.to_string(), Value::from(c))));

        Self { features: numeric.chain(categorical).collect() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictResponse {
    pub prediction: u8,
    pub probability: f64,
}

impl From<Prediction> for PredictResponse {
    fn from(p: Prediction) -> Self {
        Self { prediction: p.label, probability: p.probability }
    }
}

impl From<PredictResponse> for Prediction {
    fn from(r: PredictResponse) -> Self {
        Self { label: r.prediction, probability: r.probability }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootResponse {
    pub message: String,
    pub status: String,
    pub features_required: Vec<String>,
}

/// Body of every non-2xx response from the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}
