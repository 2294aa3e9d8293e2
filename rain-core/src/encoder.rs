//! Feature preparation: turns a [`WeatherRecord`] into the exact ordered
//! column set the trained classifier was fitted on.
//!
//! Categorical attributes are one-hot encoded as `<attribute>_<category>`
//! indicator columns. Indicator columns the record does not produce are
//! zero-filled; numeric columns are never defaulted.

use std::collections::HashMap;

use tracing::trace;

use crate::{
    error::ModelLoadError,
    model::{NUMERIC_ATTRIBUTES, WeatherRecord},
};

/// Weather stations the classifier knows about.
pub const LOCATIONS: [&str; 49] = [
    "Adelaide",
    "Albany",
    "Albury",
    "AliceSprings",
    "BadgerysCreek",
    "Ballarat",
    "Bendigo",
    "Brisbane",
    "Cairns",
    "Canberra",
    "Cobar",
    "CoffsHarbour",
    "Dartmoor",
    "Darwin",
    "GoldCoast",
    "Hobart",
    "Katherine",
    "Launceston",
    "Melbourne",
    "MelbourneAirport",
    "Mildura",
    "Moree",
    "MountGambier",
    "MountGinini",
    "Newcastle",
    "Nhil",
    "NorahHead",
    "NorfolkIsland",
    "Nuriootpa",
    "PearceRAAF",
    "Penrith",
    "Perth",
    "PerthAirport",
    "Portland",
    "Richmond",
    "Sale",
    "SalmonGums",
    "Sydney",
    "SydneyAirport",
    "Townsville",
    "Tuggeranong",
    "Uluru",
    "WaggaWagga",
    "Walpole",
    "Watsonia",
    "Williamtown",
    "Witchcliffe",
    "Wollongong",
    "Woomera",
];

/// The 16-point compass rose used for all wind directions.
pub const COMPASS_POINTS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW", "NNW",
];

/// Categorical attributes and the fixed category set of each.
pub const CATEGORICAL_COLUMNS: [(&str, &[&str]); 4] = [
    ("Location", &LOCATIONS),
    ("WindGustDir", &COMPASS_POINTS),
    ("WindDir9am", &COMPASS_POINTS),
    ("WindDir3pm", &COMPASS_POINTS),
];

pub fn indicator_column(attribute: &str, category: &str) -> String {
    format!("{attribute}_{category}")
}

/// True if `column` is one of the `<attribute>_<category>` columns produced
/// by the category tables.
pub fn is_indicator_column(column: &str) -> bool {
    CATEGORICAL_COLUMNS.iter().any(|(attribute, categories)| {
        column
            .strip_prefix(attribute)
            .and_then(|rest| rest.strip_prefix('_'))
            .is_some_and(|category| categories.contains(&category))
    })
}

/// Every column the encoder can produce: numeric attributes first, then the
/// indicator columns in table order.
pub fn known_columns() -> Vec<String> {
    let mut columns: Vec<String> = NUMERIC_ATTRIBUTES.iter().map(|s| s.to_string()).collect();
    for (attribute, categories) in CATEGORICAL_COLUMNS {
        columns.extend(categories.iter().map(|c| indicator_column(attribute, c)));
    }
    columns
}

/// An encoded record laid out in schema order.
///
/// A `None` value marks a required numeric column the record did not carry.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureFrame {
    columns: Vec<String>,
    values: Vec<Option<f64>>,
}

impl FeatureFrame {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn get(&self, column: &str) -> Option<f64> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|idx| self.values[idx])
    }

    /// Columns with no value.
    pub fn missing(&self) -> Vec<&str> {
        self.columns
            .iter()
            .zip(&self.values)
            .filter(|(_, v)| v.is_none())
            .map(|(c, _)| c.as_str())
            .collect()
    }

    /// Dense row for the classifier, or the names of the missing columns.
    pub fn dense(&self) -> Result<Vec<f64>, Vec<&str>> {
        let missing = self.missing();
        if !missing.is_empty() {
            return Err(missing);
        }
        Ok(self.values.iter().flatten().copied().collect())
    }
}

/// Encodes weather records against one model's feature schema.
#[derive(Debug, Clone)]
pub struct FeatureEncoder {
    schema: Vec<String>,
}

impl FeatureEncoder {
    pub fn new(schema: Vec<String>) -> Self {
        Self { schema }
    }

    /// Reject schemas containing columns the category tables cannot produce.
    pub fn check_schema(schema: &[String]) -> Result<(), ModelLoadError> {
        if schema.is_empty() {
            return Err(ModelLoadError::MissingSchema);
        }

        let unknown: Vec<String> = schema
            .iter()
            .filter(|c| !NUMERIC_ATTRIBUTES.contains(&c.as_str()) && !is_indicator_column(c))
            .cloned()
            .collect();

        if unknown.is_empty() { Ok(()) } else { Err(ModelLoadError::SchemaMismatch(unknown)) }
    }

    pub fn schema(&self) -> &[String] {
        &self.schema
    }

    pub fn encode(&self, record: &WeatherRecord) -> FeatureFrame {
        let mut encoded: HashMap<String, f64> = record
            .numeric_values()
            .into_iter()
            .filter_map(|(name, value)| value.map(|v| (name.to_string(), v)))
            .collect();

        for (attribute, categories) in CATEGORICAL_COLUMNS {
            let value = record.category(attribute);
            for category in categories {
                let hit = if value == Some(*category) { 1.0 } else { 0.0 };
                encoded.insert(indicator_column(attribute, category), hit);
            }
        }

        let values = self
            .schema
            .iter()
            .map(|column| match encoded.remove(column) {
                Some(v) => Some(v),
                None if is_indicator_column(column) => Some(0.0),
                None => None,
            })
            .collect();

        if !encoded.is_empty() {
            trace!(dropped = encoded.len(), "columns outside the model schema discarded");
        }

        FeatureFrame { columns: self.schema.clone(), values }
    }
}
