use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

use crate::ExplainError;

/// A single feature value of an applicant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Number(f64),
    Category(String),
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => fmt::Display::fmt(value, f),
            Self::Category(category) => fmt::Display::fmt(category, f),
        }
    }
}

impl From<f64> for FeatureValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for FeatureValue {
    fn from(value: &str) -> Self {
        Self::Category(value.to_owned())
    }
}

impl From<String> for FeatureValue {
    fn from(value: String) -> Self {
        Self::Category(value)
    }
}

/// Feature values of one applicant, keyed by base feature id.
///
/// Serialized as a flat JSON object:
///
/// ```
/// use creditlens_engine::{ApplicantRecord, FeatureValue};
///
/// let record: ApplicantRecord =
///     serde_json::from_str(r#"{"age": 35, "purpose": "car_new"}"#).unwrap();
/// assert_eq!(record.number("age"), Ok(35.0));
/// assert_eq!(record.category("purpose"), Ok("car_new"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicantRecord {
    values: BTreeMap<String, FeatureValue>,
}

impl FromIterator<(String, FeatureValue)> for ApplicantRecord {
    fn from_iter<T: IntoIterator<Item = (String, FeatureValue)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl ApplicantRecord {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, id: &str, value: impl Into<FeatureValue>) -> Self {
        self.insert(id.to_owned(), value.into());
        self
    }

    pub fn insert(&mut self, id: String, value: FeatureValue) -> Option<FeatureValue> {
        self.values.insert(id, value)
    }

    pub fn remove(&mut self, id: &str) -> Option<FeatureValue> {
        self.values.remove(id)
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&FeatureValue> {
        self.values.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FeatureValue)> + '_ {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// A finite numeric value for `id`.
    pub fn number(&self, id: &str) -> Result<f64, ExplainError> {
        match self.values.get(id) {
            None => Err(missing(id)),
            Some(FeatureValue::Category(category)) => Err(ExplainError::invalid_input(
                id,
                format!("expected a number, found category '{category}'"),
            )),
            Some(FeatureValue::Number(value)) if !value.is_finite() => Err(
                ExplainError::invalid_input(id, format!("value must be finite, found {value}")),
            ),
            Some(FeatureValue::Number(value)) => Ok(*value),
        }
    }

    /// A category literal for `id`.
    pub fn category(&self, id: &str) -> Result<&str, ExplainError> {
        match self.values.get(id) {
            None => Err(missing(id)),
            Some(FeatureValue::Number(value)) => Err(ExplainError::invalid_input(
                id,
                format!("expected a category, found number {value}"),
            )),
            Some(FeatureValue::Category(category)) => Ok(category),
        }
    }
}

fn missing(id: &str) -> ExplainError {
    ExplainError::invalid_input(id, "required feature is missing")
}
