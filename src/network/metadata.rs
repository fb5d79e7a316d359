use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{InferenceError, InferenceResult};

/// A scalar metadata value. Nested objects and arrays are not accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl MetadataValue {
    /// Numeric view of integer and float values.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetadataValue::Integer(i) => Some(*i as f64),
            MetadataValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<f64> for MetadataValue {
    fn from(v: f64) -> Self {
        MetadataValue::Float(v)
    }
}

impl From<i64> for MetadataValue {
    fn from(v: i64) -> Self {
        MetadataValue::Integer(v)
    }
}

impl From<bool> for MetadataValue {
    fn from(v: bool) -> Self {
        MetadataValue::Bool(v)
    }
}

impl From<&str> for MetadataValue {
    fn from(v: &str) -> Self {
        MetadataValue::Text(v.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(v: String) -> Self {
        MetadataValue::Text(v)
    }
}

impl std::fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetadataValue::Bool(b) => write!(f, "{b}"),
            MetadataValue::Integer(i) => write!(f, "{i}"),
            MetadataValue::Float(x) => write!(f, "{x}"),
            MetadataValue::Text(s) => f.write_str(s),
        }
    }
}

/// Training results stored alongside a model's parameters.
///
/// `accuracy` and `loss` are always present; anything else the trainer
/// recorded (epoch, optimizer name, validation scores, ...) lands in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub accuracy: f64,
    pub loss: f64,
    #[serde(flatten)]
    pub extra: BTreeMap<String, MetadataValue>,
}

impl ModelMetadata {
    pub fn new(accuracy: f64, loss: f64) -> Self {
        ModelMetadata { accuracy, loss, extra: BTreeMap::new() }
    }

    /// Builder-style insert of an extra field.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.extra.get(key)
    }

    pub fn model_name(&self) -> Option<&str> {
        self.get("model_name").and_then(MetadataValue::as_str)
    }

    /// Rejects NaN and infinite figures. JSON cannot represent them, so a
    /// descriptor carrying one could be saved but never loaded again.
    pub fn validate(&self) -> InferenceResult<()> {
        let figures = [("accuracy", self.accuracy), ("loss", self.loss)];
        let extras = self.extra.iter().filter_map(|(key, value)| match value {
            MetadataValue::Float(x) => Some((key.as_str(), *x)),
            _ => None,
        });
        match figures.into_iter().chain(extras).find(|(_, x)| !x.is_finite()) {
            Some((key, x)) => Err(InferenceError::MalformedRecord(format!(
                "metadata `{key}` is not finite ({x})"
            ))),
            None => Ok(()),
        }
    }

    /// Composite ranking score, higher is better:
    /// `0.4·acc + 0.4·val_acc + 0.1/(1+loss) + 0.1/(1+val_loss)`.
    ///
    /// Validation figures fall back to the training ones when missing.
    pub fn score(&self) -> f64 {
        let val_accuracy = self
            .get("validation_accuracy")
            .and_then(MetadataValue::as_f64)
            .unwrap_or(self.accuracy);
        let val_loss = self
            .get("validation_loss")
            .and_then(MetadataValue::as_f64)
            .unwrap_or(self.loss);
        self.accuracy * 0.4
            + val_accuracy * 0.4
            + (1.0 / (1.0 + self.loss)) * 0.1
            + (1.0 / (1.0 + val_loss)) * 0.1
    }
}
