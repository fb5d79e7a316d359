use serde::{Deserialize, Serialize};

use crate::activation::activation::{Activation, NeuroplastParams};
use crate::error::{InferenceError, InferenceResult};
use crate::layers::dense::DenseLayer;
use crate::network::metadata::ModelMetadata;

/// Format tag written by the model saver.
pub const FORMAT_TAG: &str = "NEURH5";
/// Newest record layout this crate understands.
pub const SUPPORTED_VERSION: u32 = 1;

/// Optional envelope fields in front of the metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordHeader {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

/// On-disk shape of a saved model.
///
/// Unknown top-level sections (such as the saver's `architecture` summary)
/// are ignored on read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRecord {
    #[serde(flatten)]
    pub header: RecordHeader,
    pub metadata: ModelMetadata,
    pub parameters: ParametersRecord,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParametersRecord {
    pub layers: Vec<LayerRecord>,
}

/// One layer entry. Only `weights` and `biases` are required; the
/// activation is read from `activation` (name) or `activation_type`
/// (integer tag) and defaults to ReLU when neither is given.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer_id: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_size: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_size: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activation_type: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpha: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub neuroplast_params: Option<NeuroplastParams>,
    pub weights: Vec<Vec<f64>>,
    pub biases: Vec<f64>,
}

impl ModelRecord {
    /// Rejects envelopes written by a newer saver.
    pub fn check_version(&self) -> InferenceResult<()> {
        match self.header.version {
            Some(v) if v > SUPPORTED_VERSION => Err(InferenceError::MalformedRecord(format!(
                "record version {v} is newer than supported version {SUPPORTED_VERSION}"
            ))),
            _ => Ok(()),
        }
    }
}

impl LayerRecord {
    /// Decodes the entry at position `index` into a validated layer.
    pub fn into_layer(self, index: usize) -> InferenceResult<DenseLayer> {
        let activation = self.resolve_activation().map_err(|e| at_layer(index, e))?;

        let declared_in = self.input_size;
        let declared_out = self.output_size;
        let layer = DenseLayer::new(self.weights, self.biases, activation)
            .map_err(|e| at_layer(index, e))?;

        if let Some(n) = declared_in.filter(|&n| n != layer.input_dim()) {
            return Err(InferenceError::MalformedRecord(format!(
                "layer {index}: input_size is {n} but weights have {} columns",
                layer.input_dim()
            )));
        }
        if let Some(n) = declared_out.filter(|&n| n != layer.output_dim()) {
            return Err(InferenceError::MalformedRecord(format!(
                "layer {index}: output_size is {n} but weights have {} rows",
                layer.output_dim()
            )));
        }
        Ok(layer)
    }

    /// Encodes `layer` as entry number `index`, with every optional field
    /// filled in.
    pub fn from_layer(index: usize, layer: &DenseLayer) -> LayerRecord {
        let activation = layer.activation();
        LayerRecord {
            layer_id: Some(index),
            input_size: Some(layer.input_dim()),
            output_size: Some(layer.output_dim()),
            activation: Some(activation.name().to_string()),
            activation_type: Some(activation.code()),
            alpha: activation.alpha(),
            neuroplast_params: activation.neuroplast_params(),
            weights: layer.weights().data.clone(),
            biases: layer.biases().to_vec(),
        }
    }

    fn resolve_activation(&self) -> InferenceResult<Activation> {
        let by_name = self
            .activation
            .as_deref()
            .map(|name| Activation::from_name(name, self.alpha, self.neuroplast_params))
            .transpose()?;
        let by_code = self
            .activation_type
            .map(|code| Activation::from_code(code, self.alpha, self.neuroplast_params))
            .transpose()?;

        match (by_name, by_code) {
            (Some(a), Some(b)) if a != b => Err(InferenceError::MalformedRecord(format!(
                "activation `{}` contradicts activation_type {}",
                a.name(),
                b.code()
            ))),
            (Some(a), _) | (None, Some(a)) => Ok(a),
            (None, None) => Ok(Activation::ReLU),
        }
    }
}

/// Prefixes malformed-record messages with the offending layer position.
pub(crate) fn at_layer(index: usize, e: InferenceError) -> InferenceError {
    match e {
        InferenceError::MalformedRecord(msg) => {
            InferenceError::MalformedRecord(format!("layer {index}: {msg}"))
        }
        other => other,
    }
}
