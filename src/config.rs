use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{InferenceError, InferenceResult};
use crate::math::precision::Precision;

/// Which activation each layer applies during a forward pass.
///
/// - `Declared`   — the activation stored with the layer.
/// - `LegacyRelu` — ReLU on every layer, whatever the layer declares. Older
///                  tooling evaluated saved models this way; use it to
///                  reproduce their outputs exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationMode {
    #[default]
    Declared,
    LegacyRelu,
}

/// Knobs shared by loading and inference.
///
/// # Fields
/// - `precision`       — width parameters and layer outputs are rounded to
/// - `activation_mode` — see [`ActivationMode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub precision: Precision,
    pub activation_mode: ActivationMode,
}

impl InferenceConfig {
    pub fn new(precision: Precision, activation_mode: ActivationMode) -> Self {
        InferenceConfig { precision, activation_mode }
    }

    /// Reads a JSON config file. Missing fields keep their defaults.
    pub fn load_json(path: impl AsRef<Path>) -> InferenceResult<InferenceConfig> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| InferenceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let reader = std::io::BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}
