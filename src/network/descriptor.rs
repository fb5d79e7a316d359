use std::io::{BufReader, ErrorKind, Write};
use std::path::Path;

use crate::error::{InferenceError, InferenceResult};
use crate::layers::dense::DenseLayer;
use crate::math::precision::Precision;
use crate::network::metadata::ModelMetadata;
use crate::network::record::{
    at_layer, LayerRecord, ModelRecord, ParametersRecord, RecordHeader,
};

/// A trained network: its layers in evaluation order plus training metadata.
///
/// Construction validates everything the forward pass relies on (at least
/// one layer, each layer's input width equal to the previous layer's output
/// width), so a descriptor never changes and can be shared freely between
/// threads.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelDescriptor {
    layers: Vec<DenseLayer>,
    metadata: ModelMetadata,
    header: RecordHeader,
}

impl ModelDescriptor {
    pub fn new(
        layers: Vec<DenseLayer>,
        metadata: ModelMetadata,
    ) -> InferenceResult<ModelDescriptor> {
        metadata.validate()?;
        if layers.is_empty() {
            return Err(InferenceError::MalformedRecord("model has no layers".to_string()));
        }
        for (index, pair) in layers.windows(2).enumerate() {
            let (prev, next) = (&pair[0], &pair[1]);
            if next.input_dim() != prev.output_dim() {
                return Err(InferenceError::DimensionMismatch {
                    layer: index + 1,
                    expected: next.input_dim(),
                    actual: prev.output_dim(),
                });
            }
        }
        Ok(ModelDescriptor { layers, metadata, header: RecordHeader::default() })
    }

    /// Attaches envelope fields that are written back by `to_record`.
    pub fn with_header(mut self, header: RecordHeader) -> ModelDescriptor {
        self.header = header;
        self
    }

    pub fn layers(&self) -> &[DenseLayer] {
        &self.layers
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    pub fn header(&self) -> &RecordHeader {
        &self.header
    }

    /// Number of features each input sample must have.
    pub fn input_dim(&self) -> usize {
        self.layers[0].input_dim()
    }

    /// Number of values produced per sample.
    pub fn output_dim(&self) -> usize {
        self.layers[self.layers.len() - 1].output_dim()
    }

    /// Builds a descriptor from a parsed record, rounding parameters to `precision`.
    pub fn from_record(
        record: ModelRecord,
        precision: Precision,
    ) -> InferenceResult<ModelDescriptor> {
        record.check_version()?;
        let ModelRecord { header, metadata, parameters } = record;
        if parameters.layers.is_empty() {
            return Err(InferenceError::MalformedRecord("record has no layers".to_string()));
        }
        let layers = parameters
            .layers
            .into_iter()
            .enumerate()
            .map(|(i, layer)| {
                let layer = layer.into_layer(i)?;
                layer.with_precision(precision).map_err(|e| at_layer(i, e))
            })
            .collect::<InferenceResult<Vec<_>>>()?;
        Ok(ModelDescriptor::new(layers, metadata)?.with_header(header))
    }

    pub fn to_record(&self) -> ModelRecord {
        ModelRecord {
            header: self.header.clone(),
            metadata: self.metadata.clone(),
            parameters: ParametersRecord {
                layers: self
                    .layers
                    .iter()
                    .enumerate()
                    .map(|(i, layer)| LayerRecord::from_layer(i, layer))
                    .collect(),
            },
        }
    }

    pub fn from_json_str(json: &str, precision: Precision) -> InferenceResult<ModelDescriptor> {
        let record: ModelRecord = serde_json::from_str(json)?;
        ModelDescriptor::from_record(record, precision)
    }

    /// Pretty-printed JSON in the record layout.
    pub fn to_json_string(&self) -> InferenceResult<String> {
        Ok(serde_json::to_string_pretty(&self.to_record())?)
    }

    /// Serializes the descriptor to a pretty-printed JSON file.
    pub fn save_json(&self, path: impl AsRef<Path>) -> InferenceResult<()> {
        let path = path.as_ref();
        let io_err =
            |source: std::io::Error| InferenceError::Io { path: path.to_path_buf(), source };
        let file = std::fs::File::create(path).map_err(io_err)?;
        let mut writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &self.to_record())
            .map_err(|e| io_err(e.into()))?;
        writer.flush().map_err(io_err)
    }

    /// Reads and validates a record file in one pass. A missing file is
    /// reported as `NotFound`; undecodable contents, invalid UTF-8 included,
    /// as `MalformedRecord`.
    pub fn load_json(
        path: impl AsRef<Path>,
        precision: Precision,
    ) -> InferenceResult<ModelDescriptor> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| {
            if source.kind() == ErrorKind::NotFound {
                InferenceError::NotFound {
                    name: path
                        .file_stem()
                        .map(|s| s.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                    dir: path.parent().map(Path::to_path_buf).unwrap_or_default(),
                }
            } else {
                InferenceError::Io { path: path.to_path_buf(), source }
            }
        })?;
        let record: ModelRecord =
            serde_json::from_reader(BufReader::new(file)).map_err(|e| {
                if e.is_io() {
                    InferenceError::Io { path: path.to_path_buf(), source: e.into() }
                } else {
                    e.into()
                }
            })?;
        ModelDescriptor::from_record(record, precision)
    }
}
