use log::trace;

use crate::config::InferenceConfig;
use crate::error::{InferenceError, InferenceResult};
use crate::math::matrix::Matrix;
use crate::network::descriptor::ModelDescriptor;

/// Runs forward passes. Holds only its configuration, so one engine can
/// serve any number of descriptors and callers.
#[derive(Debug, Clone, Copy, Default)]
pub struct InferenceEngine {
    config: InferenceConfig,
}

impl InferenceEngine {
    pub fn new(config: InferenceConfig) -> Self {
        InferenceEngine { config }
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    /// Forward pass over a batch (one sample per row).
    ///
    /// Returns a `(input.rows, descriptor.output_dim())` matrix. The final
    /// layer's output is returned as-is; no extra normalisation is applied.
    pub fn forward(
        &self,
        descriptor: &ModelDescriptor,
        input: &Matrix,
    ) -> InferenceResult<Matrix> {
        let (first, rest) = descriptor
            .layers()
            .split_first()
            .ok_or_else(|| InferenceError::MalformedRecord("model has no layers".to_string()))?;
        trace!(
            "forward: {} samples through {} layers",
            input.rows,
            descriptor.layers().len()
        );

        let mut current = first.forward(0, input, &self.config)?;
        for (i, layer) in rest.iter().enumerate() {
            current = layer.forward(i + 1, &current, &self.config)?;
        }
        Ok(current)
    }

    /// Forward pass over nested rows. Ragged rows fail with `ShapeMismatch`
    /// against the model's input width.
    pub fn forward_rows(
        &self,
        descriptor: &ModelDescriptor,
        rows: Vec<Vec<f64>>,
    ) -> InferenceResult<Matrix> {
        let expected = descriptor.input_dim();
        if let Some(bad) = rows.iter().find(|r| r.len() != expected) {
            return Err(InferenceError::ShapeMismatch { layer: 0, expected, actual: bad.len() });
        }
        let batch = if rows.is_empty() {
            Matrix::zeros(0, expected)
        } else {
            Matrix::from_rows(rows).ok_or(InferenceError::ShapeMismatch {
                layer: 0,
                expected,
                actual: 0,
            })?
        };
        self.forward(descriptor, &batch)
    }

    /// Forward pass for a single sample.
    pub fn predict_one(
        &self,
        descriptor: &ModelDescriptor,
        sample: &[f64],
    ) -> InferenceResult<Vec<f64>> {
        let out = self.forward(descriptor, &Matrix::from_row(sample.to_vec()))?;
        Ok(out.into_rows().into_iter().next().unwrap_or_default())
    }
}

/// Forward pass with the default configuration (declared activations, f32).
pub fn forward(descriptor: &ModelDescriptor, input: &Matrix) -> InferenceResult<Matrix> {
    InferenceEngine::default().forward(descriptor, input)
}

/// Turns network outputs into class indices.
///
/// A single output column is read as a probability: class 1 only when it is strictly
/// above 0.5;
/// wider outputs pick the index of the largest value (first one on ties).
pub fn predict_classes(output: &Matrix) -> Vec<usize> {
    output
        .data
        .iter()
        .map(|row| {
            if row.len() == 1 {
                usize::from(row[0] > 0.5)
            } else {
                row.iter()
                    .enumerate()
                    .fold((0, f64::NEG_INFINITY), |(best, max), (i, &x)| {
                        if x > max { (i, x) } else { (best, max) }
                    })
                    .0
            }
        })
        .collect()
}
