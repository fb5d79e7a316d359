use crate::{
    activation::activation::Activation,
    config::{ActivationMode, InferenceConfig},
    error::{InferenceError, InferenceResult},
    math::{matrix::Matrix, precision::Precision},
};

/// One fully connected layer: `y = activation(x · Wᵀ + b)`.
///
/// `weights` has shape `(output_dim, input_dim)`; row `i` holds the incoming
/// weights of output neuron `i`. `biases` has one entry per output neuron.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseLayer {
    weights: Matrix,
    biases: Vec<f64>,
    activation: Activation,
}

impl DenseLayer {
    /// Builds a layer, checking that the weight rows are rectangular,
    /// non-empty, and agree with the bias length, and that every parameter
    /// is finite.
    pub fn new(
        weights: Vec<Vec<f64>>,
        biases: Vec<f64>,
        activation: Activation,
    ) -> InferenceResult<DenseLayer> {
        let weights = Matrix::from_rows(weights).ok_or_else(|| {
            InferenceError::MalformedRecord("weight rows have different lengths".to_string())
        })?;
        if weights.rows == 0 {
            return Err(InferenceError::MalformedRecord("layer has no neurons".to_string()));
        }
        if weights.cols == 0 {
            return Err(InferenceError::MalformedRecord("layer has no inputs".to_string()));
        }
        if weights.rows != biases.len() {
            return Err(InferenceError::MalformedRecord(format!(
                "{} weight rows but {} biases",
                weights.rows,
                biases.len()
            )));
        }
        let weights_finite = weights.data.iter().flatten().all(|x| x.is_finite());
        if !weights_finite || !biases.iter().all(|x| x.is_finite()) {
            return Err(InferenceError::MalformedRecord(
                "layer parameters must be finite".to_string(),
            ));
        }
        activation.validate()?;
        Ok(DenseLayer { weights, biases, activation })
    }

    pub fn input_dim(&self) -> usize {
        self.weights.cols
    }

    pub fn output_dim(&self) -> usize {
        self.weights.rows
    }

    pub fn weights(&self) -> &Matrix {
        &self.weights
    }

    pub fn biases(&self) -> &[f64] {
        &self.biases
    }

    pub fn activation(&self) -> Activation {
        self.activation
    }

    /// Rounds every parameter to `precision`. Values outside the f32 range
    /// overflow to infinity and are rejected.
    pub fn with_precision(self, precision: Precision) -> InferenceResult<DenseLayer> {
        DenseLayer::new(
            self.weights.map(|x| precision.round(x)).into_rows(),
            self.biases.into_iter().map(|x| precision.round(x)).collect(),
            self.activation,
        )
    }

    /// Applies the layer to a whole batch (one sample per row).
    ///
    /// `index` is this layer's position in the network and only feeds error
    /// reporting.
    pub fn forward(
        &self,
        index: usize,
        input: &Matrix,
        config: &InferenceConfig,
    ) -> InferenceResult<Matrix> {
        let shape_error = || InferenceError::ShapeMismatch {
            layer: index,
            expected: self.input_dim(),
            actual: input.cols,
        };
        if input.rows == 0 {
            // 0xN batches come out of Matrix::zeros; the column check still applies.
            if input.cols != self.input_dim() {
                return Err(shape_error());
            }
            return Ok(Matrix::zeros(0, self.output_dim()));
        }

        let z = input
            .mul_transposed(&self.weights)
            .ok_or_else(shape_error)?
            .add_row(&self.biases)
            .ok_or_else(shape_error)?;

        let activation = match config.activation_mode {
            ActivationMode::Declared => self.activation,
            ActivationMode::LegacyRelu => Activation::ReLU,
        };
        let precision = config.precision;
        Ok(z.map(|x| precision.round(activation.function(x))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f64_config() -> InferenceConfig {
        InferenceConfig { precision: Precision::F64, ..InferenceConfig::default() }
    }

    #[test]
    fn rejects_inconsistent_parameters() {
        let ragged =
            DenseLayer::new(vec![vec![1.0, 2.0], vec![1.0]], vec![0.0, 0.0], Activation::ReLU);
        assert!(matches!(ragged, Err(InferenceError::MalformedRecord(_))));

        let bias_len = DenseLayer::new(vec![vec![1.0, 2.0]], vec![0.0, 0.0], Activation::ReLU);
        assert!(matches!(bias_len, Err(InferenceError::MalformedRecord(_))));

        let empty = DenseLayer::new(vec![], vec![], Activation::ReLU);
        assert!(matches!(empty, Err(InferenceError::MalformedRecord(_))));

        let no_inputs = DenseLayer::new(vec![vec![]], vec![0.0], Activation::ReLU);
        assert!(matches!(no_inputs, Err(InferenceError::MalformedRecord(_))));
    }

    #[test]
    fn affine_then_activation() {
        let layer = DenseLayer::new(
            vec![vec![1.0, -1.0], vec![0.5, 0.5]],
            vec![0.0, -2.0],
            Activation::ReLU,
        )
        .unwrap();
        let x = Matrix::from_rows(vec![vec![3.0, 1.0], vec![1.0, 3.0]]).unwrap();
        let y = layer.forward(0, &x, &f64_config()).unwrap();
        assert_eq!(y.data, vec![vec![2.0, 0.0], vec![0.0, 0.0]]);
    }

    #[test]
    fn legacy_mode_forces_relu() {
        let layer = DenseLayer::new(vec![vec![1.0]], vec![0.0], Activation::Identity).unwrap();
        let x = Matrix::from_row(vec![-4.0]);
        let declared = layer.forward(0, &x, &f64_config()).unwrap();
        let legacy_config =
            InferenceConfig { activation_mode: ActivationMode::LegacyRelu, ..f64_config() };
        let legacy = layer.forward(0, &x, &legacy_config).unwrap();
        assert_eq!(declared.data, vec![vec![-4.0]]);
        assert_eq!(legacy.data, vec![vec![0.0]]);
    }

    #[test]
    fn wrong_width_reports_layer_index() {
        let layer = DenseLayer::new(vec![vec![1.0, 1.0]], vec![0.0], Activation::ReLU).unwrap();
        let err = layer.forward(3, &Matrix::from_row(vec![1.0]), &f64_config()).unwrap_err();
        assert!(matches!(err, InferenceError::ShapeMismatch { layer: 3, expected: 2, actual: 1 }));
    }

    #[test]
    fn empty_batch_keeps_output_width() {
        let layer =
            DenseLayer::new(vec![vec![1.0, 1.0]; 3], vec![0.0; 3], Activation::ReLU).unwrap();
        let y = layer.forward(0, &Matrix::zeros(0, 2), &f64_config()).unwrap();
        assert_eq!((y.rows, y.cols), (0, 3));
    }

    #[test]
    fn non_finite_parameters_are_rejected() {
        let inf_weight = DenseLayer::new(vec![vec![f64::INFINITY]], vec![0.0], Activation::ReLU);
        assert!(matches!(inf_weight, Err(InferenceError::MalformedRecord(_))));

        let nan_bias = DenseLayer::new(vec![vec![1.0]], vec![f64::NAN], Activation::ReLU);
        assert!(matches!(nan_bias, Err(InferenceError::MalformedRecord(_))));

        let bad_slope = DenseLayer::new(
            vec![vec![1.0]],
            vec![0.0],
            Activation::LeakyReLU { alpha: f64::NAN },
        );
        assert!(matches!(bad_slope, Err(InferenceError::MalformedRecord(_))));
    }

    #[test]
    fn f32_overflow_is_rejected() {
        let huge = DenseLayer::new(vec![vec![1e300]], vec![0.0], Activation::Identity).unwrap();
        assert!(huge.clone().with_precision(Precision::F64).is_ok());
        assert!(matches!(
            huge.with_precision(Precision::F32),
            Err(InferenceError::MalformedRecord(_))
        ));
    }
}
