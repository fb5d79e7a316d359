//! Forward-pass behaviour: known vectors, shape law, determinism, activation
//! modes, precision, and record round-trips.

use std::sync::Arc;
use std::thread;

use ferrite_infer::*;
use rand::prelude::*;
use rand::rngs::StdRng;

fn layer(weights: Vec<Vec<f64>>, biases: Vec<f64>, activation: Activation) -> DenseLayer {
    DenseLayer::new(weights, biases, activation).unwrap()
}

fn model(layers: Vec<DenseLayer>) -> ModelDescriptor {
    ModelDescriptor::new(layers, ModelMetadata::new(0.9, 0.1)).unwrap()
}

fn batch(rows: Vec<Vec<f64>>) -> Matrix {
    Matrix::from_rows(rows).unwrap()
}

fn f64_engine() -> InferenceEngine {
    InferenceEngine::new(InferenceConfig::new(Precision::F64, ActivationMode::Declared))
}

// =============================================================================
// Known scenarios
// =============================================================================

#[test]
fn test_identity_layer_returns_input() {
    let d = model(vec![layer(
        vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0], vec![0.0, 0.0, 1.0]],
        vec![0.0; 3],
        Activation::Identity,
    )]);
    let x = batch(vec![vec![-1.5, 0.0, 7.25], vec![3.0, -2.0, 0.5]]);
    assert_eq!(forward(&d, &x).unwrap(), x);
}

#[test]
fn test_relu_known_vector() {
    let identity = layer(vec![vec![1.0, 0.0], vec![0.0, 1.0]], vec![0.0, 0.0], Activation::ReLU);
    let d = model(vec![identity]);
    let out = forward(&d, &batch(vec![vec![-1.0, 2.0]])).unwrap();
    assert_eq!(out.data, vec![vec![0.0, 2.0]]);
}

#[test]
fn test_two_layer_chain() {
    let d = model(vec![
        layer(vec![vec![1.0, 1.0]], vec![0.0], Activation::Identity),
        layer(vec![vec![2.0]], vec![1.0], Activation::Identity),
    ]);
    let out = forward(&d, &batch(vec![vec![1.0, 1.0]])).unwrap();
    assert_eq!(out.data, vec![vec![5.0]]);
}

#[test]
fn test_declared_activations_are_applied_per_layer() {
    let d = model(vec![
        layer(vec![vec![1.0], vec![-1.0]], vec![0.0, 0.0], Activation::Tanh),
        layer(vec![vec![1.0, 1.0]], vec![0.0], Activation::Sigmoid),
    ]);
    let out = f64_engine().forward(&d, &batch(vec![vec![0.5]])).unwrap();
    // tanh is odd, so the hidden pair cancels and sigmoid(0) = 0.5
    assert!((out.data[0][0] - 0.5).abs() < 1e-12);

    let out = f64_engine().forward(&d, &batch(vec![vec![2.0]])).unwrap();
    assert!((out.data[0][0] - 0.5).abs() < 1e-12);
}

#[test]
fn test_no_output_normalisation() {
    let d = model(vec![layer(vec![vec![10.0], vec![20.0]], vec![0.0, 0.0], Activation::Identity)]);
    let out = forward(&d, &batch(vec![vec![1.0]])).unwrap();
    assert_eq!(out.data, vec![vec![10.0, 20.0]]);
}

// =============================================================================
// Activation modes
// =============================================================================

#[test]
fn test_legacy_mode_uses_relu_everywhere() {
    let d = model(vec![
        layer(vec![vec![1.0]], vec![0.0], Activation::Identity),
        layer(vec![vec![-1.0]], vec![0.0], Activation::Sigmoid),
    ]);
    let x = batch(vec![vec![3.0]]);

    let strict = f64_engine().forward(&d, &x).unwrap();
    let expected = 1.0 / (1.0 + 3.0f64.exp());
    assert!((strict.data[0][0] - expected).abs() < 1e-12);

    let legacy_config = InferenceConfig::new(Precision::F64, ActivationMode::LegacyRelu);
    let legacy = InferenceEngine::new(legacy_config).forward(&d, &x).unwrap();
    assert_eq!(legacy.data, vec![vec![0.0]]);
}

// =============================================================================
// Errors
// =============================================================================

#[test]
fn test_input_width_mismatch() {
    let d = model(vec![layer(vec![vec![1.0, 1.0]], vec![0.0], Activation::ReLU)]);
    let err = forward(&d, &batch(vec![vec![1.0, 2.0, 3.0]])).unwrap_err();
    assert!(matches!(err, InferenceError::ShapeMismatch { layer: 0, expected: 2, actual: 3 }));
}

#[test]
fn test_ragged_rows_are_shape_mismatch() {
    let d = model(vec![layer(vec![vec![1.0, 1.0]], vec![0.0], Activation::ReLU)]);
    let err = f64_engine()
        .forward_rows(&d, vec![vec![1.0, 2.0], vec![1.0]])
        .unwrap_err();
    assert!(matches!(err, InferenceError::ShapeMismatch { layer: 0, expected: 2, actual: 1 }));
}

#[test]
fn test_unknown_activation_in_record() {
    let json = r#"{
        "metadata": {"accuracy": 0.5, "loss": 0.7},
        "parameters": {"layers": [
            {"weights": [[1.0]], "biases": [0.0], "activation": "hard_swish"}
        ]}
    }"#;
    let err = ModelDescriptor::from_json_str(json, Precision::F32).unwrap_err();
    assert!(matches!(err, InferenceError::UnsupportedActivation(ref a) if a == "hard_swish"));
}

#[test]
fn test_unchained_record_is_dimension_mismatch() {
    let json = r#"{
        "metadata": {"accuracy": 0.5, "loss": 0.7},
        "parameters": {"layers": [
            {"weights": [[1.0, 2.0], [3.0, 4.0]], "biases": [0.0, 0.0]},
            {"weights": [[1.0, 2.0, 3.0]], "biases": [0.0]}
        ]}
    }"#;
    let err = ModelDescriptor::from_json_str(json, Precision::F32).unwrap_err();
    assert!(matches!(err, InferenceError::DimensionMismatch { layer: 1, expected: 3, actual: 2 }));
}

/// Wraps one layer entry in an otherwise valid record.
fn single_layer(layer: &str) -> String {
    let metadata = r#""metadata": {"accuracy": 1, "loss": 0}"#;
    format!(r#"{{{metadata}, "parameters": {{"layers": [{layer}]}}}}"#)
}

#[test]
fn test_malformed_records() {
    let cases = vec![
        "not json".to_string(),
        r#"{"metadata": {"accuracy": 1, "loss": 0}}"#.to_string(),
        r#"{"metadata": {"accuracy": 1, "loss": 0}, "parameters": {"layers": []}}"#.to_string(),
        single_layer(r#"{"weights": [[1.0]]}"#),
        single_layer(r#"{"biases": [1.0]}"#),
        single_layer(r#"{"weights": [[1.0], [1.0, 2.0]], "biases": [0, 0]}"#),
        single_layer(r#"{"weights": [[1.0]], "biases": [0, 0]}"#),
        single_layer(r#"{"weights": [["a"]], "biases": [0]}"#),
        // representable as f64 but not as f32
        single_layer(r#"{"weights": [[1e39]], "biases": [0]}"#),
        r#"{"metadata": {"loss": 0},
            "parameters": {"layers": [{"weights": [[1.0]], "biases": [0]}]}}"#
            .to_string(),
    ];
    for json in &cases {
        let result = ModelDescriptor::from_json_str(json, Precision::F32);
        assert!(
            matches!(result, Err(InferenceError::MalformedRecord(_))),
            "expected MalformedRecord for {json}, got {result:?}"
        );
    }
}

// =============================================================================
// Shape law, determinism, batching
// =============================================================================

fn random_descriptor(rng: &mut StdRng) -> ModelDescriptor {
    let activations = [
        Activation::ReLU,
        Activation::Sigmoid,
        Activation::Tanh,
        Activation::Identity,
        Activation::Gelu,
        Activation::LeakyReLU { alpha: 0.05 },
        Activation::Elu { alpha: 0.5 },
        Activation::Mish,
        Activation::Swish,
        Activation::PReLU { alpha: 0.25 },
        Activation::Neuroplast(NeuroplastParams { alpha: 1.5, beta: 0.1, gamma: 0.8, delta: 1.2 }),
    ];
    let depth = rng.gen_range(1..=4);
    let mut width = rng.gen_range(1..=6);
    let mut layers = Vec::with_capacity(depth);
    for _ in 0..depth {
        let out = rng.gen_range(1..=6);
        // f32-representable values so both precisions agree on the stored parameters
        let mut value = || (rng.gen::<f64>() * 2.0 - 1.0) as f32 as f64;
        let weights = (0..out).map(|_| (0..width).map(|_| value()).collect()).collect();
        let biases = (0..out).map(|_| value()).collect();
        let activation = activations[rng.gen_range(0..activations.len())];
        layers.push(layer(weights, biases, activation));
        width = out;
    }
    let metadata = ModelMetadata::new(rng.gen(), rng.gen())
        .with("model_name", "random")
        .with("epoch", rng.gen_range(1..100i64));
    ModelDescriptor::new(layers, metadata).unwrap()
}

fn random_batch(rng: &mut StdRng, rows: usize, cols: usize) -> Matrix {
    batch((0..rows).map(|_| (0..cols).map(|_| rng.gen::<f64>() * 4.0 - 2.0).collect()).collect())
}

#[test]
fn test_shape_law() {
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..25 {
        let d = random_descriptor(&mut rng);
        let rows = rng.gen_range(1..8);
        let x = random_batch(&mut rng, rows, d.input_dim());
        let out = forward(&d, &x).unwrap();
        assert_eq!(out.rows, rows);
        assert_eq!(out.cols, d.layers().last().unwrap().biases().len());
    }
}

#[test]
fn test_forward_is_deterministic() {
    let mut rng = StdRng::seed_from_u64(3);
    let d = random_descriptor(&mut rng);
    let x = random_batch(&mut rng, 5, d.input_dim());
    let engine = InferenceEngine::default();
    assert_eq!(engine.forward(&d, &x).unwrap(), engine.forward(&d, &x).unwrap());
}

#[test]
fn test_rows_are_independent() {
    let mut rng = StdRng::seed_from_u64(5);
    let d = random_descriptor(&mut rng);
    let x = random_batch(&mut rng, 4, d.input_dim());
    let engine = f64_engine();
    let whole = engine.forward(&d, &x).unwrap();
    for (row, expected) in x.data.iter().zip(&whole.data) {
        assert_eq!(&engine.predict_one(&d, row).unwrap(), expected);
    }
}

#[test]
fn test_empty_batch() {
    let d = model(vec![layer(vec![vec![1.0, 1.0]; 3], vec![0.0; 3], Activation::ReLU)]);
    let out = f64_engine().forward_rows(&d, vec![]).unwrap();
    assert_eq!((out.rows, out.cols), (0, 3));
}

#[test]
fn test_shared_descriptor_across_threads() {
    let mut rng = StdRng::seed_from_u64(21);
    let d = Arc::new(random_descriptor(&mut rng));
    let x = Arc::new(random_batch(&mut rng, 3, d.input_dim()));
    let expected = forward(&d, &x).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let (d, x) = (Arc::clone(&d), Arc::clone(&x));
            thread::spawn(move || forward(&d, &x).unwrap())
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}

// =============================================================================
// Precision
// =============================================================================

#[test]
fn test_f32_outputs_are_f32_representable() {
    let d = model(vec![layer(vec![vec![0.3, 0.7]], vec![0.1], Activation::Sigmoid)]);
    let x = batch(vec![vec![0.123456789, -0.987654321]]);
    let out32 = forward(&d, &x).unwrap();
    let out64 = f64_engine().forward(&d, &x).unwrap();
    let v = out32.data[0][0];
    assert_eq!(v, v as f32 as f64);
    assert!((v - out64.data[0][0]).abs() < 1e-6);
}

// =============================================================================
// Round-trip
// =============================================================================

#[test]
fn test_json_round_trip_preserves_outputs() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..20 {
        let d = random_descriptor(&mut rng);
        let x = random_batch(&mut rng, 3, d.input_dim());
        let json = d.to_json_string().unwrap();

        for precision in [Precision::F32, Precision::F64] {
            let reloaded = ModelDescriptor::from_json_str(&json, precision).unwrap();
            assert_eq!(reloaded, d);
            let config = InferenceConfig::new(precision, ActivationMode::Declared);
            let engine = InferenceEngine::new(config);
            assert_eq!(engine.forward(&reloaded, &x).unwrap(), engine.forward(&d, &x).unwrap());
        }
    }
}

#[test]
fn test_saver_layout_loads() {
    // Layout written by the model saver, including fields we do not use.
    let json = r#"{
      "format": "NEURH5",
      "version": 1,
      "timestamp": 1718000000,
      "metadata": {
        "model_name": "model_1",
        "accuracy": 0.912345,
        "loss": 0.201000,
        "validation_accuracy": 0.900000,
        "validation_loss": 0.250000,
        "epoch": 37,
        "optimizer": "adamw",
        "strategy": "standard",
        "learning_rate": 0.001000,
        "batch_size": 32,
        "num_layers": 2
      },
      "architecture": {
        "layer_sizes": [2, 2, 1],
        "activation_types": [0, 1]
      },
      "parameters": {
        "layers": [
          {
            "layer_id": 0,
            "input_size": 2,
            "output_size": 2,
            "activation_type": 0,
            "weights": [
              [1.00000000, -1.00000000],
              [0.50000000, 0.50000000]
            ],
            "biases": [0.00000000, 0.00000000]
          },
          {
            "layer_id": 1,
            "input_size": 2,
            "output_size": 1,
            "activation_type": 1,
            "weights": [
              [1.00000000, 1.00000000]
            ],
            "biases": [-1.00000000]
          }
        ]
      }
    }"#;
    let d = ModelDescriptor::from_json_str(json, Precision::F32).unwrap();
    assert_eq!(d.metadata().model_name(), Some("model_1"));
    assert_eq!(d.metadata().get("optimizer"), Some(&MetadataValue::Text("adamw".into())));
    assert_eq!(d.layers()[1].activation(), Activation::Sigmoid);

    // hidden = relu([2, 1]); out = sigmoid(2 + 1 - 1)
    let out = forward(&d, &batch(vec![vec![2.0, 0.0]])).unwrap();
    let expected = 1.0 / (1.0 + (-2.0f64).exp());
    assert!((out.data[0][0] - expected).abs() < 1e-6);
    assert_eq!(predict_classes(&out), vec![1]);
}
