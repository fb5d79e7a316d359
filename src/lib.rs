pub mod math;
pub mod activation;
pub mod layers;
pub mod network;
pub mod catalog;
pub mod config;
pub mod error;

// Convenience re-exports
pub use math::matrix::Matrix;
pub use math::precision::Precision;
pub use activation::activation::{Activation, NeuroplastParams};
pub use layers::dense::DenseLayer;
pub use network::descriptor::ModelDescriptor;
pub use network::engine::{forward, predict_classes, InferenceEngine};
pub use network::metadata::{MetadataValue, ModelMetadata};
pub use catalog::catalog::ModelCatalog;
pub use config::{ActivationMode, InferenceConfig};
pub use error::{InferenceError, InferenceResult};
