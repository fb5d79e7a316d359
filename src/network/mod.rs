pub mod descriptor;
pub mod engine;
pub mod metadata;
pub mod record;

pub use descriptor::ModelDescriptor;
pub use engine::{forward, predict_classes, InferenceEngine};
pub use metadata::{MetadataValue, ModelMetadata};
pub use record::{LayerRecord, ModelRecord, RecordHeader};
