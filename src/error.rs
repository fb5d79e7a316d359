use std::path::PathBuf;
use thiserror::Error;

/// Every failure the loader and the forward pass can report.
///
/// Nothing inside the library recovers from these; they are returned to the
/// caller as-is.
#[derive(Error, Debug)]
pub enum InferenceError {
    /// Unknown model name, rejected name, or no record file on disk.
    #[error("model `{name}` not found in {}", dir.display())]
    NotFound { name: String, dir: PathBuf },

    /// The record could not be parsed or is missing/contradicting fields.
    #[error("malformed model record: {0}")]
    MalformedRecord(String),

    /// Layer `layer` expects `expected` inputs but its predecessor produces `actual`.
    #[error("layer {layer} expects {expected} inputs but the previous layer produces {actual}")]
    DimensionMismatch {
        layer: usize,
        expected: usize,
        actual: usize,
    },

    /// A batch reached `layer` with the wrong number of columns.
    #[error("layer {layer} expects {expected} input columns, got {actual}")]
    ShapeMismatch {
        layer: usize,
        expected: usize,
        actual: usize,
    },

    #[error("unsupported activation `{0}`")]
    UnsupportedActivation(String),

    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<serde_json::Error> for InferenceError {
    fn from(e: serde_json::Error) -> Self {
        InferenceError::MalformedRecord(e.to_string())
    }
}

pub type InferenceResult<T> = Result<T, InferenceError>;
