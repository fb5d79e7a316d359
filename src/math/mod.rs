pub mod matrix;
pub mod precision;

pub use matrix::Matrix;
pub use precision::Precision;
