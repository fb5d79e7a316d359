pub mod catalog;

pub use catalog::{ModelCatalog, DEFAULT_EXTENSIONS};
