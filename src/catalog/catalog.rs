use std::collections::{BTreeMap, BTreeSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::config::InferenceConfig;
use crate::error::{InferenceError, InferenceResult};
use crate::network::descriptor::ModelDescriptor;

/// Extensions searched when none are configured. The model saver writes JSON
/// into `.h5` files, so both are accepted.
pub const DEFAULT_EXTENSIONS: [&str; 2] = ["json", "h5"];

/// A directory of saved models, one record file per model name.
///
/// Names are either discovered by listing the directory or fixed up front
/// with [`ModelCatalog::with_names`].
#[derive(Debug, Clone)]
pub struct ModelCatalog {
    base_dir: PathBuf,
    extensions: Vec<String>,
    names: Option<BTreeSet<String>>,
}

impl ModelCatalog {
    /// Catalog whose models are discovered by scanning `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        ModelCatalog {
            base_dir: base_dir.into(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            names: None,
        }
    }

    /// Catalog restricted to a caller-supplied set of names.
    pub fn with_names<I, S>(base_dir: impl Into<PathBuf>, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ModelCatalog {
            names: Some(names.into_iter().map(Into::into).collect()),
            ..ModelCatalog::new(base_dir)
        }
    }

    /// Replaces the searched extensions, in priority order. The first one is
    /// also used by [`ModelCatalog::save`].
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|e| {
                let e: String = e.into();
                e.trim_start_matches('.').to_ascii_lowercase()
            })
            .collect();
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Names of every available model. Each listed name can be passed to
    /// [`ModelCatalog::load`].
    pub fn list_models(&self) -> InferenceResult<BTreeSet<String>> {
        if let Some(names) = &self.names {
            return Ok(names.clone());
        }
        let found: BTreeSet<String> = self.scan()?.into_keys().collect();
        debug!("found {} models in {}", found.len(), self.base_dir.display());
        Ok(found)
    }

    /// Loads and validates the model called `name`.
    pub fn load(&self, name: &str, config: &InferenceConfig) -> InferenceResult<ModelDescriptor> {
        let path = self.resolve(name)?;
        info!("loading model `{name}` from {}", path.display());
        ModelDescriptor::load_json(&path, config.precision).map_err(|e| match e {
            InferenceError::NotFound { .. } => self.not_found(name),
            other => other,
        })
    }

    /// Writes `descriptor` as `<name>.<first extension>` and returns the path.
    pub fn save(&self, name: &str, descriptor: &ModelDescriptor) -> InferenceResult<PathBuf> {
        if !is_valid_name(name) {
            return Err(self.not_found(name));
        }
        let extension = self.extensions.first().map_or("json", String::as_str);
        let path = self.base_dir.join(format!("{name}.{extension}"));
        descriptor.save_json(&path)?;
        info!("saved model `{name}` to {}", path.display());
        Ok(path)
    }

    /// Loads every listed model and orders them by metadata score, best
    /// first. Ties are broken by name. Any model that fails to load fails
    /// the whole ranking.
    pub fn rank_models(&self, config: &InferenceConfig) -> InferenceResult<Vec<(String, f64)>> {
        let mut ranked = self
            .list_models()?
            .into_iter()
            .map(|name| -> InferenceResult<(String, f64)> {
                let score = self.load(&name, config)?.metadata().score();
                Ok((name, score))
            })
            .collect::<InferenceResult<Vec<_>>>()?;
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Ok(ranked)
    }

    fn resolve(&self, name: &str) -> InferenceResult<PathBuf> {
        if !is_valid_name(name) {
            return Err(self.not_found(name));
        }
        if let Some(names) = &self.names {
            if !names.contains(name) {
                return Err(self.not_found(name));
            }
        }
        let mut found = self.scan().map_err(|e| match e {
            InferenceError::Io { source, .. } if source.kind() == ErrorKind::NotFound => {
                self.not_found(name)
            }
            other => other,
        })?;
        found.remove(name).ok_or_else(|| self.not_found(name))
    }

    /// Maps every loadable model name in `base_dir` to its record file.
    /// Extensions match case-insensitively; when a name exists under several
    /// extensions the earliest configured one wins.
    fn scan(&self) -> InferenceResult<BTreeMap<String, PathBuf>> {
        let entries = std::fs::read_dir(&self.base_dir)
            .map_err(|source| self.io_error(&self.base_dir, source))?;
        let mut found: BTreeMap<String, (usize, PathBuf)> = BTreeMap::new();
        for entry in entries {
            let path = entry.map_err(|source| self.io_error(&self.base_dir, source))?.path();
            if !path.is_file() {
                continue;
            }
            let Some(rank) = self.extension_rank(&path) else {
                continue;
            };
            let stem = match path.file_stem().and_then(|s| s.to_str()) {
                Some(stem) if is_valid_name(stem) => stem.to_string(),
                Some(_) => {
                    warn!("skipping model file with unusable name {}", path.display());
                    continue;
                }
                None => {
                    warn!("skipping non UTF-8 model file {}", path.display());
                    continue;
                }
            };
            match found.get(&stem) {
                Some((best, _)) if *best <= rank => {}
                _ => {
                    found.insert(stem, (rank, path));
                }
            }
        }
        Ok(found.into_iter().map(|(name, (_, path))| (name, path)).collect())
    }

    /// Position of `path`'s extension in the configured list, if any.
    fn extension_rank(&self, path: &Path) -> Option<usize> {
        let ext = path.extension()?.to_str()?;
        self.extensions.iter().position(|k| k.eq_ignore_ascii_case(ext))
    }

    fn not_found(&self, name: &str) -> InferenceError {
        InferenceError::NotFound { name: name.to_string(), dir: self.base_dir.clone() }
    }

    fn io_error(&self, path: &Path, source: std::io::Error) -> InferenceError {
        InferenceError::Io { path: path.to_path_buf(), source }
    }
}

/// Rejects empty names and anything that could escape the base directory.
fn is_valid_name(name: &str) -> bool {
    !(name.is_empty() || name.contains('/') || name.contains('\\') || name.contains(".."))
}
