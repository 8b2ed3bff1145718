//! Defaults and environment overrides shared by the library and the CLI.

use std::env;
use std::path::{Path, PathBuf};

use crate::classifier::{ClassIndex, ClassIndexError};

/// Overrides the model file used when none is given explicitly.
pub const MODEL_ENV: &str = "FIREWATCH_MODEL";
/// Overrides the model cache root.
pub const CACHE_ENV: &str = "FIREWATCH_CACHE";
/// Model file looked up in the working directory by default.
pub const DEFAULT_MODEL_FILE: &str = "incidentes.onnx";
/// Name models downloaded from a URL are stored under.
pub const DEFAULT_MODEL_NAME: &str = "incidentes";

/// Picks the model file: an explicit path wins, then `FIREWATCH_MODEL`,
/// then `incidentes.onnx` in the working directory.
pub fn resolve_model_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    match env::var(MODEL_ENV) {
        Ok(path) if !path.is_empty() => PathBuf::from(path),
        _ => PathBuf::from(DEFAULT_MODEL_FILE),
    }
}

/// Loads a class index from `path`, or returns the default
/// `incendios -> 0, normal -> 1` index.
pub fn load_class_index(path: Option<&Path>) -> Result<ClassIndex, ClassIndexError> {
    match path {
        Some(path) => {
            let index = ClassIndex::from_json_file(path)?;
            log::info!("Loaded {} classes from {}: {:?}", index.len(), path.display(), index.labels());
            Ok(index)
        }
        None => Ok(ClassIndex::default()),
    }
}
