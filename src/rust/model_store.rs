use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use crate::config::CACHE_ENV;

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Model not installed: {0}")]
    NotInstalled(String),
    #[error("Download error: {0}")]
    DownloadError(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Model verification failed")]
    VerificationFailed,
    #[error("Hash mismatch for {name}: expected {expected}, got {actual}")]
    HashMismatch {
        name: String,
        expected: String,
        actual: String,
    },
}

/// Where to fetch a model from and the SHA-256 it must hash to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSource {
    pub name: String,
    pub url: String,
    pub sha256: String,
}

impl ModelSource {
    pub fn new(name: impl Into<String>, url: impl Into<String>, sha256: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            sha256: sha256.into().to_lowercase(),
        }
    }
}

/// Keeps downloaded ONNX models in a cache directory, one folder per model.
#[derive(Clone)]
pub struct ModelStore {
    models_dir: PathBuf,
    download_lock: Arc<Mutex<()>>,
}

impl ModelStore {
    /// Creates a new ModelStore in the default models directory
    pub fn new_default() -> io::Result<Self> {
        Self::new(Self::default_models_dir())
    }

    /// Returns the default models directory path
    pub fn default_models_dir() -> PathBuf {
        // 1. Check environment variable
        if let Ok(path) = env::var(CACHE_ENV) {
            return PathBuf::from(path).join("models");
        }

        // 2. Use platform-specific cache directory
        if let Some(cache_dir) = dirs::cache_dir() {
            return cache_dir.join("firewatch").join("models");
        }

        // 3. Fallback to user's home directory
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir.join(".cache").join("firewatch").join("models");
        }

        env::temp_dir().join("firewatch").join("models")
    }

    pub fn new<P: AsRef<Path>>(models_dir: P) -> io::Result<Self> {
        let models_dir = models_dir.as_ref().to_path_buf();
        fs::create_dir_all(&models_dir)?;
        Ok(Self {
            models_dir,
            download_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    pub fn model_path(&self, name: &str) -> PathBuf {
        self.models_dir.join(name).join("model.onnx")
    }

    pub fn is_installed(&self, name: &str) -> bool {
        let path = self.model_path(name);
        log::debug!("Model path: {:?} (exists: {})", path, path.exists());
        path.exists()
    }

    /// Path of an installed model, or `NotInstalled`.
    pub fn installed_path(&self, name: &str) -> Result<PathBuf, ModelError> {
        if self.is_installed(name) {
            Ok(self.model_path(name))
        } else {
            Err(ModelError::NotInstalled(name.to_string()))
        }
    }

    fn hash_bytes(bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        format!("{:x}", hasher.finalize())
    }

    fn verify_file(&self, path: &Path, expected_hash: &str) -> Result<bool, ModelError> {
        let bytes = fs::read(path)?;
        let hash = Self::hash_bytes(&bytes);
        log::debug!("Verifying {:?}: {} bytes, hash {}, expected {}", path, bytes.len(), hash, expected_hash);
        Ok(hash == expected_hash)
    }

    /// Whether the installed copy of `source` exists and matches its hash.
    pub fn verify(&self, source: &ModelSource) -> Result<bool, ModelError> {
        let path = self.model_path(&source.name);
        if !path.exists() {
            log::info!("Model {} is not installed", source.name);
            return Ok(false);
        }
        let ok = self.verify_file(&path, &source.sha256)?;
        log::info!("Model {} hash verification: {}", source.name, ok);
        Ok(ok)
    }

    /// Downloads `source` into the store, checking its hash before and after
    /// writing. Concurrent installs through clones of one store are serialized.
    pub async fn install(&self, source: &ModelSource) -> Result<PathBuf, ModelError> {
        let _lock = self.download_lock.lock().await;
        let path = self.model_path(&source.name);

        if path.exists() && self.verify_file(&path, &source.sha256)? {
            log::info!("Existing model file verified successfully");
            return Ok(path);
        }

        match self.download_and_verify(source, &path).await {
            Ok(()) => {
                log::info!("Model {} ready at {:?}", source.name, path);
                Ok(path)
            }
            Err(e) => {
                log::error!("Failed to install model {}: {}", source.name, e);
                let _ = self.remove(&source.name);
                Err(e)
            }
        }
    }

    async fn download_and_verify(&self, source: &ModelSource, path: &Path) -> Result<(), ModelError> {
        log::info!("Downloading model {} from {} to {:?}", source.name, source.url, path);
        let response = reqwest::get(&source.url).await?.error_for_status()?;
        let bytes = response.bytes().await?;
        log::info!("Downloaded {} bytes", bytes.len());

        let hash = Self::hash_bytes(&bytes);
        if hash != source.sha256 {
            return Err(ModelError::HashMismatch {
                name: source.name.clone(),
                expected: source.sha256.clone(),
                actual: hash,
            });
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, &bytes)?;

        if !self.verify_file(path, &source.sha256)? {
            return Err(ModelError::VerificationFailed);
        }
        Ok(())
    }

    /// Installs `source` unless a verified copy is already present. A copy
    /// that fails verification is removed and downloaded again.
    pub async fn ensure_installed(&self, source: &ModelSource) -> Result<PathBuf, ModelError> {
        if self.is_installed(&source.name) && !self.verify(source)? {
            log::warn!("Model {} failed verification, re-downloading", source.name);
            self.remove(&source.name)?;
        }
        self.install(source).await
    }

    pub fn remove(&self, name: &str) -> Result<(), ModelError> {
        let path = self.model_path(name);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_model(contents: &[u8]) -> (tempfile::TempDir, ModelStore, ModelSource) {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::new(dir.path().join("models")).unwrap();
        let source = ModelSource::new("fire", "http://127.0.0.1:9/fire.onnx", ModelStore::hash_bytes(contents));
        let path = store.model_path("fire");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
        (dir, store, source)
    }

    #[test]
    fn test_verify_detects_corruption() {
        let (_dir, store, source) = store_with_model(b"onnx bytes");
        assert!(store.verify(&source).unwrap());

        fs::write(store.model_path("fire"), "corrupted data").unwrap();
        assert!(!store.verify(&source).unwrap());
    }

    #[test]
    fn test_install_keeps_verified_copy() {
        let (_dir, store, source) = store_with_model(b"onnx bytes");
        // The URL is unreachable; a verified local copy must short-circuit the download.
        let path = tokio_test::block_on(store.install(&source)).unwrap();
        assert_eq!(path, store.model_path("fire"));
    }

    #[test]
    fn test_remove() {
        let (_dir, store, _source) = store_with_model(b"onnx bytes");
        assert!(store.is_installed("fire"));
        store.remove("fire").unwrap();
        assert!(!store.is_installed("fire"));
        assert!(matches!(store.installed_path("fire"), Err(ModelError::NotInstalled(_))));
    }

    #[test]
    fn test_default_models_dir() {
        env::set_var(CACHE_ENV, "/tmp/test-firewatch-cache");
        let path = ModelStore::default_models_dir();
        assert_eq!(path, PathBuf::from("/tmp/test-firewatch-cache/models"));
        env::remove_var(CACHE_ENV);

        let path = ModelStore::default_models_dir();
        assert!(path.to_str().unwrap().contains("firewatch"));
    }
}
