use std::path::Path;
use std::sync::Arc;

use log::{error, info};
use ort::session::Session;

use super::class_index::ClassIndex;
use super::error::ClassifierError;
use super::onnx::OnnxImageClassifier;
use super::preprocess::PreprocessConfig;
use crate::runtime::{create_session_builder, RuntimeConfig};

/// A builder for constructing an [`OnnxImageClassifier`] with a fluent interface.
#[derive(Default, Debug)]
pub struct OnnxImageClassifierBuilder {
    model_path: Option<String>,
    session: Option<Session>,
    class_index: Option<ClassIndex>,
    preprocess: PreprocessConfig,
    runtime_config: RuntimeConfig,
}

impl OnnxImageClassifierBuilder {
    /// Creates a new empty builder with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the runtime configuration for ONNX model execution.
    ///
    /// Must be called before [`with_model`](Self::with_model), which creates the session.
    pub fn with_runtime_config(mut self, config: RuntimeConfig) -> Self {
        self.runtime_config = config;
        self
    }

    /// Sets the class index describing the model's output columns.
    /// Defaults to `[incendios, normal]`.
    pub fn with_class_index(mut self, class_index: ClassIndex) -> Self {
        self.class_index = Some(class_index);
        self
    }

    /// Sets how image files are turned into input tensors.
    pub fn with_preprocess(mut self, preprocess: PreprocessConfig) -> Self {
        self.preprocess = preprocess;
        self
    }

    /// Loads the ONNX model at `model_path`.
    ///
    /// # Returns
    /// * `Result<Self, ClassifierError>` - The builder instance if successful, or an error if:
    ///   - The path is empty
    ///   - A model is already set
    ///   - The file doesn't exist
    ///   - The model failed to load
    ///   - The model structure is invalid
    ///
    /// # Example
    /// ```no_run
    /// use firewatch::OnnxImageClassifierBuilder;
    ///
    /// let builder = OnnxImageClassifierBuilder::new()
    ///     .with_model("incidentes.onnx");
    /// ```
    pub fn with_model(mut self, model_path: impl AsRef<Path>) -> Result<Self, ClassifierError> {
        let model_path = model_path.as_ref();
        if model_path.as_os_str().is_empty() {
            return Err(ClassifierError::BuildError("Model path cannot be empty".to_string()));
        }
        if self.model_path.is_some() {
            return Err(ClassifierError::BuildError("Model path already set".to_string()));
        }
        if !model_path.exists() {
            return Err(ClassifierError::BuildError(format!(
                "Model file not found: {}",
                model_path.display()
            )));
        }

        // Create session using the singleton environment
        let session = create_session_builder(&self.runtime_config)?
            .commit_from_file(model_path)
            .map_err(|e| {
                error!("Failed to load model {}: {}", model_path.display(), e);
                ClassifierError::ModelError(format!("Failed to load model: {}", e))
            })?;

        Self::validate_model(&session)?;
        info!("Model structure validated successfully");

        self.model_path = Some(model_path.to_string_lossy().to_string());
        self.session = Some(session);
        Ok(self)
    }

    /// Builds and returns the final classifier
    ///
    /// # Returns
    /// * `Result<OnnxImageClassifier, ClassifierError>` - The constructed classifier if successful, or an error if:
    ///   - No model has been loaded
    ///   - The preprocessing configuration is invalid
    pub fn build(mut self) -> Result<OnnxImageClassifier, ClassifierError> {
        self.preprocess.validate()?;

        let model_path = self.model_path.take()
            .ok_or_else(|| ClassifierError::BuildError("Model path must be set".to_string()))?;
        let session = self.session.take()
            .ok_or_else(|| ClassifierError::BuildError("No ONNX model loaded".into()))?;

        let input_name = session.inputs
            .first()
            .map(|input| input.name.clone())
            .ok_or_else(|| ClassifierError::ModelError("Model has no inputs".into()))?;

        let class_index = self.class_index.take().unwrap_or_default();
        info!(
            "Classifier ready: {} classes {:?}, input '{}' {:?}",
            class_index.len(),
            class_index.labels(),
            input_name,
            self.preprocess.input_shape()
        );

        Ok(OnnxImageClassifier {
            model_path,
            session: Arc::new(session),
            input_name,
            class_index: Arc::new(class_index),
            preprocess: self.preprocess,
        })
    }

    /// Validates that the model has the expected input/output structure
    ///
    /// # Returns
    /// * `Result<(), ClassifierError>` - Ok if validation passes, or an error if:
    ///   - The model doesn't have an image input tensor
    ///   - The model doesn't have any output tensors
    fn validate_model(session: &Session) -> Result<(), ClassifierError> {
        if session.inputs.is_empty() {
            return Err(ClassifierError::ModelError(
                "Model must have at least 1 input for the image batch".to_string()
            ));
        }

        if session.outputs.is_empty() {
            return Err(ClassifierError::ModelError(
                "Model must have at least 1 output for class scores".to_string()
            ));
        }

        Ok(())
    }
}
