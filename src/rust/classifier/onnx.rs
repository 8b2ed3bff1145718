use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use log::debug;
use ort::session::Session;
use ort::value::Tensor;

use super::builder::OnnxImageClassifierBuilder;
use super::capability::ImageClassifier;
use super::class_index::ClassIndex;
use super::error::ClassifierError;
use super::preprocess::{preprocess_file, PreprocessConfig};
use super::score::ScoreVector;
use super::ClassifierInfo;

/// An [`ImageClassifier`] backed by an ONNX Runtime session.
///
/// The model is expected to take one image batch (see [`PreprocessConfig`]
/// for the layout) and produce one row of class scores per image, with one
/// column per entry of the configured [`ClassIndex`].
///
/// The session and class index live behind `Arc`s, so the classifier is
/// `Send + Sync` and can be shared across batch workers:
///
/// ```no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use firewatch::{ImageClassifier, OnnxImageClassifier};
/// use std::path::Path;
///
/// let classifier = OnnxImageClassifier::builder()
///     .with_model("incidentes.onnx")?
///     .build()?;
///
/// let scores = classifier.classify(Path::new("forest.png"))?;
/// println!("{:?}", scores);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct OnnxImageClassifier {
    pub(crate) model_path: String,
    pub(crate) session: Arc<Session>,
    pub(crate) input_name: String,
    pub(crate) class_index: Arc<ClassIndex>,
    pub(crate) preprocess: PreprocessConfig,
}

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<OnnxImageClassifier>();
    }
};

impl OnnxImageClassifier {
    /// Creates a new builder for fluent construction
    pub fn builder() -> OnnxImageClassifierBuilder {
        OnnxImageClassifierBuilder::new()
    }

    /// Returns information about the classifier's current state
    pub fn info(&self) -> ClassifierInfo {
        ClassifierInfo {
            model_path: self.model_path.clone(),
            num_classes: self.class_index.len(),
            class_labels: self.class_index.labels().to_vec(),
            input_shape: self.preprocess.input_shape(),
        }
    }

    pub fn class_index(&self) -> &ClassIndex {
        &self.class_index
    }

    /// Scores one image and names the winning class.
    ///
    /// # Returns
    /// A tuple containing:
    /// * The label with the highest score (ties go to the lower position)
    /// * Every label paired with its score, in class-index order
    pub fn predict(&self, image: &Path) -> Result<(String, Vec<(String, f32)>), ClassifierError> {
        let scores = self.classify(image)?;
        let best = scores
            .argmax()
            .and_then(|position| self.class_index.label(position))
            .ok_or_else(|| ClassifierError::PredictionError("Model returned no usable scores".into()))?
            .to_string();
        Ok((best, scores.labelled(&self.class_index)))
    }

    /// Runs the session on an already preprocessed batch of one.
    fn run(&self, input: ndarray::Array4<f32>) -> Result<ScoreVector, ClassifierError> {
        let tensor = Tensor::from_array(input)
            .map_err(|e| ClassifierError::ModelError(format!("Failed to create input tensor: {}", e)))?;

        let mut input_tensors = HashMap::new();
        input_tensors.insert(self.input_name.as_str(), tensor);

        let outputs = self.session.run(input_tensors)
            .map_err(|e| ClassifierError::ModelError(format!("Failed to run model: {}", e)))?;
        let output_tensor = outputs[0].try_extract_tensor::<f32>()
            .map_err(|e| ClassifierError::PredictionError(format!("Failed to extract output tensor: {}", e)))?;

        // Either [classes] or [1, classes]; anything else is flattened and length-checked below.
        let scores: Vec<f32> = output_tensor.iter().copied().collect();
        if scores.len() != self.class_index.len() {
            return Err(ClassifierError::PredictionError(format!(
                "Model returned {} scores for {} classes (output shape {:?})",
                scores.len(),
                self.class_index.len(),
                output_tensor.shape()
            )));
        }

        Ok(ScoreVector::from(scores))
    }
}

impl ImageClassifier for OnnxImageClassifier {
    fn classify(&self, image: &Path) -> Result<ScoreVector, ClassifierError> {
        let input = preprocess_file(image, &self.preprocess)?;
        let scores = self.run(input)?;
        debug!("Scored {}: {:?}", image.display(), scores.as_array());
        Ok(scores)
    }
}
