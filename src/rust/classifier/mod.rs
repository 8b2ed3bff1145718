mod error;
pub mod builder;
pub mod capability;
pub mod class_index;
mod onnx;
pub mod preprocess;
mod score;

pub use error::ClassifierError;
pub use builder::OnnxImageClassifierBuilder;
pub use capability::ImageClassifier;
pub use class_index::{ClassIndex, ClassIndexError, FIRE_LABEL, NOT_FIRE_LABEL};
pub use onnx::OnnxImageClassifier;
pub use preprocess::{PreprocessConfig, TensorLayout};
pub use score::ScoreVector;

/// Information about the current state and configuration of a classifier
#[derive(Debug, Clone)]
pub struct ClassifierInfo {
    /// Path to the ONNX model file
    pub model_path: String,
    /// Number of classes the model scores
    pub num_classes: usize,
    /// Labels of the classes, in score order
    pub class_labels: Vec<String>,
    /// Shape of the tensor fed to the model for one image
    pub input_shape: [usize; 4],
}
