//! Counts how many images in a directory show fire, using an image classifier
//! that scores each file against a fixed set of classes.
//!
//! # Basic Usage
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use firewatch::{BatchClassifier, ClassIndex, OnnxImageClassifier};
//!
//! let classifier = OnnxImageClassifier::builder()
//!     .with_model("incidentes.onnx")?
//!     .with_class_index(ClassIndex::default())
//!     .build()?;
//!
//! let batch = BatchClassifier::with_index(&classifier, classifier.class_index())?;
//! let report = batch.run("./photos")?;
//! println!("Fire: {}", report.tally.fire);
//! println!("Not fire: {}", report.tally.not_fire);
//! # Ok(())
//! # }
//! ```
//!
//! # Custom classifiers
//!
//! Any type implementing [`ImageClassifier`] can drive a batch, which is how
//! the decision logic is tested without a model:
//!
//! ```
//! use firewatch::{BatchClassifier, ClassIndex, ClassifierError, ImageClassifier, ScoreVector};
//! use std::path::Path;
//!
//! struct AlwaysFire;
//!
//! impl ImageClassifier for AlwaysFire {
//!     fn classify(&self, _image: &Path) -> Result<ScoreVector, ClassifierError> {
//!         Ok(ScoreVector::from(vec![0.9, 0.1]))
//!     }
//! }
//!
//! let batch = BatchClassifier::with_index(AlwaysFire, &ClassIndex::default()).unwrap();
//! let report = batch.classify_files(&["a.png", "b.png"]);
//! assert_eq!(report.tally.fire, 2);
//! ```

pub mod batch;
pub mod classifier;
pub mod config;
pub mod model_store;
mod runtime;

pub use batch::{list_files, BatchClassifier, BatchError, BatchReport, Category, DecisionRule, FileFailure, Tally};
pub use classifier::{
    ClassIndex, ClassIndexError, ClassifierError, ClassifierInfo, ImageClassifier, OnnxImageClassifier,
    OnnxImageClassifierBuilder, PreprocessConfig, ScoreVector, TensorLayout, FIRE_LABEL, NOT_FIRE_LABEL,
};
pub use model_store::{ModelError, ModelSource, ModelStore};
pub use runtime::{create_session_builder, RuntimeConfig};

pub fn init_logger() {
    env_logger::init();
}
