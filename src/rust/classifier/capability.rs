use std::path::Path;
use std::sync::Arc;

use super::error::ClassifierError;
use super::score::ScoreVector;

/// Anything that can score a single image file.
///
/// The batch pipeline only ever talks to a classifier through this trait, so
/// the decision logic can be exercised with stub implementations and the ONNX
/// backend can be swapped for another runtime.
///
/// Implementations are expected to be deterministic for a fixed model and
/// input, and to return one score per class of the index they were built with.
pub trait ImageClassifier {
    fn classify(&self, image: &Path) -> Result<ScoreVector, ClassifierError>;
}

impl<T: ImageClassifier + ?Sized> ImageClassifier for &T {
    fn classify(&self, image: &Path) -> Result<ScoreVector, ClassifierError> {
        (**self).classify(image)
    }
}

impl<T: ImageClassifier + ?Sized> ImageClassifier for Box<T> {
    fn classify(&self, image: &Path) -> Result<ScoreVector, ClassifierError> {
        (**self).classify(image)
    }
}

impl<T: ImageClassifier + ?Sized> ImageClassifier for Arc<T> {
    fn classify(&self, image: &Path) -> Result<ScoreVector, ClassifierError> {
        (**self).classify(image)
    }
}
