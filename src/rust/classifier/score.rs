use ndarray::Array1;

use super::class_index::ClassIndex;

/// Per-class confidences produced by a classifier for a single image.
///
/// Positions follow the [`ClassIndex`] the classifier was configured with.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreVector(Array1<f32>);

impl ScoreVector {
    pub fn new(scores: Array1<f32>) -> Self {
        Self(scores)
    }

    /// Score at `position`, or `None` if the vector is shorter.
    pub fn get(&self, position: usize) -> Option<f32> {
        self.0.get(position).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = f32> + '_ {
        self.0.iter().copied()
    }

    pub fn as_array(&self) -> &Array1<f32> {
        &self.0
    }

    /// Position of the highest score. Ties resolve to the lower position and
    /// NaN scores never win.
    pub fn argmax(&self) -> Option<usize> {
        let mut best: Option<(usize, f32)> = None;
        for (position, score) in self.iter().enumerate() {
            if score.is_nan() {
                continue;
            }
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((position, score));
            }
        }
        best.map(|(position, _)| position)
    }

    /// Pairs each score with its label, in position order.
    pub fn labelled(&self, index: &ClassIndex) -> Vec<(String, f32)> {
        index
            .labels()
            .iter()
            .zip(self.iter())
            .map(|(label, score)| (label.clone(), score))
            .collect()
    }
}

impl From<Vec<f32>> for ScoreVector {
    fn from(scores: Vec<f32>) -> Self {
        Self(Array1::from_vec(scores))
    }
}
