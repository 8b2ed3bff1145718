use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Label of the fire class in the default index.
pub const FIRE_LABEL: &str = "incendios";
/// Label of the non-fire class in the default index.
pub const NOT_FIRE_LABEL: &str = "normal";

#[derive(Debug, thiserror::Error)]
pub enum ClassIndexError {
    #[error("Class index must contain at least one class")]
    Empty,
    #[error("Class label cannot be empty")]
    EmptyLabel,
    #[error("Duplicate class label: {0}")]
    DuplicateLabel(String),
    #[error("Position {position} is assigned to more than one class")]
    DuplicatePosition { position: usize },
    #[error("Class positions must cover 0..{expected} exactly, found position {found}")]
    NonDensePositions { expected: usize, found: usize },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Invalid class index file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Maps class names to their position in a model's score vector.
///
/// Positions always form the dense range `0..len()`, so every position of a
/// matching [`ScoreVector`](super::ScoreVector) has exactly one label.
///
/// On disk the index is a JSON object of `label -> position`, the same shape a
/// training pipeline's `class_indices` mapping is dumped in:
///
/// ```json
/// { "incendios": 0, "normal": 1 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "HashMap<String, usize>", into = "HashMap<String, usize>")]
pub struct ClassIndex {
    labels: Vec<String>,
    positions: HashMap<String, usize>,
}

impl ClassIndex {
    /// Builds an index where each label's position is its order in `labels`.
    ///
    /// # Example
    /// ```
    /// use firewatch::ClassIndex;
    ///
    /// let index = ClassIndex::from_labels(["incendios", "normal"]).unwrap();
    /// assert_eq!(index.position("normal"), Some(1));
    /// ```
    pub fn from_labels<I, S>(labels: I) -> Result<Self, ClassIndexError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        if labels.is_empty() {
            return Err(ClassIndexError::Empty);
        }

        let mut positions = HashMap::with_capacity(labels.len());
        for (position, label) in labels.iter().enumerate() {
            if label.is_empty() {
                return Err(ClassIndexError::EmptyLabel);
            }
            if positions.insert(label.clone(), position).is_some() {
                return Err(ClassIndexError::DuplicateLabel(label.clone()));
            }
        }

        Ok(Self { labels, positions })
    }

    /// Builds an index from an explicit `label -> position` mapping.
    pub fn from_map(map: HashMap<String, usize>) -> Result<Self, ClassIndexError> {
        if map.is_empty() {
            return Err(ClassIndexError::Empty);
        }

        let expected = map.len();
        let mut slots: Vec<Option<String>> = vec![None; expected];
        for (label, &position) in &map {
            if label.is_empty() {
                return Err(ClassIndexError::EmptyLabel);
            }
            let slot = slots
                .get_mut(position)
                .ok_or(ClassIndexError::NonDensePositions { expected, found: position })?;
            if slot.is_some() {
                return Err(ClassIndexError::DuplicatePosition { position });
            }
            *slot = Some(label.clone());
        }

        // Every slot is filled: `expected` distinct positions, all below `expected`.
        let labels = slots.into_iter().flatten().collect();
        Ok(Self { labels, positions: map })
    }

    /// Loads an index from a JSON file of `label -> position` pairs.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ClassIndexError> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Position of `label` in the score vector, if the label is known.
    pub fn position(&self, label: &str) -> Option<usize> {
        self.positions.get(label).copied()
    }

    /// Label stored at `position`.
    pub fn label(&self, position: usize) -> Option<&str> {
        self.labels.get(position).map(String::as_str)
    }

    /// Labels in position order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl Default for ClassIndex {
    /// `incendios -> 0`, `normal -> 1`: the alphabetical folder order the
    /// fire model was trained with.
    fn default() -> Self {
        let labels = vec![FIRE_LABEL.to_string(), NOT_FIRE_LABEL.to_string()];
        let positions = labels
            .iter()
            .enumerate()
            .map(|(position, label)| (label.clone(), position))
            .collect();
        Self { labels, positions }
    }
}

impl TryFrom<HashMap<String, usize>> for ClassIndex {
    type Error = ClassIndexError;

    fn try_from(map: HashMap<String, usize>) -> Result<Self, Self::Error> {
        Self::from_map(map)
    }
}

impl From<ClassIndex> for HashMap<String, usize> {
    fn from(index: ClassIndex) -> Self {
        index.positions
    }
}
