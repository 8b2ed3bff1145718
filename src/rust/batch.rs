//! Directory-wide fire / not-fire counting.
//!
//! A [`BatchClassifier`] lists the regular files directly inside a directory,
//! scores each one with an [`ImageClassifier`], applies a [`DecisionRule`] to
//! the scores and accumulates the outcome in a [`Tally`].
//!
//! Files that cannot be classified (undecodable images, model failures) are
//! skipped: they are logged, collected in [`BatchReport::failures`] and
//! excluded from both counts. A bad file never aborts the batch.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use log::{debug, info, warn};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;

use crate::classifier::{ClassIndex, ClassifierError, ImageClassifier, ScoreVector, FIRE_LABEL, NOT_FIRE_LABEL};

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("Directory not found: {0}")]
    DirectoryNotFound(PathBuf),
    #[error("Cannot list directory {path}: {source}")]
    NotReadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Class '{0}' is not in the class index")]
    UnknownClass(String),
    #[error("Fire and not-fire classes must differ, both are '{0}'")]
    SameClass(String),
}

/// Outcome of the binary decision for one image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Fire,
    NotFire,
}

/// Compares the fire score against the not-fire score.
///
/// Both labels are resolved against a [`ClassIndex`] once, up front, so a
/// misconfigured label fails before any file is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecisionRule {
    fire: usize,
    not_fire: usize,
    num_classes: usize,
}

impl DecisionRule {
    pub fn new(index: &ClassIndex, fire_label: &str, not_fire_label: &str) -> Result<Self, BatchError> {
        if fire_label == not_fire_label {
            return Err(BatchError::SameClass(fire_label.to_string()));
        }
        let fire = index
            .position(fire_label)
            .ok_or_else(|| BatchError::UnknownClass(fire_label.to_string()))?;
        let not_fire = index
            .position(not_fire_label)
            .ok_or_else(|| BatchError::UnknownClass(not_fire_label.to_string()))?;

        Ok(Self { fire, not_fire, num_classes: index.len() })
    }

    /// Rule over the standard `incendios` / `normal` labels.
    pub fn from_index(index: &ClassIndex) -> Result<Self, BatchError> {
        Self::new(index, FIRE_LABEL, NOT_FIRE_LABEL)
    }

    /// Fire only when the fire score is strictly greater. Ties and NaN scores
    /// count as not fire.
    pub fn decide(&self, scores: &ScoreVector) -> Result<Category, ClassifierError> {
        if scores.len() != self.num_classes {
            return Err(ClassifierError::PredictionError(format!(
                "Expected {} scores, got {}",
                self.num_classes,
                scores.len()
            )));
        }

        // Both positions are below num_classes, checked above.
        let fire = scores.get(self.fire).unwrap_or(f32::NAN);
        let not_fire = scores.get(self.not_fire).unwrap_or(f32::NAN);

        Ok(if fire > not_fire { Category::Fire } else { Category::NotFire })
    }
}

/// Running per-category counts for one batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    pub fire: usize,
    pub not_fire: usize,
}

impl Tally {
    pub fn record(&mut self, category: Category) {
        match category {
            Category::Fire => self.fire += 1,
            Category::NotFire => self.not_fire += 1,
        }
    }

    pub fn merge(&mut self, other: Tally) {
        self.fire += other.fire;
        self.not_fire += other.not_fire;
    }

    /// Number of successfully classified files.
    pub fn total(&self) -> usize {
        self.fire + self.not_fire
    }
}

/// A file that was skipped, with the reason.
#[derive(Debug)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: ClassifierError,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub tally: Tally,
    pub failures: Vec<FileFailure>,
}

impl BatchReport {
    pub fn merge(&mut self, other: BatchReport) {
        self.tally.merge(other.tally);
        self.failures.extend(other.failures);
    }

    /// Files looked at, classified or not.
    pub fn processed(&self) -> usize {
        self.tally.total() + self.failures.len()
    }
}

/// Lists the regular files directly inside `directory`, as absolute paths in
/// sorted order. Subdirectories are neither returned nor descended into;
/// symlinks count when they point at a regular file; dangling ones are
/// ignored.
pub fn list_files(directory: impl AsRef<Path>) -> Result<Vec<PathBuf>, BatchError> {
    let directory = directory.as_ref();
    let not_readable = |source| BatchError::NotReadable { path: directory.to_path_buf(), source };
    match fs::metadata(directory) {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(BatchError::DirectoryNotFound(directory.to_path_buf()));
        }
        Err(e) => return Err(not_readable(e)),
    }

    let root = fs::canonicalize(directory).map_err(not_readable)?;
    let mut files = Vec::new();
    for entry in fs::read_dir(&root).map_err(not_readable)? {
        let path = entry.map_err(not_readable)?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Counts fire and non-fire images with a borrowed or owned classifier.
pub struct BatchClassifier<C> {
    classifier: C,
    rule: DecisionRule,
}

impl<C: ImageClassifier> BatchClassifier<C> {
    pub fn new(classifier: C, rule: DecisionRule) -> Self {
        Self { classifier, rule }
    }

    /// Uses the `incendios` / `normal` labels of `index`.
    pub fn with_index(classifier: C, index: &ClassIndex) -> Result<Self, BatchError> {
        Ok(Self::new(classifier, DecisionRule::from_index(index)?))
    }

    pub fn rule(&self) -> &DecisionRule {
        &self.rule
    }

    /// Classifies a single file.
    pub fn classify_one(&self, path: &Path) -> Result<Category, ClassifierError> {
        let scores = self.classifier.classify(path)?;
        self.rule.decide(&scores)
    }

    /// Classifies every path in `files`, one at a time.
    pub fn classify_files<P: AsRef<Path>>(&self, files: &[P]) -> BatchReport {
        let mut report = BatchReport::default();
        for path in files {
            self.classify_into(&mut report, path.as_ref());
        }
        report
    }

    fn classify_into(&self, report: &mut BatchReport, path: &Path) {
        match self.classify_one(path) {
            Ok(category) => {
                debug!("{} -> {:?}", path.display(), category);
                report.tally.record(category);
            }
            Err(error) => {
                warn!("Skipping {}: {}", path.display(), error);
                report.failures.push(FileFailure { path: path.to_path_buf(), error });
            }
        }
    }

    /// Classifies every regular file directly inside `directory`.
    pub fn run(&self, directory: impl AsRef<Path>) -> Result<BatchReport, BatchError> {
        let files = list_files(&directory)?;
        info!("Classifying {} files in {}", files.len(), directory.as_ref().display());

        let report = self.classify_files(&files);
        log_summary(&report);
        Ok(report)
    }
}

impl<C: ImageClassifier + Sync> BatchClassifier<C> {
    /// Like [`run`](Self::run), but spreads the files over `workers` threads.
    ///
    /// Each worker keeps its own tally and the results are merged once every
    /// worker has finished, so the counts match a sequential run exactly.
    pub fn run_parallel(&self, directory: impl AsRef<Path>, workers: usize) -> Result<BatchReport, BatchError> {
        if workers <= 1 {
            return self.run(directory);
        }

        let files = list_files(&directory)?;
        info!(
            "Classifying {} files in {} with {} workers",
            files.len(),
            directory.as_ref().display(),
            workers
        );

        Ok(self.classify_listed(&files, workers))
    }

    /// Classifies files already returned by [`list_files`], with `workers`
    /// threads (`0` or `1` runs on the calling thread).
    pub fn classify_listed<P: AsRef<Path> + Sync>(&self, files: &[P], workers: usize) -> BatchReport {
        let report = if workers <= 1 {
            self.classify_files(files)
        } else {
            self.classify_files_parallel(files, workers)
        };
        log_summary(&report);
        report
    }

    /// Parallel counterpart of [`classify_files`](Self::classify_files).
    ///
    /// Files are classified on a dedicated pool of `workers` threads. Every
    /// rayon job folds into its own report and the reports are merged at the
    /// end, so the counts match a sequential run exactly.
    pub fn classify_files_parallel<P: AsRef<Path> + Sync>(&self, files: &[P], workers: usize) -> BatchReport {
        let pool = match ThreadPoolBuilder::new().num_threads(workers.max(1)).build() {
            Ok(pool) => pool,
            Err(e) => {
                warn!("Failed to start {} workers, classifying sequentially: {}", workers, e);
                return self.classify_files(files);
            }
        };

        let mut report = pool.install(|| {
            files
                .par_iter()
                .fold(BatchReport::default, |mut report, path| {
                    self.classify_into(&mut report, path.as_ref());
                    report
                })
                .reduce(BatchReport::default, |mut left, right| {
                    left.merge(right);
                    left
                })
        });
        report.failures.sort_by(|a, b| a.path.cmp(&b.path));
        report
    }
}

fn log_summary(report: &BatchReport) {
    info!(
        "Batch complete: {} fire, {} not fire, {} skipped",
        report.tally.fire,
        report.tally.not_fire,
        report.failures.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(values: &[f32]) -> ScoreVector {
        ScoreVector::from(values.to_vec())
    }

    fn rule() -> DecisionRule {
        DecisionRule::from_index(&ClassIndex::default()).unwrap()
    }

    #[test]
    fn test_strictly_greater_is_fire() {
        assert_eq!(rule().decide(&scores(&[0.51, 0.49])).unwrap(), Category::Fire);
        assert_eq!(rule().decide(&scores(&[0.49, 0.51])).unwrap(), Category::NotFire);
    }

    #[test]
    fn test_tie_and_nan_are_not_fire() {
        assert_eq!(rule().decide(&scores(&[0.5, 0.5])).unwrap(), Category::NotFire);
        assert_eq!(rule().decide(&scores(&[f32::NAN, 0.1])).unwrap(), Category::NotFire);
    }

    #[test]
    fn test_wrong_length_is_prediction_error() {
        let result = rule().decide(&scores(&[0.9]));
        assert!(matches!(result, Err(ClassifierError::PredictionError(_))));
    }

    #[test]
    fn test_rule_respects_index_positions() {
        let index = ClassIndex::from_labels(["smoke", "normal", "incendios"]).unwrap();
        let rule = DecisionRule::from_index(&index).unwrap();
        assert_eq!(rule.decide(&scores(&[0.0, 0.2, 0.3])).unwrap(), Category::Fire);
        assert_eq!(rule.decide(&scores(&[0.9, 0.4, 0.3])).unwrap(), Category::NotFire);
    }

    #[test]
    fn test_rule_rejects_bad_labels() {
        let index = ClassIndex::default();
        assert!(matches!(
            DecisionRule::new(&index, "fuego", NOT_FIRE_LABEL),
            Err(BatchError::UnknownClass(label)) if label == "fuego"
        ));
        assert!(matches!(
            DecisionRule::new(&index, FIRE_LABEL, FIRE_LABEL),
            Err(BatchError::SameClass(_))
        ));
    }

    struct ByFirstChar;

    impl ImageClassifier for ByFirstChar {
        fn classify(&self, image: &Path) -> Result<ScoreVector, ClassifierError> {
            match image.to_string_lossy().chars().next() {
                Some('f') => Ok(scores(&[0.7, 0.3])),
                Some('x') => Err(ClassifierError::ImageDecodeError("unreadable".into())),
                _ => Ok(scores(&[0.2, 0.8])),
            }
        }
    }

    #[test]
    fn test_parallel_pool_matches_sequential() {
        let batch = BatchClassifier::with_index(ByFirstChar, &ClassIndex::default()).unwrap();
        let files = ["x2", "f1", "n1", "f2", "x1", "n2", "f3"];
        let sequential = batch.classify_files(&files[..]);

        for workers in [2, 3, 16] {
            let parallel = batch.classify_files_parallel(&files[..], workers);
            assert_eq!(parallel.tally, sequential.tally);
            let paths: Vec<_> = parallel.failures.iter().map(|f| f.path.clone()).collect();
            assert_eq!(paths, vec![PathBuf::from("x1"), PathBuf::from("x2")]);
        }
        assert_eq!(sequential.tally, Tally { fire: 3, not_fire: 2 });

        let empty: Vec<&str> = Vec::new();
        assert_eq!(batch.classify_listed(&empty[..], 4).processed(), 0);
    }

    #[test]
    fn test_tally_merge() {
        let mut a = Tally { fire: 2, not_fire: 1 };
        a.merge(Tally { fire: 1, not_fire: 4 });
        a.record(Category::Fire);
        assert_eq!(a, Tally { fire: 4, not_fire: 5 });
        assert_eq!(a.total(), 9);
    }
}
