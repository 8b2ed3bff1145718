use criterion::{black_box, criterion_group, criterion_main, Criterion};
use firewatch::{BatchClassifier, ClassIndex, ClassifierError, ImageClassifier, ScoreVector};
use std::path::{Path, PathBuf};

/// Derives scores from the path so every file gets a stable, cheap answer.
struct HashScores;

impl ImageClassifier for HashScores {
    fn classify(&self, image: &Path) -> Result<ScoreVector, ClassifierError> {
        let seed = image.as_os_str().len() as f32;
        Ok(ScoreVector::from(vec![(seed * 0.37).fract(), (seed * 0.61).fract()]))
    }
}

fn paths(n: usize) -> Vec<PathBuf> {
    (0..n).map(|i| PathBuf::from(format!("/data/frames/{:06}.png", i * 7))).collect()
}

fn bench_decision(c: &mut Criterion) {
    let batch = BatchClassifier::with_index(HashScores, &ClassIndex::default()).unwrap();
    let files = paths(1_000);

    let mut group = c.benchmark_group("Batch");
    group.sample_size(50);
    group.warm_up_time(std::time::Duration::from_secs(1));

    group.bench_function("sequential_1000", |b| b.iter(|| {
        batch.classify_files(black_box(&files))
    }));

    for workers in [2, 4] {
        group.bench_function(format!("parallel_1000_x{}", workers), |b| b.iter(|| {
            batch.classify_files_parallel(black_box(&files), workers)
        }));
    }

    group.finish();
}

criterion_group!(benches, bench_decision);
criterion_main!(benches);
