use env_logger::{Builder, Env};
use firewatch::classifier::preprocess::{load_image, preprocess_file};
use firewatch::{
    BatchClassifier, ClassIndex, ClassifierError, ImageClassifier, OnnxImageClassifier, PreprocessConfig,
    ScoreVector, Tally, TensorLayout,
};
use image::{Rgb, RgbImage};
use std::fs;
use std::path::Path;

// Initialize test logger
fn init() {
    let _ = Builder::from_env(Env::default().default_filter_or("warn"))
        .is_test(true)
        .try_init();
}

/// Scores an image by how red it is, going through the real preprocessing.
struct RednessClassifier {
    preprocess: PreprocessConfig,
}

impl ImageClassifier for RednessClassifier {
    fn classify(&self, image: &Path) -> Result<ScoreVector, ClassifierError> {
        let tensor = preprocess_file(image, &self.preprocess)?;
        let mean = |channel: usize| {
            let values = tensor.index_axis(ndarray::Axis(3), channel);
            values.sum() / values.len() as f32
        };
        let red = mean(0);
        let other = (mean(1) + mean(2)) / 2.0;
        Ok(ScoreVector::from(vec![red, other]))
    }
}

fn save_solid(path: &Path, color: [u8; 3]) {
    RgbImage::from_pixel(32, 24, Rgb(color)).save(path).unwrap();
}

#[test]
fn test_end_to_end_with_real_images() -> Result<(), Box<dyn std::error::Error>> {
    init();
    let dir = tempfile::tempdir()?;
    save_solid(&dir.path().join("blaze.png"), [250, 60, 10]);
    save_solid(&dir.path().join("ember.jpg"), [200, 40, 0]);
    save_solid(&dir.path().join("forest.png"), [20, 160, 40]);
    // Misleading extension; the format is sniffed from the contents.
    save_solid(&dir.path().join("lake.bmp"), [10, 60, 220]);
    fs::rename(dir.path().join("lake.bmp"), dir.path().join("lake.png"))?;
    fs::write(dir.path().join("notes.txt"), "not an image")?;

    let classifier = RednessClassifier {
        preprocess: PreprocessConfig { width: 16, height: 16, ..Default::default() },
    };
    let batch = BatchClassifier::with_index(classifier, &ClassIndex::default())?;
    let report = batch.run(dir.path())?;

    assert_eq!(report.tally, Tally { fire: 2, not_fire: 2 });
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].path.ends_with("notes.txt"));
    assert!(matches!(report.failures[0].error, ClassifierError::ImageDecodeError(_)));
    Ok(())
}

#[test]
fn test_preprocess_file_shapes() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("frame.png");
    save_solid(&path, [255, 128, 0]);

    let tensor = preprocess_file(&path, &PreprocessConfig::default())?;
    assert_eq!(tensor.shape(), &[1, 150, 150, 3]);
    assert_eq!(tensor[[0, 10, 20, 1]], 128.0);

    let nchw = PreprocessConfig {
        width: 64,
        height: 32,
        scale: 1.0 / 255.0,
        layout: TensorLayout::Nchw,
    };
    let tensor = preprocess_file(&path, &nchw)?;
    assert_eq!(tensor.shape(), &[1, 3, 32, 64]);
    assert!((tensor[[0, 0, 31, 63]] - 1.0).abs() < 1e-6);
    Ok(())
}

#[test]
fn test_load_image_errors() {
    let dir = tempfile::tempdir().unwrap();
    let garbage = dir.path().join("broken.png");
    fs::write(&garbage, [0u8, 1, 2, 3, 4, 5]).unwrap();

    assert!(matches!(load_image(&garbage), Err(ClassifierError::ImageDecodeError(_))));
    assert!(matches!(
        load_image(&dir.path().join("missing.png")),
        Err(ClassifierError::ImageDecodeError(_))
    ));
}

#[test]
fn test_builder_validation_errors() {
    // Empty model path
    let result = OnnxImageClassifier::builder().with_model("").unwrap_err();
    assert!(matches!(result, ClassifierError::BuildError(_)));

    // Missing model file
    let result = OnnxImageClassifier::builder()
        .with_model("/definitely/not/here/incidentes.onnx")
        .unwrap_err();
    assert!(matches!(result, ClassifierError::BuildError(_)));

    // No model at all
    let result = OnnxImageClassifier::builder()
        .with_class_index(ClassIndex::default())
        .build()
        .unwrap_err();
    assert!(matches!(result, ClassifierError::BuildError(_)));
}

#[test]
fn test_builder_rejects_corrupt_model() {
    init();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.onnx");
    fs::write(&path, "corrupted data").unwrap();

    let result = OnnxImageClassifier::builder().with_model(&path);
    assert!(matches!(result, Err(ClassifierError::ModelError(_))));
}
