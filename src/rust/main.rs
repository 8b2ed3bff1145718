use anyhow::{Context, Result};
use clap::Parser;
use firewatch::config::{self, DEFAULT_MODEL_NAME};
use firewatch::{
    list_files, BatchClassifier, ModelSource, ModelStore, OnnxImageClassifier, PreprocessConfig, RuntimeConfig,
};
use log::info;
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory of images to count, or a single image to score
    path: PathBuf,

    /// ONNX model file (defaults to $FIREWATCH_MODEL, then ./incidentes.onnx)
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// JSON file mapping class names to score positions
    #[arg(short, long)]
    classes: Option<PathBuf>,

    /// Edge length, in pixels, images are resized to
    #[arg(long, default_value_t = 150)]
    size: u32,

    /// Multiplier applied to pixel values before inference
    #[arg(long, default_value_t = 1.0)]
    scale: f32,

    /// Number of threads classifying files in parallel
    #[arg(short, long, default_value_t = 1)]
    workers: usize,

    /// ONNX Runtime threads per inference (0 lets the runtime decide)
    #[arg(long, default_value_t = 0)]
    threads: usize,

    /// Download the model from this URL into the local cache
    #[arg(long, requires = "sha256")]
    model_url: Option<String>,

    /// Expected SHA-256 of the downloaded model
    #[arg(long, requires = "model_url")]
    sha256: Option<String>,

    /// Force a fresh download of the model file
    #[arg(short, long)]
    fresh: bool,
}

async fn resolve_model(args: &Args) -> Result<PathBuf> {
    let (Some(url), Some(sha256)) = (&args.model_url, &args.sha256) else {
        return Ok(config::resolve_model_path(args.model.as_deref()));
    };

    let store = ModelStore::new_default().context("Failed to create model cache")?;
    let source = ModelSource::new(DEFAULT_MODEL_NAME, url.as_str(), sha256.as_str());

    if args.fresh {
        info!("Fresh download requested - removing any existing model file...");
        store.remove(&source.name)?;
    }

    Ok(store.ensure_installed(&source).await?)
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    // Directory problems are reported before any model work starts.
    let files = if args.path.is_file() {
        None
    } else {
        Some(list_files(&args.path)?)
    };

    let model_path = resolve_model(&args).await?;
    let class_index = config::load_class_index(args.classes.as_deref())
        .context("Failed to load class index")?;

    let start_time = Instant::now();
    info!("Loading model from {}", model_path.display());

    let classifier = OnnxImageClassifier::builder()
        .with_runtime_config(RuntimeConfig::default().with_intra_threads(args.threads))
        .with_preprocess(PreprocessConfig {
            width: args.size,
            height: args.size,
            scale: args.scale,
            ..Default::default()
        })
        .with_class_index(class_index)
        .with_model(&model_path)
        .with_context(|| format!("Failed to load model {}", model_path.display()))?
        .build()?;

    info!("Model loaded (took {:.2?})", start_time.elapsed());

    let Some(files) = files else {
        return predict_single(&classifier, &args.path);
    };

    info!("Classifying {} files in {}", files.len(), args.path.display());
    let batch = BatchClassifier::with_index(&classifier, classifier.class_index())?;
    let report = batch.classify_listed(&files, args.workers);

    println!("Fire: {}", report.tally.fire);
    println!("Not fire: {}", report.tally.not_fire);

    if !report.failures.is_empty() {
        eprintln!("Skipped {} file(s) that could not be classified:", report.failures.len());
        for failure in &report.failures {
            eprintln!("  {}: {}", failure.path.display(), failure.error);
        }
    }

    info!("Classified {} files in {:.2?}", report.processed(), start_time.elapsed());
    Ok(())
}

fn predict_single(classifier: &OnnxImageClassifier, image: &Path) -> Result<()> {
    let (label, scores) = classifier
        .predict(image)
        .with_context(|| format!("Failed to classify {}", image.display()))?;

    println!("Predicted class: {}", label);
    println!("Scores:");
    for (label, score) in scores {
        println!("  {}: {:.4}", label, score);
    }
    Ok(())
}
