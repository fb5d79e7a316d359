// Demo front-end: lists the models in a directory, then runs one of them on
// random inputs. All inference logic lives in the library.
//   cargo run -- --dir trained_models --samples 3
use std::f64::consts::PI;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use ferrite_infer::{
    predict_classes, ActivationMode, InferenceConfig, InferenceEngine, Matrix, ModelCatalog,
    ModelDescriptor, Precision,
};
use log::warn;
use rand::prelude::*;

#[derive(Parser, Debug)]
#[command(name = "ferrite-infer", about = "Run saved dense networks without a training framework")]
struct Args {
    /// Directory holding one record file per model
    #[arg(short, long, env = "FERRITE_MODELS_DIR", default_value = "trained_models")]
    dir: PathBuf,

    /// Model to run (defaults to the best-scoring one)
    #[arg(short, long)]
    model: Option<String>,

    /// JSON file with an inference config; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Parameter precision: f32 or f64
    #[arg(short, long)]
    precision: Option<Precision>,

    /// Apply ReLU on every layer like older loaders did
    #[arg(long)]
    legacy_relu: bool,

    /// Number of random samples to run
    #[arg(short, long, default_value_t = 1)]
    samples: usize,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    if args.samples == 0 {
        bail!("--samples must be at least 1");
    }

    let mut config = match &args.config {
        Some(path) => InferenceConfig::load_json(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => InferenceConfig::default(),
    };
    if let Some(precision) = args.precision {
        config.precision = precision;
    }
    if args.legacy_relu {
        config.activation_mode = ActivationMode::LegacyRelu;
    }

    let catalog = ModelCatalog::new(&args.dir);
    let names = catalog
        .list_models()
        .with_context(|| format!("listing models in {}", args.dir.display()))?;
    if names.is_empty() {
        bail!("no models found in {}", args.dir.display());
    }

    println!("Available models:");
    let mut loaded: Vec<(String, ModelDescriptor)> = Vec::new();
    for name in names {
        match catalog.load(&name, &config) {
            Ok(descriptor) => {
                let meta = descriptor.metadata();
                println!("  {name}: accuracy={:.3}, loss={:.3}", meta.accuracy, meta.loss);
                loaded.push((name, descriptor));
            }
            Err(e) => {
                warn!("skipping `{name}`: {e}");
                println!("  {name}: unavailable ({e})");
            }
        }
    }

    let (name, descriptor) = match &args.model {
        Some(wanted) => {
            let descriptor = catalog.load(wanted, &config)?;
            (wanted.clone(), descriptor)
        }
        None => loaded
            .into_iter()
            .max_by(|a, b| a.1.metadata().score().total_cmp(&b.1.metadata().score()))
            .context("no model could be loaded")?,
    };

    println!(
        "\nUsing model: {name} ({} inputs -> {} outputs)",
        descriptor.input_dim(),
        descriptor.output_dim()
    );
    let mut rng = rand::thread_rng();
    let rows = (0..args.samples)
        .map(|_| (0..descriptor.input_dim()).map(|_| sample_standard_normal(&mut rng)).collect())
        .collect();
    let batch = Matrix::from_rows(rows).context("building sample batch")?;

    let output = InferenceEngine::new(config).forward(&descriptor, &batch)?;
    let classes = predict_classes(&output);
    for ((input, prediction), class) in batch.data.iter().zip(&output.data).zip(classes) {
        println!("Input: {input:.4?} -> Output: {prediction:.4?} (class {class})");
    }
    Ok(())
}

/// Box-Muller sample from N(0, 1).
fn sample_standard_normal(rng: &mut ThreadRng) -> f64 {
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = 1.0 - rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}
