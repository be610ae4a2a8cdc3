/// Priority model trainer
///
/// Synthesizes a labelled cohort, trains the voting ensemble on 80% of it,
/// reports held-out error and writes the artifact the service loads at startup.
///
/// Run: cargo run --release --bin train-model [output-path] [n-samples]

use onco_triage::core::dataset::{
    mean_absolute_error, r2_score, synthesize, to_training_set, train_test_split,
};
use onco_triage::core::{EnsembleConfig, FeatureEncoder, PriorityModel, UnknownCategoryPolicy};
use std::path::PathBuf;
use tracing::info;

const DEFAULT_OUTPUT: &str = "models/priority_model.json";
const DEFAULT_SAMPLES: usize = 1000;
const SEED: u64 = 42;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt().with_target(false).init();

    let mut args = std::env::args().skip(1);
    let output = args
        .next()
        .or_else(|| std::env::var("PRIORITY_MODEL_PATH").ok())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));
    let n_samples = match args.next() {
        Some(raw) => raw.parse()?,
        None => DEFAULT_SAMPLES,
    };

    info!("Generating {} synthetic patients", n_samples);
    let cohort = synthesize(n_samples, SEED);
    let (train, test) = train_test_split(&cohort, 0.2, SEED);

    let encoder = FeatureEncoder::new(UnknownCategoryPolicy::Reject);
    let (x_train, y_train) = to_training_set(&encoder, &train);
    let (x_test, y_test) = to_training_set(&encoder, &test);

    info!("Training ensemble on {} samples ({} held out)", x_train.len(), x_test.len());
    let mut model = PriorityModel::new(EnsembleConfig::default());
    model.train(&x_train, &y_train)?;

    let predicted = model.predict_batch(&x_test)?;
    info!(
        "Held-out metrics: MAE {:.2}, R2 {:.2}",
        mean_absolute_error(&y_test, &predicted),
        r2_score(&y_test, &predicted)
    );

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    model.save(&output)?;
    info!("Model saved to {}", output.display());

    Ok(())
}
