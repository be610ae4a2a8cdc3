use crate::core::features::{FeatureEncoder, FeatureVector};
use crate::models::{CancerType, ClinicalSnapshot, Stage};
use rand::distributions::WeightedIndex;
use rand::prelude::*;
use rand::rngs::StdRng;

/// Sampling weights for [`CancerType::ALL`]
const CANCER_WEIGHTS: [f64; 7] = [0.25, 0.20, 0.20, 0.15, 0.08, 0.08, 0.04];
const STAGE_WEIGHTS: [f64; 4] = [0.2, 0.3, 0.3, 0.2];
const PERFORMANCE_WEIGHTS: [f64; 5] = [0.3, 0.3, 0.2, 0.15, 0.05];
const PAIN_WEIGHTS: [f64; 11] = [0.2, 0.15, 0.1, 0.1, 0.1, 0.1, 0.1, 0.05, 0.05, 0.03, 0.02];
const STAGES: [Stage; 4] = [Stage::I, Stage::II, Stage::III, Stage::IV];

/// A synthetic patient and its reference priority label
#[derive(Debug, Clone)]
pub struct LabelledSnapshot {
    pub snapshot: ClinicalSnapshot,
    pub priority: f64,
}

/// Reference label used for training data.
///
/// Extends the fallback rules with secondary high-priority criteria, so a
/// trained model is not a plain copy of the fallback.
pub fn reference_priority(s: &ClinicalSnapshot) -> f64 {
    let mut score = 0.0;

    if s.pain_score >= 8 {
        score += 30.0;
    }
    if s.stage == Stage::IV {
        score += 20.0;
    }
    if s.performance_status >= 3 {
        score += 25.0;
    }
    if s.days_since_last_visit > 60 {
        score += 15.0;
    }

    if s.pain_score >= 6 {
        score += 15.0;
    }
    if s.nausea_score >= 7 {
        score += 10.0;
    }
    if s.stage == Stage::III {
        score += 10.0;
    }

    f64::min(score, 100.0)
}

// Box-Muller; rand 0.8 ships no normal distribution without rand_distr
fn sample_normal(rng: &mut StdRng, mean: f64, std_dev: f64) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen();
    mean + std_dev * (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

fn sample_exponential(rng: &mut StdRng, mean: f64) -> f64 {
    let u: f64 = rng.gen();
    -mean * (1.0 - u).ln()
}

/// Generate a reproducible synthetic cohort
pub fn synthesize(n_samples: usize, seed: u64) -> Vec<LabelledSnapshot> {
    let mut rng = StdRng::seed_from_u64(seed);

    let cancer = WeightedIndex::new(CANCER_WEIGHTS).expect("Invalid cancer type weights");
    let stage = WeightedIndex::new(STAGE_WEIGHTS).expect("Invalid stage weights");
    let performance = WeightedIndex::new(PERFORMANCE_WEIGHTS).expect("Invalid performance weights");
    let pain = WeightedIndex::new(PAIN_WEIGHTS).expect("Invalid pain weights");

    (0..n_samples)
        .map(|_| {
            let snapshot = ClinicalSnapshot {
                cancer_type: CancerType::ALL[cancer.sample(&mut rng)],
                stage: STAGES[stage.sample(&mut rng)],
                performance_status: performance.sample(&mut rng) as u8,
                age: sample_normal(&mut rng, 60.0, 15.0).clamp(18.0, 100.0) as u16,
                pain_score: pain.sample(&mut rng) as u8,
                nausea_score: rng.gen_range(0..=10),
                fatigue_score: rng.gen_range(0..=10),
                days_since_last_visit: sample_exponential(&mut rng, 30.0) as u32,
                treatment_cycle: rng.gen_range(1..=8),
            };
            let priority = reference_priority(&snapshot);
            LabelledSnapshot { snapshot, priority }
        })
        .collect()
}

/// Encode a labelled cohort into feature rows and targets
pub fn to_training_set(
    encoder: &FeatureEncoder,
    rows: &[LabelledSnapshot],
) -> (Vec<FeatureVector>, Vec<f64>) {
    rows.iter()
        .map(|row| (encoder.encode(&row.snapshot), row.priority))
        .unzip()
}

/// Shuffle and split into (train, test) with `test_fraction` held out
pub fn train_test_split<T: Clone>(rows: &[T], test_fraction: f64, seed: u64) -> (Vec<T>, Vec<T>) {
    let mut shuffled = rows.to_vec();
    shuffled.shuffle(&mut StdRng::seed_from_u64(seed));

    let n_test = ((rows.len() as f64) * test_fraction.clamp(0.0, 1.0)).round() as usize;
    let train = shuffled.split_off(n_test);
    (train, shuffled)
}

pub fn mean_absolute_error(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).abs())
        .sum::<f64>()
        / actual.len() as f64
}

/// Coefficient of determination; 0 when the targets have no variance
pub fn r2_score(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    let mean = actual.iter().sum::<f64>() / actual.len() as f64;
    let ss_tot: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();
    let ss_res: f64 = actual.iter().zip(predicted).map(|(a, p)| (a - p).powi(2)).sum();

    if ss_tot == 0.0 {
        0.0
    } else {
        1.0 - ss_res / ss_tot
    }
}
