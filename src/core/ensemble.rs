use crate::core::features::FeatureVector;
use crate::core::tree::{RegressionTree, TreeParams};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Artifact layout version written by [`PriorityModel::save`]
pub const ARTIFACT_VERSION: u32 = 1;

/// Errors that can occur when training, querying or persisting the ensemble
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Model has not been trained")]
    NotTrained,

    #[error("Model artifact not found: {}", .0.display())]
    ArtifactNotFound(PathBuf),

    #[error("Invalid training data: {0}")]
    InvalidTrainingData(String),

    #[error("Unsupported artifact version {0}")]
    UnsupportedArtifact(u32),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForestConfig {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 10,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoostingConfig {
    pub n_rounds: usize,
    pub learning_rate: f64,
    pub tree: TreeParams,
}

impl BoostingConfig {
    /// Level-wise trees with an L2 leaf penalty (XGBoost defaults)
    pub fn depth_wise() -> Self {
        Self {
            n_rounds: 100,
            learning_rate: 0.3,
            tree: TreeParams {
                max_depth: 6,
                min_samples_split: 2,
                min_samples_leaf: 1,
                l2_regularization: 1.0,
                max_leaves: None,
            },
        }
    }

    /// Best-first trees capped by leaf count (LightGBM defaults)
    pub fn leaf_wise() -> Self {
        Self {
            n_rounds: 100,
            learning_rate: 0.1,
            tree: TreeParams {
                max_depth: 6,
                min_samples_split: 2,
                min_samples_leaf: 20,
                l2_regularization: 0.0,
                max_leaves: Some(31),
            },
        }
    }
}

/// Hyperparameters for the three base learners and their voting weights
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnsembleConfig {
    pub forest: ForestConfig,
    pub depth_wise: BoostingConfig,
    pub leaf_wise: BoostingConfig,
    /// Weights for forest, depth-wise booster and leaf-wise booster
    pub weights: [f64; 3],
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            forest: ForestConfig::default(),
            depth_wise: BoostingConfig::depth_wise(),
            leaf_wise: BoostingConfig::leaf_wise(),
            weights: [0.3, 0.4, 0.3],
        }
    }
}

/// Bagged regression trees averaged with equal weight
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<RegressionTree>,
}

impl RandomForest {
    pub fn fit(x: &[FeatureVector], y: &[f64], config: &ForestConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let params = TreeParams {
            max_depth: config.max_depth,
            ..TreeParams::default()
        };
        let n = x.len();

        let trees = (0..config.n_estimators.max(1))
            .map(|_| {
                let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                RegressionTree::fit(x, y, &sample, &params)
            })
            .collect();

        Self { trees }
    }

    pub fn predict(&self, features: &FeatureVector) -> f64 {
        let sum: f64 = self.trees.iter().map(|t| t.predict(features)).sum();
        sum / self.trees.len() as f64
    }
}

/// Additive squared-error boosting starting from the target mean
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoosting {
    base_score: f64,
    learning_rate: f64,
    trees: Vec<RegressionTree>,
}

impl GradientBoosting {
    pub fn fit(x: &[FeatureVector], y: &[f64], config: &BoostingConfig) -> Self {
        let base_score = y.iter().sum::<f64>() / y.len() as f64;
        let indices: Vec<usize> = (0..x.len()).collect();
        let mut predictions = vec![base_score; y.len()];
        let mut trees = Vec::with_capacity(config.n_rounds);

        for _ in 0..config.n_rounds {
            let residuals: Vec<f64> = y.iter().zip(&predictions).map(|(t, p)| t - p).collect();
            let tree = RegressionTree::fit(x, &residuals, &indices, &config.tree);

            for (pred, features) in predictions.iter_mut().zip(x) {
                *pred += config.learning_rate * tree.predict(features);
            }
            trees.push(tree);
        }

        Self {
            base_score,
            learning_rate: config.learning_rate,
            trees,
        }
    }

    pub fn predict(&self, features: &FeatureVector) -> f64 {
        self.base_score
            + self.learning_rate * self.trees.iter().map(|t| t.predict(features)).sum::<f64>()
    }
}

/// Weighted voting regressor over the three fitted learners
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VotingEnsemble {
    forest: RandomForest,
    depth_wise: GradientBoosting,
    leaf_wise: GradientBoosting,
    weights: [f64; 3],
}

impl VotingEnsemble {
    pub fn fit(x: &[FeatureVector], y: &[f64], config: &EnsembleConfig) -> Self {
        Self {
            forest: RandomForest::fit(x, y, &config.forest),
            depth_wise: GradientBoosting::fit(x, y, &config.depth_wise),
            leaf_wise: GradientBoosting::fit(x, y, &config.leaf_wise),
            weights: config.weights,
        }
    }

    /// Weighted average of the learners, not yet clamped
    pub fn predict_raw(&self, features: &FeatureVector) -> f64 {
        let outputs = [
            self.forest.predict(features),
            self.depth_wise.predict(features),
            self.leaf_wise.predict(features),
        ];
        let total_weight: f64 = self.weights.iter().sum();
        let weighted: f64 = outputs.iter().zip(&self.weights).map(|(o, w)| o * w).sum();
        weighted / total_weight
    }
}

#[derive(Deserialize)]
struct Artifact {
    version: u32,
    config: EnsembleConfig,
    ensemble: VotingEnsemble,
}

/// Trained-or-untrained priority regressor.
///
/// Mutated only by [`train`](Self::train) and [`load`](Self::load); once
/// trained it is shared read-only behind an `Arc` and needs no locking.
#[derive(Debug, Clone, Default)]
pub struct PriorityModel {
    config: EnsembleConfig,
    ensemble: Option<VotingEnsemble>,
}

impl PriorityModel {
    pub fn new(config: EnsembleConfig) -> Self {
        Self {
            config,
            ensemble: None,
        }
    }

    pub fn is_trained(&self) -> bool {
        self.ensemble.is_some()
    }

    pub fn config(&self) -> &EnsembleConfig {
        &self.config
    }

    /// Fit all three learners, replacing any previous ensemble
    pub fn train(&mut self, x: &[FeatureVector], y: &[f64]) -> Result<(), ModelError> {
        if x.is_empty() {
            return Err(ModelError::InvalidTrainingData("no training rows".into()));
        }
        if x.len() != y.len() {
            return Err(ModelError::InvalidTrainingData(format!(
                "{} feature rows but {} targets",
                x.len(),
                y.len()
            )));
        }
        if y.iter().any(|t| !t.is_finite()) {
            return Err(ModelError::InvalidTrainingData("non-finite target".into()));
        }
        if self.config.weights.iter().sum::<f64>() <= 0.0 {
            return Err(ModelError::InvalidTrainingData(
                "voting weights must sum to a positive value".into(),
            ));
        }

        tracing::info!(rows = x.len(), "Training priority ensemble");
        self.ensemble = Some(VotingEnsemble::fit(x, y, &self.config));
        Ok(())
    }

    /// Predict a priority score clamped to [0, 100]
    pub fn predict(&self, features: &FeatureVector) -> Result<f64, ModelError> {
        let ensemble = self.ensemble.as_ref().ok_or(ModelError::NotTrained)?;
        Ok(ensemble.predict_raw(features).clamp(0.0, 100.0))
    }

    pub fn predict_batch(&self, rows: &[FeatureVector]) -> Result<Vec<f64>, ModelError> {
        rows.iter().map(|row| self.predict(row)).collect()
    }

    /// Write the trained ensemble as a JSON artifact
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ModelError> {
        let ensemble = self.ensemble.as_ref().ok_or(ModelError::NotTrained)?;
        let artifact = ArtifactRef {
            version: ARTIFACT_VERSION,
            config: &self.config,
            ensemble,
        };

        let writer = BufWriter::new(File::create(path.as_ref())?);
        serde_json::to_writer(writer, &artifact)?;
        tracing::info!(path = %path.as_ref().display(), "Saved priority model artifact");
        Ok(())
    }

    /// Replace the current state with a persisted ensemble
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ModelError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ModelError::ArtifactNotFound(path.to_path_buf()));
        }

        let reader = BufReader::new(File::open(path)?);
        let artifact: Artifact = serde_json::from_reader(reader)?;
        if artifact.version != ARTIFACT_VERSION {
            return Err(ModelError::UnsupportedArtifact(artifact.version));
        }

        self.config = artifact.config;
        self.ensemble = Some(artifact.ensemble);
        tracing::info!(path = %path.display(), "Loaded priority model artifact");
        Ok(())
    }
}

#[derive(Serialize)]
struct ArtifactRef<'a> {
    version: u32,
    config: &'a EnsembleConfig,
    ensemble: &'a VotingEnsemble,
}
