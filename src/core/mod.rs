// Core algorithm exports
pub mod dataset;
pub mod ensemble;
pub mod extraction;
pub mod features;
pub mod rules;
pub mod scoring;
pub mod symptoms;
pub mod tree;

pub use ensemble::{EnsembleConfig, ModelError, PriorityModel};
pub use extraction::{extract_pain_score, extract_structured_data};
pub use features::{FeatureEncoder, FeatureVector, UnknownCategoryPolicy, ValidationError, FEATURE_NAMES};
pub use rules::{reason_text, rule_based_score};
pub use scoring::{PriorityAssessment, PriorityScorer, ScoreSource, ScoringError};
pub use symptoms::detect_critical_symptoms;
pub use dataset::{synthesize, LabelledSnapshot};
