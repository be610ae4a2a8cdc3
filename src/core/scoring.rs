use crate::core::ensemble::{ModelError, PriorityModel};
use crate::core::features::{FeatureEncoder, ValidationError};
use crate::core::rules::{reason_text, rule_based_score};
use crate::models::{ClinicalSnapshot, PrioritizeRequest, PriorityScore};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),
}

/// Which estimator produced a score
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreSource {
    Ensemble,
    Rules,
}

/// Result of scoring one snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct PriorityAssessment {
    pub score: PriorityScore,
    pub reason: String,
    pub source: ScoreSource,
}

/// Scoring orchestrator: encode, pick the ensemble or the rule fallback, categorize
///
/// # Pipeline
/// 1. Resolve the raw request into a [`ClinicalSnapshot`]
/// 2. Encode the snapshot into a feature vector
/// 3. Predict with the trained ensemble, or fall back to rules when untrained
/// 4. Clamp and categorize
#[derive(Debug, Clone)]
pub struct PriorityScorer {
    encoder: FeatureEncoder,
    model: Arc<PriorityModel>,
}

impl PriorityScorer {
    pub fn new(encoder: FeatureEncoder, model: Arc<PriorityModel>) -> Self {
        Self { encoder, model }
    }

    /// Scorer with an untrained model, i.e. rules only
    pub fn rules_only(encoder: FeatureEncoder) -> Self {
        Self::new(encoder, Arc::new(PriorityModel::default()))
    }

    pub fn model_trained(&self) -> bool {
        self.model.is_trained()
    }

    pub fn encoder(&self) -> &FeatureEncoder {
        &self.encoder
    }

    pub fn assess_request(&self, req: &PrioritizeRequest) -> Result<PriorityAssessment, ScoringError> {
        let snapshot = self.encoder.snapshot_from_request(req)?;
        self.assess(&snapshot)
    }

    pub fn assess(&self, snapshot: &ClinicalSnapshot) -> Result<PriorityAssessment, ScoringError> {
        let (raw, source) = if self.model.is_trained() {
            let features = self.encoder.encode(snapshot);
            match self.model.predict(&features) {
                Ok(score) => (score, ScoreSource::Ensemble),
                Err(ModelError::NotTrained) => {
                    tracing::warn!("Ensemble reported untrained at inference, using rules");
                    (rule_based_score(snapshot), ScoreSource::Rules)
                }
                Err(e) => return Err(e.into()),
            }
        } else {
            (rule_based_score(snapshot), ScoreSource::Rules)
        };

        Ok(PriorityAssessment {
            score: PriorityScore::new(raw),
            reason: reason_text(snapshot),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CancerType, PriorityCategory, Stage};

    fn snapshot() -> ClinicalSnapshot {
        ClinicalSnapshot {
            cancer_type: CancerType::Breast,
            stage: Stage::IV,
            performance_status: 4,
            age: 67,
            pain_score: 9,
            nausea_score: 2,
            fatigue_score: 5,
            days_since_last_visit: 70,
            treatment_cycle: 0,
        }
    }

    #[test]
    fn test_untrained_uses_rules() {
        let scorer = PriorityScorer::rules_only(FeatureEncoder::default());
        let result = scorer.assess(&snapshot()).unwrap();

        assert_eq!(result.source, ScoreSource::Rules);
        assert_eq!(result.score.value, 90.0);
        assert_eq!(result.score.category, PriorityCategory::Critical);
        assert!(!scorer.model_trained());
    }

    #[test]
    fn test_validation_error_propagates() {
        let scorer = PriorityScorer::rules_only(FeatureEncoder::default());
        let req = PrioritizeRequest {
            cancer_type: "unknown".to_string(),
            stage: "II".to_string(),
            performance_status: 1,
            age: 40,
            pain_score: None,
            nausea_score: None,
            fatigue_score: None,
            days_since_last_visit: 3,
            treatment_cycle: None,
        };

        assert!(matches!(
            scorer.assess_request(&req),
            Err(ScoringError::Validation(_))
        ));
    }
}
