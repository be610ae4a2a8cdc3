use crate::models::{CancerType, ClinicalSnapshot, PrioritizeRequest, Stage};
use serde::Deserialize;
use thiserror::Error;

/// Number of features produced by the encoder
pub const FEATURE_COUNT: usize = 9;

/// Column order of [`FeatureVector`]
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "cancer_type_encoded",
    "stage_encoded",
    "performance_status",
    "age",
    "pain_score",
    "nausea_score",
    "fatigue_score",
    "days_since_last_visit",
    "treatment_cycle",
];

/// Errors raised while turning raw input into a scoring snapshot
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Unrecognized {field}: {value:?}")]
    UnknownCategory { field: &'static str, value: String },

    #[error("Invalid {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// What the encoder does with a categorical value outside the lookup table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownCategoryPolicy {
    /// Fail with a validation error
    #[default]
    Reject,
    /// Map to index 0 and log a warning
    Fallback,
}

/// Fixed-order numeric features for one snapshot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector(pub [f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

/// Maps raw clinical input to snapshots and snapshots to feature vectors
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureEncoder {
    policy: UnknownCategoryPolicy,
}

impl FeatureEncoder {
    pub fn new(policy: UnknownCategoryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> UnknownCategoryPolicy {
        self.policy
    }

    /// Build a snapshot from a validated request, resolving categorical fields
    pub fn snapshot_from_request(
        &self,
        req: &PrioritizeRequest,
    ) -> Result<ClinicalSnapshot, ValidationError> {
        let cancer_type = self.resolve(
            "cancer_type",
            &req.cancer_type,
            CancerType::parse,
            CancerType::Breast,
        )?;
        let stage = self.resolve("stage", &req.stage, Stage::parse, Stage::I)?;

        if req.performance_status > 4 {
            return Err(ValidationError::InvalidValue {
                field: "performance_status",
                reason: format!("{} is outside 0-4", req.performance_status),
            });
        }

        let scale = |field: &'static str, value: Option<u8>| -> Result<u8, ValidationError> {
            match value.unwrap_or(0) {
                v if v <= 10 => Ok(v),
                v => Err(ValidationError::InvalidValue {
                    field,
                    reason: format!("{} is outside 0-10", v),
                }),
            }
        };

        Ok(ClinicalSnapshot {
            cancer_type,
            stage,
            performance_status: req.performance_status,
            age: req.age,
            pain_score: scale("pain_score", req.pain_score)?,
            nausea_score: scale("nausea_score", req.nausea_score)?,
            fatigue_score: scale("fatigue_score", req.fatigue_score)?,
            days_since_last_visit: req.days_since_last_visit,
            treatment_cycle: req.treatment_cycle.unwrap_or(0),
        })
    }

    fn resolve<T>(
        &self,
        field: &'static str,
        raw: &str,
        parse: fn(&str) -> Option<T>,
        fallback: T,
    ) -> Result<T, ValidationError> {
        match (parse(raw), self.policy) {
            (Some(value), _) => Ok(value),
            (None, UnknownCategoryPolicy::Reject) => Err(ValidationError::UnknownCategory {
                field,
                value: raw.to_string(),
            }),
            (None, UnknownCategoryPolicy::Fallback) => {
                tracing::warn!(field, value = raw, "Unrecognized category, encoding as index 0");
                Ok(fallback)
            }
        }
    }

    /// Encode a snapshot in [`FEATURE_NAMES`] order
    pub fn encode(&self, snapshot: &ClinicalSnapshot) -> FeatureVector {
        FeatureVector([
            snapshot.cancer_type.index() as f64,
            snapshot.stage.index() as f64,
            snapshot.performance_status as f64,
            snapshot.age as f64,
            snapshot.pain_score as f64,
            snapshot.nausea_score as f64,
            snapshot.fatigue_score as f64,
            snapshot.days_since_last_visit as f64,
            snapshot.treatment_cycle as f64,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(cancer_type: &str, stage: &str) -> PrioritizeRequest {
        PrioritizeRequest {
            cancer_type: cancer_type.to_string(),
            stage: stage.to_string(),
            performance_status: 2,
            age: 61,
            pain_score: Some(7),
            nausea_score: None,
            fatigue_score: Some(4),
            days_since_last_visit: 12,
            treatment_cycle: Some(3),
        }
    }

    #[test]
    fn test_encode_field_order() {
        let encoder = FeatureEncoder::default();
        let snapshot = encoder.snapshot_from_request(&request("kidney", "III")).unwrap();
        let features = encoder.encode(&snapshot);

        assert_eq!(
            features.0,
            [4.0, 2.0, 2.0, 61.0, 7.0, 0.0, 4.0, 12.0, 3.0]
        );
        assert_eq!(features.as_slice().len(), FEATURE_NAMES.len());
    }

    #[test]
    fn test_reject_unknown_cancer_type() {
        let encoder = FeatureEncoder::new(UnknownCategoryPolicy::Reject);
        let err = encoder.snapshot_from_request(&request("melanoma", "II")).unwrap_err();

        assert_eq!(
            err,
            ValidationError::UnknownCategory {
                field: "cancer_type",
                value: "melanoma".to_string(),
            }
        );
    }

    #[test]
    fn test_fallback_unknown_stage() {
        let encoder = FeatureEncoder::new(UnknownCategoryPolicy::Fallback);
        let snapshot = encoder.snapshot_from_request(&request("melanoma", "IIIb")).unwrap();
        let features = encoder.encode(&snapshot);

        assert_eq!(features.0[0], 0.0);
        assert_eq!(features.0[1], 0.0);
    }

    #[test]
    fn test_out_of_range_scale_rejected() {
        let encoder = FeatureEncoder::default();
        let mut req = request("lung", "I");
        req.pain_score = Some(11);

        assert!(matches!(
            encoder.snapshot_from_request(&req),
            Err(ValidationError::InvalidValue { field: "pain_score", .. })
        ));
    }

    #[test]
    fn test_encoding_is_idempotent() {
        let encoder = FeatureEncoder::default();
        let snapshot = encoder.snapshot_from_request(&request("mama", "IV")).unwrap();

        assert_eq!(encoder.encode(&snapshot), encoder.encode(&snapshot));
    }
}
