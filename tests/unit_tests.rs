// Unit tests for onco-triage

use onco_triage::core::{
    detect_critical_symptoms, extract_pain_score, extract_structured_data, reason_text,
    rule_based_score, FeatureEncoder, PriorityScorer, ScoreSource, UnknownCategoryPolicy,
    ValidationError,
};
use onco_triage::core::scoring::ScoringError;
use onco_triage::models::{
    AlertRequest, AlertSeverity, AlertType, CancerType, ClinicalSnapshot, PrioritizeRequest,
    PriorityCategory, PriorityScore, Stage, SymptomTag,
};

fn snapshot(stage: Stage, performance_status: u8, pain_score: u8, days: u32) -> ClinicalSnapshot {
    ClinicalSnapshot {
        cancer_type: CancerType::Breast,
        stage,
        performance_status,
        age: 58,
        pain_score,
        nausea_score: 0,
        fatigue_score: 0,
        days_since_last_visit: days,
        treatment_cycle: 1,
    }
}

fn request(cancer_type: &str, stage: &str) -> PrioritizeRequest {
    PrioritizeRequest {
        cancer_type: cancer_type.to_string(),
        stage: stage.to_string(),
        performance_status: 1,
        age: 60,
        pain_score: Some(3),
        nausea_score: None,
        fatigue_score: None,
        days_since_last_visit: 20,
        treatment_cycle: None,
    }
}

#[test]
fn test_category_boundaries() {
    assert_eq!(PriorityCategory::from_score(75.0), PriorityCategory::Critical);
    assert_eq!(PriorityCategory::from_score(74.999), PriorityCategory::High);
    assert_eq!(PriorityCategory::from_score(50.0), PriorityCategory::High);
    assert_eq!(PriorityCategory::from_score(49.999), PriorityCategory::Medium);
    assert_eq!(PriorityCategory::from_score(25.0), PriorityCategory::Medium);
    assert_eq!(PriorityCategory::from_score(24.999), PriorityCategory::Low);
    assert_eq!(PriorityCategory::from_score(0.0), PriorityCategory::Low);
    assert_eq!(PriorityCategory::from_score(100.0), PriorityCategory::Critical);
}

#[test]
fn test_category_is_monotonic() {
    let mut previous = PriorityCategory::from_score(0.0);
    for step in 0..=1000 {
        let current = PriorityCategory::from_score(step as f64 / 10.0);
        assert!(current >= previous, "category dropped at {}", step as f64 / 10.0);
        previous = current;
    }
}

#[test]
fn test_priority_score_bounds() {
    assert_eq!(PriorityScore::new(-12.0).value, 0.0);
    assert_eq!(PriorityScore::new(140.0).value, 100.0);
    assert_eq!(PriorityScore::new(f64::NAN).value, 0.0);
    assert_eq!(PriorityScore::new(140.0).category, PriorityCategory::Critical);
}

#[test]
fn test_rule_example_scores_critical() {
    // pain 9, stage IV, ECOG 3, 75 days since last visit
    let s = snapshot(Stage::IV, 3, 9, 75);
    assert_eq!(rule_based_score(&s), 90.0);
    assert_eq!(PriorityCategory::from_score(rule_based_score(&s)), PriorityCategory::Critical);
}

#[test]
fn test_rule_thresholds_are_exact() {
    assert_eq!(rule_based_score(&snapshot(Stage::III, 2, 7, 60)), 0.0);
    assert_eq!(rule_based_score(&snapshot(Stage::III, 2, 8, 60)), 30.0);
    assert_eq!(rule_based_score(&snapshot(Stage::III, 3, 7, 60)), 25.0);
    assert_eq!(rule_based_score(&snapshot(Stage::III, 2, 7, 61)), 15.0);
    assert_eq!(rule_based_score(&snapshot(Stage::IV, 2, 7, 60)), 20.0);
}

#[test]
fn test_rule_score_always_in_range() {
    for stage in [Stage::I, Stage::II, Stage::III, Stage::IV] {
        for ps in 0..=4 {
            for pain in 0..=10 {
                for days in [0, 60, 61, 365] {
                    let score = rule_based_score(&snapshot(stage, ps, pain, days));
                    assert!((0.0..=100.0).contains(&score));
                }
            }
        }
    }
}

#[test]
fn test_reason_text() {
    let reason = reason_text(&snapshot(Stage::IV, 3, 9, 75));
    assert!(reason.contains("severe pain"));
    assert!(reason.contains("advanced stage"));

    assert_eq!(
        reason_text(&snapshot(Stage::I, 0, 0, 5)),
        "prioritized from combined clinical factors"
    );
}

#[test]
fn test_encoder_is_idempotent() {
    let encoder = FeatureEncoder::default();
    let s = snapshot(Stage::II, 1, 4, 30);
    assert_eq!(encoder.encode(&s), encoder.encode(&s));
}

#[test]
fn test_unknown_category_rejected_by_default() {
    let scorer = PriorityScorer::rules_only(FeatureEncoder::default());
    let err = scorer.assess_request(&request("melanoma", "II")).unwrap_err();

    assert!(matches!(
        err,
        ScoringError::Validation(ValidationError::UnknownCategory { .. })
    ));
}

#[test]
fn test_unknown_category_fallback_policy() {
    let scorer = PriorityScorer::rules_only(FeatureEncoder::new(UnknownCategoryPolicy::Fallback));
    assert_eq!(scorer.encoder().policy(), UnknownCategoryPolicy::Fallback);

    let result = scorer.assess_request(&request("melanoma", "II")).unwrap();

    assert_eq!(result.source, ScoreSource::Rules);
    assert!((0.0..=100.0).contains(&result.score.value));
}

#[test]
fn test_detector_example() {
    let detection = detect_critical_symptoms("estou com febre alta e não consigo respirar");

    assert!(detection.requires_alert());
    assert!(detection.contains(SymptomTag::Fever));
    assert!(detection.contains(SymptomTag::Dyspnea));
    assert_eq!(detection.symptoms.len(), 2);
}

#[test]
fn test_detector_quiet_message() {
    let detection = detect_critical_symptoms("hoje estou bem, só um pouco cansada");
    assert!(!detection.requires_alert());
    assert!(detection.tags().is_empty());
}

#[test]
fn test_extract_pain() {
    assert_eq!(extract_pain_score("minha dor está 7 de 10"), Some(7));
    assert_eq!(extract_pain_score("dor nível 12/10"), None);
    assert!(extract_structured_data("tudo bem por aqui").is_empty());
    assert_eq!(
        extract_structured_data("dor 8/10").symptoms.get("pain").copied(),
        Some(8)
    );
}

#[test]
fn test_critical_symptom_alert_request() {
    let detection = detect_critical_symptoms("estou sangrando");
    let alert = AlertRequest::critical_symptom("patient-42", &detection);

    assert_eq!(alert.alert_type, AlertType::CriticalSymptom);
    assert_eq!(alert.severity, AlertSeverity::Critical);
    assert_eq!(alert.message, "Critical symptoms reported by patient: bleeding");

    let body = serde_json::to_value(&alert).unwrap();
    assert_eq!(body["patientId"], "patient-42");
    assert_eq!(body["type"], "CRITICAL_SYMPTOM");
    assert_eq!(body["context"]["detectedBy"], "ai_agent");
    assert_eq!(body["context"]["symptoms"][0], "bleeding");
}
