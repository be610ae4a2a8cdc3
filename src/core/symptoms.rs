use crate::models::{SymptomDetection, SymptomTag};

/// Trigger phrases per critical symptom, matched as lowercase substrings
static CRITICAL_KEYWORDS: &[(SymptomTag, &[&str])] = &[
    (
        SymptomTag::Fever,
        &["febre", "febril", "temperatura alta", "calafrio"],
    ),
    (
        SymptomTag::Dyspnea,
        &["falta de ar", "não consigo respirar", "sufocando"],
    ),
    (
        SymptomTag::Bleeding,
        &["sangrando", "sangue", "hemorragia"],
    ),
    (
        SymptomTag::SeverePain,
        &["dor muito forte", "dor 10", "dor insuportável"],
    ),
    (
        SymptomTag::PersistentVomiting,
        &["vomitando muito", "não paro de vomitar"],
    ),
];

/// Scan a patient message for critical symptoms.
///
/// Every tag with at least one matching phrase is reported. Over-alerting is
/// preferred to a missed symptom, so there is no negation handling.
pub fn detect_critical_symptoms(message: &str) -> SymptomDetection {
    let lowered = message.to_lowercase();
    let mut detection = SymptomDetection::default();

    for (tag, phrases) in CRITICAL_KEYWORDS {
        if phrases.iter().any(|p| lowered.contains(p)) {
            detection.symptoms.insert(*tag);
        }
    }

    if detection.requires_alert() {
        tracing::debug!(symptoms = ?detection.tags(), "Critical symptoms detected");
    }

    detection
}

/// Trigger phrases configured for a tag
pub fn trigger_phrases(tag: SymptomTag) -> &'static [&'static str] {
    CRITICAL_KEYWORDS
        .iter()
        .find(|(t, _)| *t == tag)
        .map(|(_, phrases)| *phrases)
        .unwrap_or(&[])
}
