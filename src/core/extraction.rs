use std::sync::LazyLock;

use regex::Regex;

use crate::models::StructuredData;

/// "dor" followed by a number and later a "10", e.g. "dor 7 de 10", "dor: 8/10"
static PAIN_SCALE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"dor[^\d]*(\d+)[^\d]*10").expect("pain scale pattern is valid")
});

const MAX_PAIN: u8 = 10;

/// Extract quantitative self-reports from a patient message.
///
/// Best-effort: text without a recognizable value yields empty maps.
pub fn extract_structured_data(message: &str) -> StructuredData {
    let mut data = StructuredData::default();

    if let Some(pain) = extract_pain_score(message) {
        data.symptoms.insert("pain".to_string(), pain);
    }

    data
}

/// Pain rating on the 0-10 scale, if the message states one
pub fn extract_pain_score(message: &str) -> Option<u8> {
    let lowered = message.to_lowercase();
    let captures = PAIN_SCALE_PATTERN.captures(&lowered)?;

    captures
        .get(1)
        .and_then(|m| m.as_str().parse::<u8>().ok())
        .filter(|v| *v <= MAX_PAIN)
}
