use crate::models::{ClinicalSnapshot, Stage};

/// Reason reported when no individual rule fires
pub const DEFAULT_REASON: &str = "prioritized from combined clinical factors";

const SEVERE_PAIN_POINTS: f64 = 30.0;
const ADVANCED_STAGE_POINTS: f64 = 20.0;
const POOR_PERFORMANCE_POINTS: f64 = 25.0;
const OVERDUE_VISIT_POINTS: f64 = 15.0;

const SEVERE_PAIN_THRESHOLD: u8 = 8;
const POOR_PERFORMANCE_THRESHOLD: u8 = 3;
const OVERDUE_VISIT_DAYS: u32 = 60;

/// Calculate a rule-based priority score (0-100)
///
/// Scoring formula:
/// score = (
///     30 if pain >= 8 +
///     20 if stage IV +
///     25 if performance status >= 3 +
///     15 if more than 60 days since last visit
/// ) clamped to [0, 100]
///
/// Training labels from [`crate::core::dataset::reference_priority`] start
/// from these four rules and add secondary criteria on top.
pub fn rule_based_score(snapshot: &ClinicalSnapshot) -> f64 {
    let mut score = 0.0;

    if snapshot.pain_score >= SEVERE_PAIN_THRESHOLD {
        score += SEVERE_PAIN_POINTS;
    }
    if snapshot.stage == Stage::IV {
        score += ADVANCED_STAGE_POINTS;
    }
    if snapshot.performance_status >= POOR_PERFORMANCE_THRESHOLD {
        score += POOR_PERFORMANCE_POINTS;
    }
    if snapshot.days_since_last_visit > OVERDUE_VISIT_DAYS {
        score += OVERDUE_VISIT_POINTS;
    }

    f64::min(100.0, f64::max(0.0, score))
}

/// Human-readable reasons behind a snapshot's priority
pub fn reasons(snapshot: &ClinicalSnapshot) -> Vec<&'static str> {
    let mut reasons = Vec::new();

    if snapshot.pain_score >= SEVERE_PAIN_THRESHOLD {
        reasons.push("severe pain reported");
    }
    if snapshot.stage == Stage::IV {
        reasons.push("advanced stage");
    }
    if snapshot.performance_status >= POOR_PERFORMANCE_THRESHOLD {
        reasons.push("compromised performance status");
    }
    if snapshot.days_since_last_visit > OVERDUE_VISIT_DAYS {
        reasons.push("overdue follow-up");
    }

    reasons
}

/// Join [`reasons`] into one string, or [`DEFAULT_REASON`] when empty
pub fn reason_text(snapshot: &ClinicalSnapshot) -> String {
    let reasons = reasons(snapshot);
    if reasons.is_empty() {
        DEFAULT_REASON.to_string()
    } else {
        reasons.join("; ")
    }
}
