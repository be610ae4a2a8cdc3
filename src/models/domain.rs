use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Cancer types known to the encoder, in lookup-table order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CancerType {
    Breast,
    Lung,
    Colorectal,
    Prostate,
    Kidney,
    Bladder,
    Testicular,
}

impl CancerType {
    pub const ALL: [CancerType; 7] = [
        CancerType::Breast,
        CancerType::Lung,
        CancerType::Colorectal,
        CancerType::Prostate,
        CancerType::Kidney,
        CancerType::Bladder,
        CancerType::Testicular,
    ];

    /// Parse a cancer type name, accepting English and Portuguese aliases
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "breast" | "mama" => Some(CancerType::Breast),
            "lung" | "pulmao" | "pulmão" => Some(CancerType::Lung),
            "colorectal" => Some(CancerType::Colorectal),
            "prostate" | "prostata" | "próstata" => Some(CancerType::Prostate),
            "kidney" | "rim" => Some(CancerType::Kidney),
            "bladder" | "bexiga" => Some(CancerType::Bladder),
            "testicular" | "testiculo" | "testículo" => Some(CancerType::Testicular),
            _ => None,
        }
    }

    /// Index in the versioned encoding table (0-6)
    pub fn index(self) -> u8 {
        match self {
            CancerType::Breast => 0,
            CancerType::Lung => 1,
            CancerType::Colorectal => 2,
            CancerType::Prostate => 3,
            CancerType::Kidney => 4,
            CancerType::Bladder => 5,
            CancerType::Testicular => 6,
        }
    }
}

/// Disease stage, ordinal I (early) through IV (metastatic)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Stage {
    I,
    II,
    III,
    IV,
}

impl Stage {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_uppercase().as_str() {
            "I" | "1" => Some(Stage::I),
            "II" | "2" => Some(Stage::II),
            "III" | "3" => Some(Stage::III),
            "IV" | "4" => Some(Stage::IV),
            _ => None,
        }
    }

    pub fn index(self) -> u8 {
        match self {
            Stage::I => 0,
            Stage::II => 1,
            Stage::III => 2,
            Stage::IV => 3,
        }
    }
}

/// One patient's clinical state at scoring time
#[derive(Debug, Clone, PartialEq)]
pub struct ClinicalSnapshot {
    pub cancer_type: CancerType,
    pub stage: Stage,
    /// ECOG performance status, 0 (fully active) to 4 (fully disabled)
    pub performance_status: u8,
    pub age: u16,
    pub pain_score: u8,
    pub nausea_score: u8,
    pub fatigue_score: u8,
    pub days_since_last_visit: u32,
    /// 0 when the patient is not in a treatment cycle
    pub treatment_cycle: u32,
}

/// Ordinal priority tiers; the derived ordering is low < medium < high < critical
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityCategory {
    Low,
    Medium,
    High,
    Critical,
}

impl PriorityCategory {
    /// Map a score to its tier using inclusive lower bounds (75 / 50 / 25).
    ///
    /// Defined for any f64; NaN falls through every comparison to `Low`.
    pub fn from_score(score: f64) -> Self {
        if score >= 75.0 {
            PriorityCategory::Critical
        } else if score >= 50.0 {
            PriorityCategory::High
        } else if score >= 25.0 {
            PriorityCategory::Medium
        } else {
            PriorityCategory::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PriorityCategory::Low => "low",
            PriorityCategory::Medium => "medium",
            PriorityCategory::High => "high",
            PriorityCategory::Critical => "critical",
        }
    }
}

impl fmt::Display for PriorityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A score clamped to [0, 100] together with its category
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriorityScore {
    pub value: f64,
    pub category: PriorityCategory,
}

impl PriorityScore {
    pub fn new(raw: f64) -> Self {
        let value = if raw.is_nan() { 0.0 } else { raw.clamp(0.0, 100.0) };
        Self {
            value,
            category: PriorityCategory::from_score(value),
        }
    }
}

/// Fixed vocabulary of safety-critical symptoms
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymptomTag {
    Fever,
    Dyspnea,
    Bleeding,
    SeverePain,
    PersistentVomiting,
}

impl SymptomTag {
    pub fn as_str(self) -> &'static str {
        match self {
            SymptomTag::Fever => "fever",
            SymptomTag::Dyspnea => "dyspnea",
            SymptomTag::Bleeding => "bleeding",
            SymptomTag::SeverePain => "severe_pain",
            SymptomTag::PersistentVomiting => "persistent_vomiting",
        }
    }
}

impl fmt::Display for SymptomTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Symptoms detected in a single message
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymptomDetection {
    pub symptoms: BTreeSet<SymptomTag>,
}

impl SymptomDetection {
    pub fn requires_alert(&self) -> bool {
        !self.symptoms.is_empty()
    }

    pub fn contains(&self, tag: SymptomTag) -> bool {
        self.symptoms.contains(&tag)
    }

    pub fn tags(&self) -> Vec<String> {
        self.symptoms.iter().map(|t| t.as_str().to_string()).collect()
    }
}

/// Quantitative self-report values pulled out of free text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredData {
    #[serde(default)]
    pub symptoms: BTreeMap<String, u8>,
    #[serde(default)]
    pub scales: BTreeMap<String, u8>,
}

impl StructuredData {
    pub fn is_empty(&self) -> bool {
        self.symptoms.is_empty() && self.scales.is_empty()
    }
}

/// A turn of the caller-owned conversation history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

/// Alert types accepted by the care-coordination backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertType {
    CriticalSymptom,
    NoResponse,
    DelayedAppointment,
    ScoreChange,
    SymptomWorsening,
    NavigationDelay,
    MissingExam,
    StagingIncomplete,
    TreatmentDelay,
    FollowUpOverdue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertSeverity {
    Critical,
    High,
    Medium,
    Low,
}

/// Structured context attached to an alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertContext {
    pub symptoms: Vec<String>,
    #[serde(rename = "detectedBy")]
    pub detected_by: String,
    /// Detection confidence in [0, 1]
    pub confidence: f64,
    #[serde(rename = "conversationId", skip_serializing_if = "Option::is_none", default)]
    pub conversation_id: Option<String>,
    #[serde(rename = "messageId", skip_serializing_if = "Option::is_none", default)]
    pub message_id: Option<String>,
}

/// Notification to be delivered to the care-coordination backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRequest {
    #[serde(rename = "patientId")]
    pub patient_id: String,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub context: Option<AlertContext>,
    /// Sent as the `X-Tenant-Id` header, never in the body
    #[serde(skip)]
    pub tenant_id: Option<String>,
}

impl AlertRequest {
    /// Critical-severity alert for symptoms found by the keyword detector
    pub fn critical_symptom(patient_id: &str, detection: &SymptomDetection) -> Self {
        let symptoms = detection.tags();
        Self {
            patient_id: patient_id.to_string(),
            alert_type: AlertType::CriticalSymptom,
            severity: AlertSeverity::Critical,
            message: format!("Critical symptoms reported by patient: {}", symptoms.join(", ")),
            context: Some(AlertContext {
                symptoms,
                detected_by: "ai_agent".to_string(),
                confidence: 1.0,
                conversation_id: None,
                message_id: None,
            }),
            tenant_id: None,
        }
    }

    pub fn with_conversation(mut self, conversation_id: Option<String>, message_id: Option<String>) -> Self {
        if let Some(ctx) = self.context.as_mut() {
            ctx.conversation_id = conversation_id;
            ctx.message_id = message_id;
        }
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        if let Some(ctx) = self.context.as_mut() {
            ctx.confidence = confidence.clamp(0.0, 1.0);
        }
        self
    }

    pub fn with_tenant(mut self, tenant_id: Option<String>) -> Self {
        self.tenant_id = tenant_id;
        self
    }
}

/// Alert as acknowledged by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    #[serde(rename = "patientId", default)]
    pub patient_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}
