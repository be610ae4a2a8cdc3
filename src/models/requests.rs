use serde::{Deserialize, Serialize};
use validator::Validate;
use crate::models::domain::ChatTurn;

/// Request to compute a priority score for one patient
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PrioritizeRequest {
    #[validate(length(min = 1))]
    pub cancer_type: String,
    #[validate(length(min = 1))]
    pub stage: String,
    #[validate(range(min = 0, max = 4))]
    pub performance_status: u8,
    #[validate(range(min = 0, max = 130))]
    pub age: u16,
    #[serde(default)]
    #[validate(range(min = 0, max = 10))]
    pub pain_score: Option<u8>,
    #[serde(default)]
    #[validate(range(min = 0, max = 10))]
    pub nausea_score: Option<u8>,
    #[serde(default)]
    #[validate(range(min = 0, max = 10))]
    pub fatigue_score: Option<u8>,
    pub days_since_last_visit: u32,
    #[serde(default)]
    #[validate(range(min = 1))]
    pub treatment_cycle: Option<u32>,
}

/// Request to process one patient message
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AgentMessageRequest {
    #[validate(length(min = 1))]
    pub message: String,
    #[validate(length(min = 1))]
    pub patient_id: String,
    #[serde(default)]
    pub patient_context: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub conversation_history: Vec<ChatTurn>,
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub tenant_id: Option<String>,
}
