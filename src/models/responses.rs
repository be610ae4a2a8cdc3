use serde::{Deserialize, Serialize};
use crate::models::domain::{PriorityCategory, StructuredData};

/// Response for the prioritize endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrioritizeResponse {
    pub priority_score: f64,
    pub priority_category: PriorityCategory,
    pub reason: String,
}

/// Response for the agent message endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentMessageResponse {
    pub response: String,
    pub critical_symptoms: Vec<String>,
    pub structured_data: StructuredData,
    pub should_alert: bool,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub model_trained: bool,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
