// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    Alert, AlertContext, AlertRequest, AlertSeverity, AlertType, CancerType, ChatTurn,
    ClinicalSnapshot, PriorityCategory, PriorityScore, Stage, StructuredData, SymptomDetection,
    SymptomTag,
};
pub use requests::{AgentMessageRequest, PrioritizeRequest};
pub use responses::{AgentMessageResponse, ErrorResponse, HealthResponse, PrioritizeResponse};
