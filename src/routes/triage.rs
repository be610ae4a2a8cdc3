use actix_web::{web, HttpResponse, Responder};
use validator::Validate;
use crate::core::scoring::{PriorityScorer, ScoringError};
use crate::core::{detect_critical_symptoms, extract_structured_data};
use crate::models::{
    AgentMessageRequest, AgentMessageResponse, ErrorResponse, HealthResponse, PrioritizeRequest,
    PrioritizeResponse,
};
use crate::services::{AlertDispatcher, AlertTrace, CompletionClient, FALLBACK_REPLY};
use std::sync::Arc;

/// Service name reported by the health endpoint
pub const SERVICE_NAME: &str = "onco-triage";

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub scorer: PriorityScorer,
    pub dispatcher: Arc<AlertDispatcher>,
    pub completion: Option<Arc<CompletionClient>>,
}

/// Configure all triage routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/prioritize", web::post().to(prioritize))
        .route("/agent/message", web::post().to(agent_message));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        service: SERVICE_NAME.to_string(),
        model_trained: state.scorer.model_trained(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

fn bad_request(error: &str, message: String) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse {
        error: error.to_string(),
        message,
        status_code: 400,
    })
}

/// Prioritize endpoint
///
/// POST /api/v1/prioritize
///
/// Request body:
/// ```json
/// {
///   "cancer_type": "lung",
///   "stage": "IV",
///   "performance_status": 3,
///   "age": 64,
///   "pain_score": 8,
///   "days_since_last_visit": 75
/// }
/// ```
async fn prioritize(
    state: web::Data<AppState>,
    req: web::Json<PrioritizeRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for prioritize request: {:?}", errors);
        return bad_request("Validation failed", errors.to_string());
    }

    match state.scorer.assess_request(&req) {
        Ok(assessment) => {
            tracing::info!(
                score = assessment.score.value,
                category = %assessment.score.category,
                source = ?assessment.source,
                "Priority computed"
            );
            HttpResponse::Ok().json(PrioritizeResponse {
                priority_score: assessment.score.value,
                priority_category: assessment.score.category,
                reason: assessment.reason,
            })
        }
        Err(ScoringError::Validation(e)) => {
            tracing::info!("Rejected prioritize request: {}", e);
            bad_request("Validation failed", e.to_string())
        }
        Err(e) => {
            tracing::error!("Failed to compute priority: {}", e);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Failed to compute priority".to_string(),
                message: e.to_string(),
                status_code: 500,
            })
        }
    }
}

/// Agent message endpoint
///
/// POST /api/v1/agent/message
///
/// Critical symptoms are detected from the patient text alone. When any are
/// found an alert is dispatched in the background before the reply is
/// generated, so neither outcome can block the other.
async fn agent_message(
    state: web::Data<AppState>,
    req: web::Json<AgentMessageRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for agent message: {:?}", errors);
        return bad_request("Validation failed", errors.to_string());
    }

    let req = req.into_inner();
    let detection = detect_critical_symptoms(&req.message);
    let structured_data = extract_structured_data(&req.message);
    let should_alert = detection.requires_alert();

    if should_alert {
        tracing::warn!(
            patient_id = %req.patient_id,
            symptoms = ?detection.tags(),
            "Critical symptoms detected, dispatching alert"
        );

        let dispatcher = Arc::clone(&state.dispatcher);
        let patient_id = req.patient_id.clone();
        let detection = detection.clone();
        let trace = AlertTrace {
            conversation_id: req.conversation_id.clone(),
            message_id: req.message_id.clone(),
            tenant_id: req.tenant_id.clone(),
        };

        tokio::spawn(async move {
            if dispatcher
                .create_critical_symptom_alert(&patient_id, &detection, trace)
                .await
                .is_none()
            {
                tracing::error!(patient_id = %patient_id, "Critical symptom alert was not delivered");
            }
        });
    }

    let response = match &state.completion {
        Some(client) => {
            match client
                .reply(&req.message, &req.patient_context, &req.conversation_history)
                .await
            {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!("Failed to generate reply for {}: {}", req.patient_id, e);
                    return HttpResponse::InternalServerError().json(ErrorResponse {
                        error: "Failed to process message".to_string(),
                        message: e.to_string(),
                        status_code: 500,
                    });
                }
            }
        }
        None => FALLBACK_REPLY.to_string(),
    };

    HttpResponse::Ok().json(AgentMessageResponse {
        response,
        critical_symptoms: detection.tags(),
        structured_data,
        should_alert,
    })
}
