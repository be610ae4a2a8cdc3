// Alert dispatcher tests against a mock care-coordination backend

use mockito::{Matcher, Server};
use onco_triage::core::detect_critical_symptoms;
use onco_triage::models::AlertRequest;
use onco_triage::services::{
    AlertDispatcher, AlertTrace, DispatchFailure, DispatchState, RetryPolicy,
};
use serde_json::json;
use std::time::Duration;

const UNIT: Duration = Duration::from_millis(1);
const CREATED: &str = r#"{"id":"alert-1","patientId":"patient-1","status":"PENDING"}"#;

fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_retries: 3,
        backoff_unit: UNIT,
        request_timeout: Duration::from_secs(5),
    }
}

fn dispatcher(base_url: String) -> AlertDispatcher {
    AlertDispatcher::new(base_url, Some("svc-token".to_string()), fast_policy())
}

fn alert() -> AlertRequest {
    AlertRequest::critical_symptom("patient-1", &detect_critical_symptoms("estou com febre"))
}

#[tokio::test]
async fn test_retries_server_errors_then_delivers() {
    let mut server = Server::new_async().await;
    let failing = server
        .mock("POST", "/api/v1/alerts")
        .with_status(500)
        .expect(2)
        .create_async()
        .await;
    let created = server
        .mock("POST", "/api/v1/alerts")
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(CREATED)
        .expect(1)
        .create_async()
        .await;

    let report = dispatcher(server.url()).dispatch(&alert(), 3).await;

    assert!(report.delivered());
    assert_eq!(report.attempts, 3);
    assert_eq!(report.waits, vec![UNIT, UNIT * 2]);
    assert_eq!(report.into_alert().map(|a| a.id), Some("alert-1".to_string()));
    failing.assert_async().await;
    created.assert_async().await;
}

#[tokio::test]
async fn test_patient_not_found_is_not_retried() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/v1/alerts")
        .with_status(404)
        .with_body(r#"{"message":"Patient not found"}"#)
        .expect(1)
        .create_async()
        .await;

    let report = dispatcher(server.url()).dispatch(&alert(), 3).await;

    assert_eq!(
        report.state,
        DispatchState::RejectedTerminal(DispatchFailure::PatientNotFound)
    );
    assert_eq!(report.attempts, 1);
    assert!(report.waits.is_empty());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_bad_request_is_terminal() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/v1/alerts")
        .with_status(400)
        .with_body("invalid severity")
        .expect(1)
        .create_async()
        .await;

    let report = dispatcher(server.url()).dispatch(&alert(), 3).await;

    assert_eq!(
        report.state,
        DispatchState::RejectedTerminal(DispatchFailure::Http {
            status: 400,
            body: "invalid severity".to_string(),
        })
    );
    assert_eq!(report.attempts, 1);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_rate_limit_is_retried() {
    let mut server = Server::new_async().await;
    let limited = server
        .mock("POST", "/api/v1/alerts")
        .with_status(429)
        .expect(1)
        .create_async()
        .await;
    let created = server
        .mock("POST", "/api/v1/alerts")
        .with_status(201)
        .with_body(CREATED)
        .expect(1)
        .create_async()
        .await;

    let report = dispatcher(server.url()).dispatch(&alert(), 3).await;

    assert!(report.delivered());
    assert_eq!(report.attempts, 2);
    assert_eq!(report.waits, vec![UNIT]);
    limited.assert_async().await;
    created.assert_async().await;
}

#[tokio::test]
async fn test_exhausted_retries_report_last_failure() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/v1/alerts")
        .with_status(503)
        .with_body("maintenance")
        .expect(3)
        .create_async()
        .await;

    let report = dispatcher(server.url()).dispatch(&alert(), 3).await;

    assert_eq!(
        report.state,
        DispatchState::RejectedAfterRetries(DispatchFailure::Http {
            status: 503,
            body: "maintenance".to_string(),
        })
    );
    assert_eq!(report.attempts, 3);
    // No wait after the final attempt
    assert_eq!(report.waits, vec![UNIT, UNIT * 2]);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_transport_errors_are_retried() {
    // Nothing listens on port 1
    let report = dispatcher("http://127.0.0.1:1".to_string())
        .dispatch(&alert(), 2)
        .await;

    assert!(matches!(
        report.state,
        DispatchState::RejectedAfterRetries(DispatchFailure::Transport(_))
    ));
    assert_eq!(report.attempts, 2);
    assert_eq!(report.waits, vec![UNIT]);
}

#[tokio::test]
async fn test_unreadable_success_body_is_terminal() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/v1/alerts")
        .with_status(201)
        .with_body("created")
        .expect(1)
        .create_async()
        .await;

    let report = dispatcher(server.url()).dispatch(&alert(), 3).await;

    assert!(matches!(
        report.state,
        DispatchState::RejectedTerminal(DispatchFailure::InvalidResponse(_))
    ));
    assert_eq!(report.attempts, 1);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_single_send_makes_one_attempt() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/v1/alerts")
        .with_status(500)
        .expect(1)
        .create_async()
        .await;

    let result = dispatcher(server.url()).send(&alert()).await;

    assert!(result.is_none());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_critical_symptom_alert_wire_format() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/v1/alerts")
        .match_header("authorization", "Bearer svc-token")
        .match_header("x-tenant-id", "tenant-9")
        .match_body(Matcher::PartialJson(json!({
            "patientId": "patient-1",
            "type": "CRITICAL_SYMPTOM",
            "severity": "CRITICAL",
            "context": {
                "symptoms": ["fever", "dyspnea"],
                "detectedBy": "ai_agent",
                "conversationId": "conv-1",
                "messageId": "msg-1"
            }
        })))
        .with_status(201)
        .with_body(CREATED)
        .expect(1)
        .create_async()
        .await;

    let detection = detect_critical_symptoms("estou com febre alta e não consigo respirar");
    let trace = AlertTrace {
        conversation_id: Some("conv-1".to_string()),
        message_id: Some("msg-1".to_string()),
        tenant_id: Some("tenant-9".to_string()),
    };

    let created = dispatcher(server.url())
        .create_critical_symptom_alert("patient-1", &detection, trace)
        .await;

    assert_eq!(created.map(|a| a.id), Some("alert-1".to_string()));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_missing_token_never_contacts_backend() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/v1/alerts")
        .expect(0)
        .create_async()
        .await;

    let dispatcher = AlertDispatcher::new(server.url(), None, fast_policy());
    assert!(!dispatcher.is_enabled());
    assert!(dispatcher.notify(&alert()).await.is_none());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_request_timeout_is_retried() {
    // Accepts connections and never answers
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let policy = RetryPolicy {
        max_retries: 2,
        backoff_unit: UNIT,
        request_timeout: Duration::from_millis(200),
    };
    let dispatcher = AlertDispatcher::new(format!("http://{}", addr), Some("svc-token".to_string()), policy);

    let report = dispatcher.dispatch(&alert(), 2).await;

    match &report.state {
        DispatchState::RejectedAfterRetries(DispatchFailure::Transport(message)) => {
            assert!(message.contains("200ms"), "unexpected message: {}", message);
        }
        other => panic!("expected a transport failure after retries, got {:?}", other),
    }
    assert_eq!(report.attempts, 2);
    assert_eq!(report.waits, vec![UNIT]);
}
