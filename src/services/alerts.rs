use crate::models::{Alert, AlertRequest, SymptomDetection};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;

/// Alert creation endpoint on the care-coordination backend
pub const ALERTS_PATH: &str = "/api/v1/alerts";

/// Header scoping an alert to a tenant
pub const TENANT_HEADER: &str = "X-Tenant-Id";

/// Why a delivery attempt did not produce an alert
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchFailure {
    #[error("service token not configured")]
    MissingCredential,

    #[error("patient not found")]
    PatientNotFound,

    #[error("service token rejected")]
    Unauthorized,

    #[error("service token lacks permission to create alerts")]
    Forbidden,

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid response body: {0}")]
    InvalidResponse(String),

    #[error("no attempts allowed")]
    NoAttempts,
}

impl DispatchFailure {
    /// Classify a non-2xx response
    pub fn from_status(status: StatusCode, body: String) -> Self {
        match status {
            StatusCode::NOT_FOUND => DispatchFailure::PatientNotFound,
            StatusCode::UNAUTHORIZED => DispatchFailure::Unauthorized,
            StatusCode::FORBIDDEN => DispatchFailure::Forbidden,
            _ => DispatchFailure::Http {
                status: status.as_u16(),
                body,
            },
        }
    }

    /// 5xx, 429 and transport errors are worth another attempt; everything else is terminal
    pub fn is_retryable(&self) -> bool {
        match self {
            DispatchFailure::Http { status, .. } => *status == 429 || *status >= 500,
            DispatchFailure::Transport(_) => true,
            _ => false,
        }
    }
}

/// Final state of one alert's delivery
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchState {
    Pending,
    Delivered(Alert),
    RejectedTerminal(DispatchFailure),
    RejectedAfterRetries(DispatchFailure),
}

/// Outcome of [`AlertDispatcher::dispatch`] with the attempt trail
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchReport {
    pub state: DispatchState,
    pub attempts: u32,
    /// Backoff waits applied between attempts, in order
    pub waits: Vec<Duration>,
}

impl DispatchReport {
    fn pending() -> Self {
        Self {
            state: DispatchState::Pending,
            attempts: 0,
            waits: Vec::new(),
        }
    }

    pub fn delivered(&self) -> bool {
        matches!(self.state, DispatchState::Delivered(_))
    }

    pub fn into_alert(self) -> Option<Alert> {
        match self.state {
            DispatchState::Delivered(alert) => Some(alert),
            _ => None,
        }
    }
}

/// Retry budget and timing for alert delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per alert, including the first
    pub max_retries: u32,
    /// Attempt i waits `backoff_unit * 2^i` before the next one
    pub backoff_unit: Duration,
    /// Per-attempt request timeout
    pub request_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_unit: Duration::from_secs(1),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Wait after the zero-indexed `attempt` fails
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.backoff_unit.saturating_mul(factor)
    }
}

/// Optional identifiers carried into a critical-symptom alert
#[derive(Debug, Clone, Default)]
pub struct AlertTrace {
    pub conversation_id: Option<String>,
    pub message_id: Option<String>,
    pub tenant_id: Option<String>,
}

/// Care-coordination backend client
///
/// Delivers alerts with bearer authentication:
/// - Single attempts via [`send`](Self::send)
/// - Bounded retries with exponential backoff via [`send_with_retry`](Self::send_with_retry)
///
/// Failures never escape as errors: they are logged by reason and resolve to `None`.
pub struct AlertDispatcher {
    base_url: String,
    service_token: Option<String>,
    client: Client,
    policy: RetryPolicy,
}

impl AlertDispatcher {
    /// Create a new dispatcher. Without a token the dispatcher still builds
    /// but every delivery resolves to [`DispatchFailure::MissingCredential`].
    pub fn new(base_url: String, service_token: Option<String>, policy: RetryPolicy) -> Self {
        let service_token = service_token.filter(|t| !t.trim().is_empty());
        if service_token.is_none() {
            tracing::warn!("Backend service token not configured, alerts will not be created");
        }

        let client = Client::builder()
            .timeout(policy.request_timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url,
            service_token,
            client,
            policy,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.service_token.is_some()
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Single delivery attempt
    pub async fn send(&self, alert: &AlertRequest) -> Option<Alert> {
        self.dispatch(alert, 1).await.into_alert()
    }

    /// Deliver with up to `max_retries` total attempts
    pub async fn send_with_retry(&self, alert: &AlertRequest, max_retries: u32) -> Option<Alert> {
        self.dispatch(alert, max_retries).await.into_alert()
    }

    /// Deliver with the configured retry budget
    pub async fn notify(&self, alert: &AlertRequest) -> Option<Alert> {
        self.send_with_retry(alert, self.policy.max_retries).await
    }

    /// Build and deliver a critical-symptom alert for a detection result
    pub async fn create_critical_symptom_alert(
        &self,
        patient_id: &str,
        detection: &SymptomDetection,
        trace: AlertTrace,
    ) -> Option<Alert> {
        let alert = AlertRequest::critical_symptom(patient_id, detection)
            .with_conversation(trace.conversation_id, trace.message_id)
            .with_tenant(trace.tenant_id);

        self.notify(&alert).await
    }

    /// Drive one alert through `Pending -> Delivered | RejectedTerminal | RejectedAfterRetries`.
    ///
    /// Attempts are strictly sequential. No wait follows the last attempt or a
    /// terminal failure.
    pub async fn dispatch(&self, alert: &AlertRequest, max_retries: u32) -> DispatchReport {
        let mut report = DispatchReport::pending();

        let Some(token) = self.service_token.as_deref() else {
            log_failure(&alert.patient_id, &DispatchFailure::MissingCredential);
            report.state = DispatchState::RejectedTerminal(DispatchFailure::MissingCredential);
            return report;
        };

        let mut last_failure = DispatchFailure::NoAttempts;

        while matches!(report.state, DispatchState::Pending) {
            if report.attempts >= max_retries {
                tracing::error!(
                    patient_id = %alert.patient_id,
                    attempts = report.attempts,
                    reason = %last_failure,
                    "Alert not created after exhausting attempts"
                );
                report.state = DispatchState::RejectedAfterRetries(last_failure.clone());
                break;
            }

            let attempt = report.attempts;
            report.attempts += 1;

            match self.transmit(token, alert).await {
                Ok(created) => {
                    tracing::info!(alert_id = %created.id, attempts = report.attempts, "Alert created");
                    report.state = DispatchState::Delivered(created);
                }
                Err(failure) if !failure.is_retryable() => {
                    log_failure(&alert.patient_id, &failure);
                    report.state = DispatchState::RejectedTerminal(failure);
                }
                Err(failure) => {
                    log_failure(&alert.patient_id, &failure);
                    if report.attempts < max_retries {
                        let wait = self.policy.backoff_for(attempt);
                        tracing::warn!(
                            attempt = report.attempts,
                            max_retries,
                            wait_ms = wait.as_millis() as u64,
                            "Alert attempt failed, retrying"
                        );
                        tokio::time::sleep(wait).await;
                        report.waits.push(wait);
                    }
                    last_failure = failure;
                }
            }
        }

        report
    }

    async fn transmit(&self, token: &str, alert: &AlertRequest) -> Result<Alert, DispatchFailure> {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), ALERTS_PATH);

        let mut request = self.client.post(&url).bearer_auth(token).json(alert);
        if let Some(tenant_id) = &alert.tenant_id {
            request = request.header(TENANT_HEADER, tenant_id);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                DispatchFailure::Transport(format!(
                    "request timed out after {:?}",
                    self.policy.request_timeout
                ))
            } else {
                DispatchFailure::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|_| "Unable to read body".to_string());
            return Err(DispatchFailure::from_status(status, body));
        }

        response
            .json::<Alert>()
            .await
            .map_err(|e| DispatchFailure::InvalidResponse(e.to_string()))
    }
}

fn log_failure(patient_id: &str, failure: &DispatchFailure) {
    match failure {
        DispatchFailure::MissingCredential => {
            tracing::error!("Backend service token not configured, alert not created")
        }
        DispatchFailure::PatientNotFound => {
            tracing::error!(patient_id, "Patient not found by backend")
        }
        DispatchFailure::Unauthorized => tracing::error!("Backend rejected the service token"),
        DispatchFailure::Forbidden => {
            tracing::error!("Service token lacks permission to create alerts")
        }
        DispatchFailure::Http { status, body } => {
            tracing::error!(patient_id, status, body = %body, "Alert request failed")
        }
        DispatchFailure::Transport(msg) => {
            tracing::warn!(patient_id, error = %msg, "Alert request did not reach the backend")
        }
        DispatchFailure::InvalidResponse(msg) => {
            tracing::error!(patient_id, error = %msg, "Backend returned an unreadable alert")
        }
        DispatchFailure::NoAttempts => {}
    }
}
