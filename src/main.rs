use actix_cors::Cors;
use actix_web::{web, App, HttpServer, HttpResponse, middleware, error, http::StatusCode};
use onco_triage::config::{LoggingSettings, Settings};
use onco_triage::core::{EnsembleConfig, FeatureEncoder, PriorityModel, PriorityScorer};
use onco_triage::routes::{self, triage::AppState};
use onco_triage::services::{AlertDispatcher, CompletionClient};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, error};
use tracing_subscriber::EnvFilter;

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST))
            .json(self)
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

/// Handle query payload errors
pub fn handle_query_payload_error(err: error::QueryPayloadError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    JsonError {
        error: "invalid_query".to_string(),
        message: format!("Invalid query: {}", err),
        status_code: 400,
    }
    .into()
}

fn init_logging(logging: &LoggingSettings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if logging.format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.init();
    }
}

/// Load the persisted ensemble, or leave the model untrained so scoring uses rules
fn load_model(settings: &Settings) -> PriorityModel {
    let mut model = PriorityModel::new(EnsembleConfig::default());

    match &settings.model.artifact_path {
        Some(path) => match model.load(path) {
            Ok(()) => info!("Priority model loaded from {}", path.display()),
            Err(e) => warn!("Failed to load priority model ({}), using rule-based scoring", e),
        },
        None => info!("No model artifact configured, using rule-based scoring"),
    }

    model
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    // Logging is configured from settings, so configuration errors go to stderr
    let settings = Settings::load().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    init_logging(&settings.logging);

    info!("Starting onco-triage service...");
    info!("Configuration loaded successfully");

    // Scoring engine
    let encoder = FeatureEncoder::new(settings.scoring.unknown_category_policy);
    let model = Arc::new(load_model(&settings));
    let scorer = PriorityScorer::new(encoder, model);

    info!(
        "Priority scorer initialized (model trained: {}, unknown categories: {:?})",
        scorer.model_trained(),
        scorer.encoder().policy()
    );

    // Alert dispatcher (disabled without a service token)
    let dispatcher = Arc::new(AlertDispatcher::new(
        settings.alerts.backend_url.clone(),
        settings.alerts.service_token.clone(),
        settings.alerts.retry_policy(),
    ));

    info!(
        "Alert dispatcher initialized for {} (enabled: {}, max attempts: {}, backoff unit: {:?})",
        settings.alerts.backend_url,
        dispatcher.is_enabled(),
        dispatcher.policy().max_retries,
        dispatcher.policy().backoff_unit
    );

    // Completion client is optional; replies fall back to a fixed acknowledgment
    let completion = match settings.completion.api_key.as_deref().map(str::trim) {
        Some(key) if !key.is_empty() => {
            let client = CompletionClient::new(
                settings.completion.endpoint(),
                key.to_string(),
                settings.completion.model.clone(),
                Duration::from_secs(settings.completion.timeout_secs),
            )
            .with_provider(settings.completion.provider);

            info!(
                "Completion client initialized (provider: {:?}, model: {})",
                client.provider(),
                client.model()
            );
            Some(Arc::new(client))
        }
        _ => {
            warn!("No completion API key configured, agent replies use the fallback text");
            None
        }
    };

    // Build application state
    let app_state = AppState {
        scorer,
        dispatcher,
        completion,
    };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))
    .map_err(|e| {
        error!("Failed to bind HTTP server: {}", e);
        e
    })?
    .run()
    .await
}
