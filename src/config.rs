use crate::core::features::UnknownCategoryPolicy;
use crate::services::alerts::RetryPolicy;
use crate::services::completion::CompletionProvider;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub alerts: AlertSettings,
    #[serde(default)]
    pub scoring: ScoringSettings,
    #[serde(default)]
    pub model: ModelSettings,
    #[serde(default)]
    pub completion: CompletionSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlertSettings {
    pub backend_url: String,
    #[serde(default)]
    pub service_token: Option<String>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_backoff_unit_ms")]
    pub backoff_unit_ms: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_max_retries() -> u32 { 3 }
fn default_backoff_unit_ms() -> u64 { 1000 }
fn default_request_timeout_secs() -> u64 { 30 }

impl AlertSettings {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            backoff_unit: Duration::from_millis(self.backoff_unit_ms),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoringSettings {
    #[serde(default)]
    pub unknown_category_policy: UnknownCategoryPolicy,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelSettings {
    /// Ensemble artifact loaded at startup; scoring uses rules when absent
    #[serde(default)]
    pub artifact_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionSettings {
    #[serde(default)]
    pub provider: CompletionProvider,
    /// Defaults to the provider's public endpoint
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_completion_model")]
    pub model: String,
    #[serde(default = "default_completion_timeout_secs")]
    pub timeout_secs: u64,
}

impl CompletionSettings {
    pub fn endpoint(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| self.provider.default_base_url().to_string())
    }
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            provider: CompletionProvider::default(),
            base_url: None,
            api_key: None,
            model: default_completion_model(),
            timeout_secs: default_completion_timeout_secs(),
        }
    }
}

fn default_completion_model() -> String { "gpt-4".to_string() }
fn default_completion_timeout_secs() -> u64 { 60 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with ONCO_)
    /// 5. Conventional variables such as BACKEND_URL, BACKEND_SERVICE_TOKEN and LOG_LEVEL
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., ONCO__ALERTS__MAX_RETRIES -> alerts.max_retries
            .add_source(
                Environment::with_prefix("ONCO")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings = substitute_env_vars(settings)?;

        settings.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("ONCO")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }
}

/// Apply the conventional deployment variables on top of layered config
fn substitute_env_vars(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let provider = settings
        .get_string("completion.provider")
        .unwrap_or_default();
    let api_key_var = if provider.eq_ignore_ascii_case("anthropic") {
        "ANTHROPIC_API_KEY"
    } else {
        "OPENAI_API_KEY"
    };

    let overrides = [
        ("BACKEND_URL", "alerts.backend_url"),
        ("BACKEND_SERVICE_TOKEN", "alerts.service_token"),
        (api_key_var, "completion.api_key"),
        ("PRIORITY_MODEL_PATH", "model.artifact_path"),
        ("LOG_LEVEL", "logging.level"),
        ("LOG_FORMAT", "logging.format"),
    ];

    let mut builder = Config::builder().add_source(settings);
    for (var, key) in overrides {
        if let Ok(value) = env::var(var) {
            builder = builder.set_override(key, value)?;
        }
    }

    builder.build()
}
