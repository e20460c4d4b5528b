//! Configuration for readiness-runtime.
//!
//! Loaded from YAML; every field has a default so an empty file is a
//! valid configuration. Credentials and deployment coordinates can be
//! overridden from the environment after the file is read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use readiness_core::{Branding, ClassifierRules};

/// Environment variables consulted by [`RuntimeConfig::apply_env_overrides`].
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const ACCESS_TOKEN_ENV: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";
pub const PROJECT_ID_ENV: &str = "PROJECT_ID";
pub const REGION_ENV: &str = "REGION";
pub const MODEL_ID_ENV: &str = "MODEL_ID";
pub const DATABASE_URL_ENV: &str = "READINESS_DATABASE_URL";

/// Errors while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid config value for {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

/// Runtime configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Oracle endpoint and generation settings
    #[serde(default)]
    pub oracle: OracleConfig,

    /// Retry policy around the oracle call
    #[serde(default)]
    pub retry: RetryConfig,

    /// Database and output locations
    #[serde(default)]
    pub storage: StorageConfig,

    /// Where the rubric comes from
    #[serde(default)]
    pub rubric: RubricSourceConfig,

    /// Evidence admission limits
    #[serde(default)]
    pub evidence: EvidenceConfig,

    /// Report branding and reproducibility
    #[serde(default)]
    pub report: ReportConfig,

    /// Keyword table for answer classification
    #[serde(default)]
    pub classifier: ClassifierRules,
}

impl RuntimeConfig {
    /// Parse configuration from YAML text.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: RuntimeConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Overlay values from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Overlay values from any lookup; empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = get(API_KEY_ENV) {
            self.oracle.api_key = Some(key);
        }
        if let Some(token) = get(ACCESS_TOKEN_ENV) {
            self.oracle.access_token = Some(token);
        }
        if let Some(project) = get(PROJECT_ID_ENV) {
            self.oracle.project_id = Some(project);
        }
        if let Some(region) = get(REGION_ENV) {
            self.oracle.region = Some(region);
        }
        if let Some(model) = get(MODEL_ID_ENV) {
            self.oracle.model = model;
        }
        if let Some(url) = get(DATABASE_URL_ENV) {
            self.storage.database_url = url;
        }
    }

    /// Check cross-field constraints serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.oracle.model.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "oracle.model",
                message: "must not be empty".to_string(),
            });
        }
        if self.oracle.timeout.is_zero() {
            return Err(ConfigError::Invalid {
                field: "oracle.timeout",
                message: "must be greater than zero".to_string(),
            });
        }
        if self.evidence.max_bytes == 0 {
            return Err(ConfigError::Invalid {
                field: "evidence.max_bytes",
                message: "must be greater than zero".to_string(),
            });
        }
        if self.retry.initial_backoff > self.retry.max_backoff {
            return Err(ConfigError::Invalid {
                field: "retry.initial_backoff",
                message: "must not exceed retry.max_backoff".to_string(),
            });
        }
        match self.rubric.source {
            RubricSourceKind::Yaml if self.rubric.path.is_none() => Err(ConfigError::Invalid {
                field: "rubric.path",
                message: "required when rubric.source is yaml".to_string(),
            }),
            RubricSourceKind::Matrices if self.rubric.matrices.is_none() => {
                Err(ConfigError::Invalid {
                    field: "rubric.matrices",
                    message: "required when rubric.source is matrices".to_string(),
                })
            }
            _ => Ok(()),
        }
    }
}

/// How the oracle is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// Vertex when project and region are set, otherwise API key
    #[default]
    Auto,
    Vertex,
    ApiKey,
}

/// Oracle configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    #[serde(default)]
    pub transport: TransportKind,

    #[serde(default = "default_model")]
    pub model: String,

    /// Cloud project for the Vertex transport
    #[serde(default)]
    pub project_id: Option<String>,

    /// Cloud region for the Vertex transport
    #[serde(default)]
    pub region: Option<String>,

    /// Key for the API-key transport
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// Static bearer token for the Vertex transport
    #[serde(default, skip_serializing)]
    pub access_token: Option<String>,

    /// Command printing a bearer token on stdout
    #[serde(default = "default_token_command")]
    pub token_command: Vec<String>,

    /// Override for the service root URL
    #[serde(default)]
    pub base_url: Option<String>,

    /// Upper bound for a single oracle call
    #[serde(with = "humantime_serde", default = "default_oracle_timeout")]
    pub timeout: Duration,

    #[serde(default)]
    pub temperature: f32,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    #[serde(default = "default_response_mime")]
    pub response_mime_type: String,
}

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_token_command() -> Vec<String> {
    vec![
        "gcloud".to_string(),
        "auth".to_string(),
        "print-access-token".to_string(),
    ]
}

fn default_oracle_timeout() -> Duration {
    Duration::from_secs(300)
}

fn default_max_output_tokens() -> u32 {
    8192
}

fn default_response_mime() -> String {
    "text/plain".to_string()
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            transport: TransportKind::Auto,
            model: default_model(),
            project_id: None,
            region: None,
            api_key: None,
            access_token: None,
            token_command: default_token_command(),
            base_url: None,
            timeout: default_oracle_timeout(),
            temperature: 0.0,
            max_output_tokens: default_max_output_tokens(),
            response_mime_type: default_response_mime(),
        }
    }
}

impl OracleConfig {
    /// The transport `auto` resolves to.
    pub fn resolved_transport(&self) -> TransportKind {
        match self.transport {
            TransportKind::Auto => {
                if self.project_id.is_some() && self.region.is_some() {
                    TransportKind::Vertex
                } else {
                    TransportKind::ApiKey
                }
            }
            other => other,
        }
    }
}

/// Retry configuration for network-class oracle failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Extra attempts after the first; 0 disables retry
    #[serde(default)]
    pub max_retries: usize,

    #[serde(with = "humantime_serde", default = "default_initial_backoff")]
    pub initial_backoff: Duration,

    #[serde(with = "humantime_serde", default = "default_max_backoff")]
    pub max_backoff: Duration,
}

fn default_initial_backoff() -> Duration {
    Duration::from_millis(500)
}

fn default_max_backoff() -> Duration {
    Duration::from_secs(10)
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_backoff: default_initial_backoff(),
            max_backoff: default_max_backoff(),
        }
    }
}

/// Storage locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Directory reports are written to
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Parent of per-run staging directories; system temp when unset
    #[serde(default)]
    pub staging_dir: Option<PathBuf>,
}

fn default_database_url() -> String {
    "sqlite://readiness.db?mode=rwc".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            output_dir: default_output_dir(),
            staging_dir: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RubricSourceKind {
    /// Level and criteria tables in the database
    #[default]
    Store,

    /// A YAML rubric document
    Yaml,

    /// Three flat-file matrices
    Matrices,
}

/// Paths of the three flat-file matrices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixPaths {
    pub evidence: PathBuf,
    pub scores: PathBuf,
    pub global: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RubricSourceConfig {
    #[serde(default)]
    pub source: RubricSourceKind,

    /// YAML rubric document, for `source: yaml`
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Matrix files, for `source: matrices`
    #[serde(default)]
    pub matrices: Option<MatrixPaths>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceConfig {
    /// Largest payload dispatched to the oracle
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
}

fn default_max_bytes() -> usize {
    10 * 1024 * 1024
}

impl Default for EvidenceConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_max_bytes(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default)]
    pub branding: Branding,

    /// Fixed emission timestamp for reproducible reports
    #[serde(default)]
    pub generated_at: Option<DateTime<Utc>>,
}

impl ReportConfig {
    /// The configured timestamp, or now.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.generated_at.unwrap_or_else(Utc::now)
    }
}

mod humantime_serde {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
