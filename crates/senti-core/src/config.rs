//! Configuration management for senti
//!
//! Settings are layered with the following precedence (highest first):
//! 1. Environment variables prefixed with `SENTI_` (nested keys use `__`)
//! 2. A YAML file (`SENTI_CONFIG`, else `./senti.yaml` when present)
//! 3. Built-in defaults

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit configuration file
pub const CONFIG_PATH_ENV: &str = "SENTI_CONFIG";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Config error: {0}")]
    Source(#[from] config::ConfigError),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Top-level service settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app_name: String,
    pub app_version: String,

    /// Enables debug logging
    pub debug: bool,

    pub model: ModelSettings,
    pub limits: TextLimits,
    pub server: ServerSettings,
    pub logging: LoggingSettings,
}

/// Which inference capability backs the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelBackend {
    /// Offline word-list scorer
    Lexicon,
    /// Hugging Face style text-classification endpoint
    Remote,
}

/// Model build parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Source identifier of the model
    pub name: String,

    /// Directory where model artifacts are cached
    pub cache_dir: PathBuf,

    pub backend: ModelBackend,

    /// Base URL of the model hub used to fetch model cards
    pub hub_url: String,

    /// Text-classification endpoint used by the remote backend
    pub inference_url: Option<String>,

    pub request_timeout_seconds: u64,
}

/// Bounds applied to inbound payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextLimits {
    pub min_text_length: usize,
    pub max_text_length: usize,

    /// Maximum request body size in bytes
    pub max_request_size: usize,
}

/// HTTP listener settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub enable_cors: bool,
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (json or text)
    pub format: String,
}

impl Settings {
    /// Load settings from the default file locations and the process environment
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from);
        Self::load_with(path.as_deref(), None)
    }

    /// Load settings from an explicit file and, optionally, an explicit
    /// environment map instead of the process environment.
    pub fn load_with(
        path: Option<&Path>,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?);

        builder = match path {
            Some(path) => builder.add_source(config::File::from(path)),
            None => builder.add_source(config::File::with_name("senti.yaml").required(false)),
        };

        builder = builder.add_source(
            config::Environment::with_prefix("SENTI")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(env),
        );

        let settings: Self = builder.build()?.try_deserialize()?;
        settings.validate()?;

        Ok(settings)
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.limits.validate()?;
        self.server.validate()?;
        self.model.validate()?;
        Ok(())
    }

    /// Effective log level, taking the debug flag into account
    pub fn log_level(&self) -> &str {
        if self.debug {
            "debug"
        } else {
            &self.logging.level
        }
    }

    /// Render the settings as YAML
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_name: "ML Model Service".to_string(),
            app_version: "1.0.0".to_string(),
            debug: false,
            model: ModelSettings::default(),
            limits: TextLimits::default(),
            server: ServerSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl ModelSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid("Model name cannot be empty".to_string()));
        }

        if self.backend == ModelBackend::Remote && self.inference_url.is_none() {
            return Err(ConfigError::Invalid(
                "Remote backend requires model.inference_url".to_string(),
            ));
        }

        if self.request_timeout_seconds == 0 {
            return Err(ConfigError::Invalid("Model request timeout must be > 0".to_string()));
        }

        Ok(())
    }

    /// Cache sub-directory name for this model (`org/name` becomes `org--name`)
    pub fn slug(&self) -> String {
        self.name.replace('/', "--")
    }

    /// Directory holding this model's cached artifacts
    pub fn model_dir(&self) -> PathBuf {
        self.cache_dir.join(self.slug())
    }
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            name: "distilbert-base-uncased-finetuned-sst-2-english".to_string(),
            cache_dir: PathBuf::from("./model_cache"),
            backend: ModelBackend::Lexicon,
            hub_url: "https://huggingface.co".to_string(),
            inference_url: None,
            request_timeout_seconds: 30,
        }
    }
}

impl TextLimits {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_text_length == 0 {
            return Err(ConfigError::Invalid("Minimum text length must be > 0".to_string()));
        }

        if self.min_text_length > self.max_text_length {
            return Err(ConfigError::Invalid(format!(
                "Minimum text length {} exceeds maximum {}",
                self.min_text_length, self.max_text_length
            )));
        }

        if self.max_request_size == 0 {
            return Err(ConfigError::Invalid("Max request size must be > 0".to_string()));
        }

        Ok(())
    }
}

impl Default for TextLimits {
    fn default() -> Self {
        Self {
            min_text_length: 1,
            max_text_length: 1000,
            max_request_size: 1024 * 1024, // 1MB
        }
    }
}

impl ServerSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::Invalid("Port must be greater than 0".to_string()));
        }
        Ok(())
    }

    /// Address the HTTP listener binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            enable_cors: false,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "json".to_string(),
        }
    }
}
