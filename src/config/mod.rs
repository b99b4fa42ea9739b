use serde::Deserialize;
use std::path::{Path, PathBuf};
use config::{Config, ConfigError, Environment, File};

/// Where the model comes from
#[derive(Debug, Deserialize, Clone)]
pub struct ModelsConfig {
    /// Root directory holding the `Models/` and `Frontend/` resource folders
    pub resource_dir: PathBuf,
    /// Logical registry name of the classification model
    #[serde(default = "default_model_name")]
    pub model: String,
}

fn default_model_name() -> String {
    "models.stool".to_string()
}

/// Remote blob store the model is fetched from when it is not shipped locally
#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// Base URL of the store
    pub base_url: String,
    /// Key sent in the `X-API-Key` header
    pub api_key: String,
    /// Local directory downloaded resources are cached in
    pub cache_dir: PathBuf,
}

/// ONNX Runtime session settings
#[derive(Debug, Deserialize, Clone)]
pub struct InferenceConfig {
    /// Number of sessions built from the single loaded model
    #[serde(default = "default_pool_size")]
    pub session_pool_size: usize,
    /// Intra-op threads per session
    #[serde(default = "default_intra_threads")]
    pub intra_threads: usize,
}

fn default_pool_size() -> usize {
    2
}

fn default_intra_threads() -> usize {
    1
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            session_pool_size: default_pool_size(),
            intra_threads: default_intra_threads(),
        }
    }
}

/// Configuration for the HTTP server
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,
    /// Port number to listen on
    pub port: u16,
    /// Load the model at startup instead of on the first request
    #[serde(default)]
    pub preload_model: bool,
    /// Largest accepted request body
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    /// Fixed base URL substituted into the frontend. When unset it is built
    /// from the forwarding headers of each request.
    #[serde(default)]
    pub public_url: Option<String>,
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

/// Configuration for application logging
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Directory for daily rolling log files; stderr when unset
    #[serde(default)]
    pub directory: Option<PathBuf>,
    /// Emit JSON lines instead of the human-readable format
    #[serde(default)]
    pub json: bool,
}

/// Main settings struct that contains all configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub models: ModelsConfig,
    #[serde(default)]
    pub store: Option<StoreConfig>,
    #[serde(default)]
    pub inference: InferenceConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

const MIN_API_KEY_LEN: usize = 20;
const MIN_BASE_URL_LEN: usize = 10;

impl Settings {
    /// Loads settings from `config_dir` in the following order of precedence
    /// (highest to lowest):
    /// 1. Environment variables prefixed with `STOOLAI_` (`__` between nested keys)
    /// 2. Local config file (local.toml) if present
    /// 3. Default config file (default.toml)
    pub fn from_dir(config_dir: &Path) -> Result<Self, ConfigError> {
        if !config_dir.exists() {
            return Err(ConfigError::Message(
                format!("Config directory not found at: {}", config_dir.display())
            ));
        }

        let default_config = config_dir.join("default.toml");
        if !default_config.exists() {
            return Err(ConfigError::Message(
                format!("Default configuration file not found at: {}", default_config.display())
            ));
        }
        let local_config = config_dir.join("local.toml");

        let settings = Config::builder()
            .add_source(File::from(default_config))
            .add_source(File::from(local_config).required(false))
            .add_source(
                Environment::with_prefix("STOOLAI")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize::<Settings>()?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Message(
                "Port must be between 1 and 65535, got: 0".to_string()
            ));
        }

        if self.server.max_upload_bytes == 0 {
            return Err(ConfigError::Message(
                "max_upload_bytes must be greater than 0".to_string()
            ));
        }

        if self.inference.session_pool_size == 0 {
            return Err(ConfigError::Message(
                "session_pool_size must be greater than 0".to_string()
            ));
        }

        if self.inference.intra_threads == 0 {
            return Err(ConfigError::Message(
                "intra_threads must be greater than 0".to_string()
            ));
        }

        if let Some(store) = &self.store {
            if store.api_key.len() < MIN_API_KEY_LEN {
                return Err(ConfigError::Message(format!(
                    "store.api_key must be at least {} characters", MIN_API_KEY_LEN
                )));
            }
            if store.base_url.len() < MIN_BASE_URL_LEN {
                return Err(ConfigError::Message(format!(
                    "store.base_url must be at least {} characters, got: {}",
                    MIN_BASE_URL_LEN, store.base_url
                )));
            }
        }

        match self.logging.level.to_lowercase().as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => Ok(()),
            _ => Err(ConfigError::Message(format!(
                "Invalid logging level: {}. Must be one of: error, warn, info, debug, trace",
                self.logging.level
            ))),
        }?;

        if let Some(dir) = &self.logging.directory {
            if !dir.exists() {
                std::fs::create_dir_all(dir).map_err(|e| {
                    ConfigError::Message(format!(
                        "Failed to create log directory at {}: {}",
                        dir.display(), e
                    ))
                })?;
            }
        }

        Ok(())
    }

    /// Directories searched for registered resources.
    pub fn resource_roots(&self) -> Vec<PathBuf> {
        let mut roots = vec![self.models.resource_dir.clone()];
        if let Some(store) = &self.store {
            roots.push(store.cache_dir.clone());
        }
        roots
    }
}
