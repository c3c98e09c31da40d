//! Application settings and configuration management

use crate::error::{AppError, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub dispatcher: DispatcherConfig,
    #[serde(default)]
    pub node: NodeConfig,
}

/// Listener configuration, shared by both processes
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

/// Dispatcher configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DispatcherConfig {
    /// Base URLs of the prediction nodes, in round-robin order
    #[serde(default)]
    pub backends: Vec<String>,
    /// Upper bound on a single relayed exchange. Unbounded when unset.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    #[serde(default)]
    pub health_check: HealthCheckConfig,
}

fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            backends: vec![],
            timeout_ms: None,
            max_body_bytes: default_max_body_bytes(),
            health_check: HealthCheckConfig::default(),
        }
    }
}

/// Liveness probe configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HealthCheckConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_health_check_path")]
    pub path: String,
    #[serde(default = "default_health_check_interval")]
    pub interval_secs: u64,
    #[serde(default = "default_health_check_timeout")]
    pub timeout_ms: u64,
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    #[serde(default = "default_recovery_threshold")]
    pub recovery_threshold: u32,
}

fn default_health_check_path() -> String {
    "/health".to_string()
}

fn default_health_check_interval() -> u64 {
    30
}

fn default_health_check_timeout() -> u64 {
    2000
}

fn default_failure_threshold() -> u32 {
    3
}

fn default_recovery_threshold() -> u32 {
    2
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_health_check_path(),
            interval_secs: default_health_check_interval(),
            timeout_ms: default_health_check_timeout(),
            failure_threshold: default_failure_threshold(),
            recovery_threshold: default_recovery_threshold(),
        }
    }
}

/// Prediction node configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NodeConfig {
    #[serde(default)]
    pub dataset: DatasetConfig,
    #[serde(default = "default_index_path")]
    pub index_path: String,
    /// Port for the raw JSON socket. Disabled when unset.
    #[serde(default)]
    pub socket_port: Option<u16>,
}

fn default_index_path() -> String {
    "static/index.html".to_string()
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            dataset: DatasetConfig::default(),
            index_path: default_index_path(),
            socket_port: None,
        }
    }
}

/// Where the reference dataset is loaded from. `url` wins over `path`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DatasetConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
}

/// Prefix of environment overrides
pub const ENV_PREFIX: &str = "PRICE_SERVING";

impl Settings {
    /// Load settings from the path in `PRICE_SERVING_CONFIG`, or `fallback`
    pub fn load(fallback: &str) -> Result<Self> {
        let path = std::env::var("PRICE_SERVING_CONFIG").unwrap_or_else(|_| fallback.to_string());
        Self::load_from_path(path)
    }

    /// Load settings from a specific configuration file path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_with_env_prefix(path, ENV_PREFIX)
    }

    /// Same as [`Settings::load_from_path`], overriding from `<prefix>__*` variables
    pub fn load_with_env_prefix<P: AsRef<Path>>(path: P, prefix: &str) -> Result<Self> {
        let path = path.as_ref().to_str().ok_or_else(|| {
            AppError::Config(config::ConfigError::Message(
                "Configuration path is not valid UTF-8".to_string(),
            ))
        })?;

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", default_host())?
            .set_default("server.port", i64::from(default_port()))?
            .set_default("logging.level", default_log_level())?
            .set_default("logging.format", default_log_format())?
            // Load from configuration file
            .add_source(File::with_name(path).required(false))
            // Override with environment variables, e.g. PRICE_SERVING__SERVER__PORT
            .add_source(
                Environment::with_prefix(prefix)
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("dispatcher.backends")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        Ok(settings)
    }

    /// Validate the settings shared by both processes
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(AppError::Config(config::ConfigError::Message(
                "Server port cannot be 0".to_string(),
            )));
        }

        Ok(())
    }

    /// Validate the settings the dispatcher needs before it can serve
    pub fn validate_dispatcher(&self) -> Result<()> {
        self.validate()?;

        if self.dispatcher.backends.is_empty() {
            return Err(AppError::Config(config::ConfigError::Message(
                "Dispatcher needs at least one backend".to_string(),
            )));
        }

        for address in &self.dispatcher.backends {
            crate::gateway::backend::parse_backend_url(address)?;
        }

        let health = &self.dispatcher.health_check;
        if health.enabled && (health.interval_secs == 0 || health.failure_threshold == 0) {
            return Err(AppError::Config(config::ConfigError::Message(
                "Health check interval and failure threshold must be positive".to_string(),
            )));
        }

        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
            },
            logging: LoggingConfig {
                level: default_log_level(),
                format: default_log_format(),
            },
            dispatcher: DispatcherConfig::default(),
            node: NodeConfig::default(),
        }
    }
}
