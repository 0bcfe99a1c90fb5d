//! Configuration management for the batch client.
//!
//! This module provides configuration loading with multiple sources:
//! 1. Default values (hardcoded)
//! 2. Configuration file (YAML)
//! 3. Environment variables (override)
//!
//! # Configuration Hierarchy
//!
//! Environment variables take precedence over config file values,
//! which take precedence over defaults.
//!
//! # Example
//!
//! ```ignore
//! use cedar_batch_client::config::ClientConfig;
//!
//! // Load from file with env overrides
//! let config = ClientConfig::load("cedar-batch.yaml")?;
//!
//! // Or load from environment only
//! let config = ClientConfig::from_env()?;
//! ```

use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::agent::DEFAULT_BASE_URL;
use crate::batch::{BatchOptions, DEFAULT_PARALLELISM};

/// Prefix for environment variable overrides.
const ENV_PREFIX: &str = "CEDAR_BATCH";

/// Client configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct ClientConfig {
    /// Cedar Agent connection settings
    #[serde(default)]
    pub agent: AgentSettings,

    /// Batch evaluation settings
    #[serde(default)]
    pub batch: BatchSettings,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Cedar Agent connection settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct AgentSettings {
    /// Base URL of the agent, without the `/v1/...` path
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Timeout for a single authorization call in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_request_timeout() -> u64 {
    30
}

/// Batch evaluation settings.
///
/// Environment variables use the `CEDAR_BATCH_` prefix and `__` as the nested
/// key separator:
///
/// - `CEDAR_BATCH_BATCH__PARALLELISM=8` - Number of concurrent evaluations
/// - `CEDAR_BATCH_BATCH__TIMEOUT_SECS=10` - Abort batches after 10 seconds
///
/// # Example YAML Configuration
///
/// ```yaml
/// batch:
///   parallelism: 8
///   timeout_secs: 10
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct BatchSettings {
    /// Number of workers evaluating requests concurrently.
    ///
    /// Must be at least 1; a batch with no workers could never finish.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,

    /// Optional upper bound on a whole batch in seconds.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            parallelism: default_parallelism(),
            timeout_secs: None,
        }
    }
}

impl BatchSettings {
    /// Converts the settings into per-batch options.
    pub fn to_options(&self) -> BatchOptions {
        let options = BatchOptions::new(self.parallelism);
        match self.timeout_secs {
            Some(secs) => options.with_timeout(Duration::from_secs(secs)),
            None => options,
        }
    }
}

fn default_parallelism() -> usize {
    DEFAULT_PARALLELISM
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggingSettings {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Use JSON format (true for production, false for development)
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ConfigError),

    #[error("configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

impl ClientConfig {
    /// Load configuration from a YAML file with environment variable overrides.
    ///
    /// Environment variables are prefixed with `CEDAR_BATCH_` and use `__` as
    /// separator. For example:
    /// - `CEDAR_BATCH_AGENT__BASE_URL=http://agent:8180` overrides `agent.base_url`
    /// - `CEDAR_BATCH_BATCH__PARALLELISM=8` overrides `batch.parallelism`
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigLoadError::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let config = Config::builder()
            .add_source(Config::try_from(&ClientConfig::default())?)
            .add_source(File::from(path).format(FileFormat::Yaml))
            .add_source(env_source())
            .build()?;

        let client_config: ClientConfig = config.try_deserialize()?;
        client_config.validate()?;

        Ok(client_config)
    }

    /// Load configuration from environment variables only.
    pub fn from_env() -> Result<Self, ConfigLoadError> {
        let config = Config::builder()
            .add_source(Config::try_from(&ClientConfig::default())?)
            .add_source(env_source())
            .build()?;

        let client_config: ClientConfig = config.try_deserialize()?;
        client_config.validate()?;

        Ok(client_config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        let base_url = self.agent.base_url.trim();
        if base_url.is_empty() {
            return Err(ConfigLoadError::Invalid {
                message: "agent.base_url cannot be empty".to_string(),
            });
        }
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigLoadError::Invalid {
                message: format!(
                    "agent.base_url must start with http:// or https://, got: {base_url}"
                ),
            });
        }

        if self.agent.request_timeout_secs == 0 {
            return Err(ConfigLoadError::Invalid {
                message: "agent.request_timeout_secs must be greater than 0".to_string(),
            });
        }

        if self.batch.parallelism == 0 {
            return Err(ConfigLoadError::Invalid {
                message: "batch.parallelism must be at least 1".to_string(),
            });
        }

        if self.batch.timeout_secs == Some(0) {
            return Err(ConfigLoadError::Invalid {
                message: "batch.timeout_secs must be greater than 0 when set".to_string(),
            });
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigLoadError::Invalid {
                message: format!(
                    "logging.level must be one of: {:?}, got: {}",
                    valid_levels, self.logging.level
                ),
            });
        }

        Ok(())
    }
}

// Use __ as separator for nested keys: CEDAR_BATCH_BATCH__PARALLELISM -> batch.parallelism
fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Test: Can load config from YAML file
    #[test]
    #[serial]
    fn test_can_load_config_from_yaml_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
agent:
  base_url: "http://cedar-agent:8180"
  request_timeout_secs: 5

batch:
  parallelism: 8
  timeout_secs: 20

logging:
  level: debug
  json: true
"#
        )
        .unwrap();

        let config = ClientConfig::load(file.path()).unwrap();

        assert_eq!(config.agent.base_url, "http://cedar-agent:8180");
        assert_eq!(config.agent.request_timeout_secs, 5);
        assert_eq!(config.batch.parallelism, 8);
        assert_eq!(config.batch.timeout_secs, Some(20));
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
    }

    /// Test: Can override config with env vars
    #[test]
    #[serial]
    fn test_can_override_config_with_env_vars() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
agent:
  base_url: "http://127.0.0.1:8180"

batch:
  parallelism: 2
"#
        )
        .unwrap();

        std::env::set_var("CEDAR_BATCH_BATCH__PARALLELISM", "12");
        std::env::set_var("CEDAR_BATCH_LOGGING__LEVEL", "warn");

        let config = ClientConfig::load(file.path());

        std::env::remove_var("CEDAR_BATCH_BATCH__PARALLELISM");
        std::env::remove_var("CEDAR_BATCH_LOGGING__LEVEL");

        let config = config.unwrap();
        assert_eq!(config.batch.parallelism, 12); // Overridden by env
        assert_eq!(config.agent.base_url, "http://127.0.0.1:8180"); // From file
        assert_eq!(config.logging.level, "warn"); // Overridden by env
    }

    /// Test: from_env loads defaults with env overrides
    #[test]
    #[serial]
    fn test_from_env_loads_defaults_with_env_overrides() {
        std::env::set_var("CEDAR_BATCH_AGENT__BASE_URL", "http://10.0.0.7:8180");

        let config = ClientConfig::from_env();

        std::env::remove_var("CEDAR_BATCH_AGENT__BASE_URL");

        let config = config.unwrap();
        assert_eq!(config.agent.base_url, "http://10.0.0.7:8180");
        assert_eq!(config.batch.parallelism, DEFAULT_PARALLELISM); // default
    }

    /// Test: Default config is valid
    #[test]
    fn test_default_config_is_valid() {
        let config = ClientConfig::default();
        assert!(config.validate().is_ok());

        assert_eq!(config.agent.base_url, "http://localhost:8180");
        assert_eq!(config.agent.request_timeout_secs, 30);
        assert_eq!(config.batch.parallelism, 3);
        assert_eq!(config.batch.timeout_secs, None);
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json);
    }

    /// Test: Config validation catches errors
    #[test]
    fn test_config_validation_catches_errors() {
        let cases: Vec<(fn(&mut ClientConfig), &str)> = vec![
            (|c| c.batch.parallelism = 0, "batch.parallelism"),
            (|c| c.batch.timeout_secs = Some(0), "batch.timeout_secs"),
            (|c| c.agent.base_url = "   ".to_string(), "agent.base_url"),
            (
                |c| c.agent.base_url = "localhost:8180".to_string(),
                "agent.base_url",
            ),
            (
                |c| c.agent.request_timeout_secs = 0,
                "agent.request_timeout_secs",
            ),
            (|c| c.logging.level = "loud".to_string(), "logging.level"),
        ];

        for (mutate, field) in cases {
            let mut config = ClientConfig::default();
            mutate(&mut config);
            let err = config.validate().unwrap_err();
            assert!(
                err.to_string().contains(field),
                "error for {field} should name the field, got: {err}"
            );
        }
    }

    /// Test: Invalid config returns clear error
    #[test]
    fn test_invalid_config_returns_clear_error() {
        let result = ClientConfig::load("/nonexistent/path/cedar-batch.yaml");
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigLoadError::FileNotFound { .. }));
        assert!(err.to_string().contains("not found"));

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "invalid: yaml: syntax: [").unwrap();

        let err = ClientConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigLoadError::Load(_)));
    }

    #[test]
    fn test_batch_settings_convert_to_options() {
        let settings = BatchSettings {
            parallelism: 5,
            timeout_secs: Some(7),
        };

        let options = settings.to_options();

        assert_eq!(options.parallelism, 5);
        assert_eq!(options.timeout, Some(Duration::from_secs(7)));
        assert!(options.cancel.is_none());
        assert_eq!(BatchSettings::default().to_options().timeout, None);
    }
}
