//! Loading configuration from files and strings

use std::path::Path;

use thiserror::Error;
use tracing::debug;

use crate::config::KinshipConfig;

/// Errors raised while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading the file failed
    #[error("Failed to read config file {path}: {source}")]
    Io {
        /// Path that was being read
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The file extension maps to no supported (or enabled) format
    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),

    /// The content did not parse
    #[error("Failed to parse {format} config: {message}")]
    Parse {
        /// Format that was being parsed
        format: &'static str,
        /// Parser message
        message: String,
    },

    /// The configuration parsed but holds an unusable value
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Loads [`KinshipConfig`] from disk or memory
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate a configuration file.
    ///
    /// The format is chosen by extension: `.toml`, `.yaml`/`.yml` or `.json`.
    pub async fn load_from_file(path: impl AsRef<Path>) -> ConfigResult<KinshipConfig> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.display().to_string(),
                source,
            })?;

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        debug!("Loading {} config from {}", extension, path.display());

        let config = match extension.as_str() {
            "toml" => Self::from_toml_str(&content)?,
            "yaml" | "yml" => Self::from_yaml_str(&content)?,
            "json" => Self::from_json_str(&content)?,
            other => return Err(ConfigError::UnsupportedFormat(other.to_string())),
        };

        Ok(config)
    }

    /// Parse and validate TOML content
    #[cfg(feature = "toml")]
    pub fn from_toml_str(content: &str) -> ConfigResult<KinshipConfig> {
        let config: KinshipConfig = toml::from_str(content).map_err(|e| ConfigError::Parse {
            format: "TOML",
            message: e.to_string(),
        })?;
        validate(&config)?;
        Ok(config)
    }

    /// TOML support is compiled out
    #[cfg(not(feature = "toml"))]
    pub fn from_toml_str(_content: &str) -> ConfigResult<KinshipConfig> {
        Err(ConfigError::UnsupportedFormat("toml".to_string()))
    }

    /// Parse and validate YAML content
    #[cfg(feature = "yaml")]
    pub fn from_yaml_str(content: &str) -> ConfigResult<KinshipConfig> {
        let config: KinshipConfig =
            serde_yaml::from_str(content).map_err(|e| ConfigError::Parse {
                format: "YAML",
                message: e.to_string(),
            })?;
        validate(&config)?;
        Ok(config)
    }

    /// YAML support is compiled out
    #[cfg(not(feature = "yaml"))]
    pub fn from_yaml_str(_content: &str) -> ConfigResult<KinshipConfig> {
        Err(ConfigError::UnsupportedFormat("yaml".to_string()))
    }

    /// Parse and validate JSON content
    pub fn from_json_str(content: &str) -> ConfigResult<KinshipConfig> {
        let config: KinshipConfig =
            serde_json::from_str(content).map_err(|e| ConfigError::Parse {
                format: "JSON",
                message: e.to_string(),
            })?;
        validate(&config)?;
        Ok(config)
    }
}

/// Reject values the engine cannot run with
pub fn validate(config: &KinshipConfig) -> ConfigResult<()> {
    let cache = &config.cache;
    if cache.snapshot_ttl_secs == 0 || cache.gateway_ttl_secs == 0 || cache.journal_ttl_secs == 0
    {
        return Err(ConfigError::Invalid(
            "cache TTLs must be greater than zero".to_string(),
        ));
    }
    if cache.sweep_interval_secs == 0 {
        return Err(ConfigError::Invalid(
            "cache.sweep_interval_secs must be greater than zero".to_string(),
        ));
    }
    if config.breadcrumb.max_attempts == 0 {
        return Err(ConfigError::Invalid(
            "breadcrumb.max_attempts must be at least 1".to_string(),
        ));
    }
    Ok(())
}
