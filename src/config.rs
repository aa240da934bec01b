//! Configuration management for stackscan
//!
//! All configuration is loaded from `./config/stackscan.toml` when present;
//! otherwise the embedded default template is used. No hardcoded defaults
//! exist in source code outside the template.

use serde::Deserialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration file path relative to working directory
pub const CONFIG_PATH: &str = "./config/stackscan.toml";

/// Default configuration file content - this is the ONLY place defaults exist
pub const DEFAULT_CONFIG: &str = include_str!("../config/stackscan.toml");

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] io::Error),

    #[error("Failed to parse configuration file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Configuration field '{field}' cannot be empty or zero")]
    EmptyRequired { field: String },

    #[error("Unknown batch mode '{0}' (expected 'chunked' or 'concurrent')")]
    UnknownMode(String),
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub retry: RetryConfig,
    pub batch: BatchConfig,
}

/// HTTP client configuration for the fingerprinting collaborator
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub user_agent: String,
    pub request_timeout_secs: u64,
}

impl HttpConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Retry policy for transient connection failures
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per domain (not retries-after-first)
    pub max_attempts: u32,
    /// Fixed delay between attempts, in seconds
    pub delay_secs: u64,
}

impl RetryConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }
}

/// Scheduling mode for the batch driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchMode {
    /// Sequential fixed-size chunks; rows land in strict input order
    Chunked,
    /// Bounded worker pool; rows land in completion order
    Concurrent,
}

impl std::str::FromStr for BatchMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chunked" => Ok(BatchMode::Chunked),
            "concurrent" => Ok(BatchMode::Concurrent),
            other => Err(ConfigError::UnknownMode(other.to_string())),
        }
    }
}

/// Batch driver configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BatchConfig {
    pub mode: BatchMode,
    pub chunk_size: usize,
    pub concurrency: usize,
    /// Technology Stack value recorded when a domain could not be scanned
    pub not_found_label: String,
}

impl AppConfig {
    /// Load configuration from the default path, falling back to the
    /// embedded template when no config file exists.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Path::new(CONFIG_PATH);
        if path.exists() {
            Self::load_from_path(path)
        } else {
            let config: AppConfig = toml::from_str(DEFAULT_CONFIG)?;
            config.validate()?;
            Ok(config)
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.http.user_agent.is_empty() {
            return Err(ConfigError::EmptyRequired {
                field: "http.user_agent".to_string(),
            });
        }
        if self.http.request_timeout_secs == 0 {
            return Err(ConfigError::EmptyRequired {
                field: "http.request_timeout_secs".to_string(),
            });
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::EmptyRequired {
                field: "retry.max_attempts".to_string(),
            });
        }
        if self.batch.chunk_size == 0 {
            return Err(ConfigError::EmptyRequired {
                field: "batch.chunk_size".to_string(),
            });
        }
        if self.batch.concurrency == 0 {
            return Err(ConfigError::EmptyRequired {
                field: "batch.concurrency".to_string(),
            });
        }
        Ok(())
    }

    /// Create default configuration file at the standard location
    pub fn create_default_config() -> Result<PathBuf, ConfigError> {
        let path = Path::new(CONFIG_PATH);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = fs::File::create(path)?;
        file.write_all(DEFAULT_CONFIG.as_bytes())?;

        Ok(path.to_path_buf())
    }
}
