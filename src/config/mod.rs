//! Configuration module for the S3 rename-upload filter
//!
//! Handles loading and parsing of YAML configuration files with support for
//! environment variable expansion and validation.
//!
//! # Example
//!
//! ```yaml
//! storage:
//!   backend: s3
//!   s3:
//!     region: "us-east-1"
//!     endpoint: "${S3_ENDPOINT:-http://localhost:9000}"
//!     access_key: "${AWS_ACCESS_KEY_ID}"
//!     secret_key: "${AWS_SECRET_ACCESS_KEY}"
//!
//! filter:
//!   bucket: "/user-uploads/"
//!   target: "avatars/"
//!   use_upload_extension: true
//!   randomize: true
//!
//! transfer:
//!   mode: streaming
//! ```

use crate::upload::rename::RenameOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

// ============================================================================
// Environment Variable Expansion
// ============================================================================

/// Expand environment variables in a string.
///
/// Supports two syntaxes:
/// - `${VAR_NAME}` - Simple expansion, keeps placeholder if var not found
/// - `${VAR_NAME:-default}` - Expansion with default value
///
/// Variable names must start with an uppercase letter or underscore and
/// contain only uppercase letters, digits, and underscores.
pub(crate) fn expand_env_vars(s: &str) -> String {
    let re = match regex_lite::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(?::-([^}]+))?\}") {
        Ok(re) => re,
        Err(_) => return s.to_string(),
    };
    let mut last_match = 0;
    let mut result = String::with_capacity(s.len());

    for cap in re.captures_iter(s) {
        let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
            continue;
        };

        result.push_str(&s[last_match..full_match.start()]);

        let value = match std::env::var(var_name.as_str()) {
            Ok(val) => val,
            Err(_) => match cap.get(2) {
                Some(default) => default.as_str().to_string(),
                // No env var and no default. Leave the placeholder as is.
                None => full_match.as_str().to_string(),
            },
        };
        result.push_str(&value);

        last_match = full_match.end();
    }

    result.push_str(&s[last_match..]);

    result
}

/// Deserialize a string with environment variable expansion.
fn deserialize_with_env<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::de::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Ok(expand_env_vars(&s))
}

/// Deserialize an optional string with environment variable expansion.
///
/// A value that still holds an unexpanded `${VAR}` placeholder, or expands to
/// an empty string, is treated as absent.
fn deserialize_opt_with_env<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::de::Deserializer<'de>,
{
    let s = Option::<String>::deserialize(deserializer)?;
    Ok(s.map(|s| expand_env_vars(&s))
        .filter(|s| !s.is_empty() && !s.contains("${")))
}

// ============================================================================
// Validation Helpers
// ============================================================================

/// Validate that a URL starts with http:// or https://
fn is_valid_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub storage: StorageConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub transfer: TransferConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        ConfigLoader::load(path)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.storage.backend {
            BackendKind::S3 => {
                let s3 = self.storage.s3.as_ref().ok_or_else(|| {
                    ConfigError::ValidationError(
                        "storage.backend is 's3' but no storage.s3 section is present".into(),
                    )
                })?;

                if s3.region.trim().is_empty() {
                    return Err(ConfigError::ValidationError(
                        "storage.s3.region cannot be empty".into(),
                    ));
                }

                if let Some(ref endpoint) = s3.endpoint {
                    if !is_valid_http_url(endpoint) {
                        return Err(ConfigError::ValidationError(format!(
                            "Invalid S3 endpoint '{}': must start with http:// or https://",
                            endpoint
                        )));
                    }
                }

                if s3.access_key.is_some() != s3.secret_key.is_some() {
                    return Err(ConfigError::ValidationError(
                        "storage.s3.access_key and storage.s3.secret_key must be set together"
                            .into(),
                    ));
                }
            }
            BackendKind::Local => {
                if self.storage.local.is_none() {
                    return Err(ConfigError::ValidationError(
                        "storage.backend is 'local' but no storage.local section is present"
                            .into(),
                    ));
                }
            }
        }

        if let Some(ref bucket) = self.filter.bucket {
            if bucket.trim_matches('/').is_empty() {
                return Err(ConfigError::ValidationError(
                    "filter.bucket cannot be empty".into(),
                ));
            }
        }

        Ok(())
    }
}

/// Storage backend selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    S3,
    Local,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: BackendKind,
    #[serde(default)]
    pub s3: Option<S3Config>,
    #[serde(default)]
    pub local: Option<LocalConfig>,
}

/// S3 backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Config {
    #[serde(deserialize_with = "deserialize_with_env")]
    pub region: String,
    #[serde(default, deserialize_with = "deserialize_opt_with_env")]
    pub endpoint: Option<String>,
    #[serde(default, deserialize_with = "deserialize_opt_with_env")]
    pub access_key: Option<String>,
    #[serde(default, deserialize_with = "deserialize_opt_with_env")]
    pub secret_key: Option<String>,
    #[serde(default, deserialize_with = "deserialize_opt_with_env")]
    pub session_token: Option<String>,
    /// Per-request timeout. Default: none
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

/// Local filesystem backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalConfig {
    pub root: PathBuf,
}

/// Upload filter options
///
/// `bucket` belongs to the relocator, everything else to the target namer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterConfig {
    #[serde(default)]
    pub bucket: Option<String>,
    #[serde(flatten)]
    pub rename: RenameOptions,
}

/// How PUT/PATCH uploads are copied to storage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferMode {
    /// Read the whole file into memory, then write it out
    #[default]
    Buffered,
    /// Stream the file to storage without buffering it entirely
    Streaming,
}

/// Transfer configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransferConfig {
    #[serde(default)]
    pub mode: TransferMode,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level when RUST_LOG is unset. Default: "info"
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output. Default: false
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
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
