//! Configuration loader

use super::{Config, ConfigError};
use std::path::Path;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse and validate configuration from YAML text
    pub fn parse(content: &str) -> Result<Config, ConfigError> {
        let config: Config = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BackendKind, TransferMode};

    #[test]
    fn test_load_minimal() {
        let yaml = r#"
storage:
  s3:
    region: "eu-west-1"
"#;
        let config = ConfigLoader::parse(yaml).unwrap();
        assert_eq!(config.storage.backend, BackendKind::S3);
        assert_eq!(config.transfer.mode, TransferMode::Buffered);
        assert!(config.filter.bucket.is_none());
        assert!(!config.filter.rename.overwrite);
    }

    #[test]
    fn test_load_rejects_invalid() {
        let yaml = r#"
storage:
  backend: local
"#;
        assert!(ConfigLoader::parse(yaml).is_err());
    }
}
