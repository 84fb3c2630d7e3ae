//! S3 Credentials Module
//!
//! Resolves the access keys used to sign S3 requests.
//!
//! Keys set in the `storage.s3` configuration section win. When they are
//! absent, the standard AWS environment variables are consulted.
//!
//! # Example
//!
//! ```
//! use s3_rename_upload::s3::Credentials;
//!
//! let creds = Credentials::new("access-key", "secret-key");
//! assert_eq!(creds.access_key_id(), "access-key");
//! assert_eq!(creds.secret_access_key(), "secret-key");
//! ```

use crate::config::S3Config;
use thiserror::Error;

/// Credential loading errors
#[derive(Error, Debug)]
pub enum CredentialsError {
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),
}

/// Credentials for AWS authentication
#[derive(Clone)]
pub struct Credentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
}

impl Credentials {
    /// Create new credentials
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
        }
    }

    /// Create credentials with session token (for temporary credentials)
    pub fn with_session_token(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: impl Into<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: Some(session_token.into()),
        }
    }

    /// Get the access key ID
    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    /// Get the secret access key
    pub fn secret_access_key(&self) -> &str {
        &self.secret_access_key
    }

    /// Get the session token (if any)
    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }
}

// Keep secrets out of logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "** redacted **"),
            )
            .finish()
    }
}

/// Factory methods for loading credentials
pub struct CredentialsProvider;

impl CredentialsProvider {
    /// Load credentials from environment variables
    ///
    /// Looks for:
    /// - `AWS_ACCESS_KEY_ID`
    /// - `AWS_SECRET_ACCESS_KEY`
    /// - `AWS_SESSION_TOKEN` (optional)
    pub fn from_env() -> Result<Credentials, CredentialsError> {
        let access_key = std::env::var("AWS_ACCESS_KEY_ID").map_err(|_| {
            CredentialsError::MissingCredentials("AWS_ACCESS_KEY_ID not set".into())
        })?;

        let secret_key = std::env::var("AWS_SECRET_ACCESS_KEY").map_err(|_| {
            CredentialsError::MissingCredentials("AWS_SECRET_ACCESS_KEY not set".into())
        })?;

        let session_token = std::env::var("AWS_SESSION_TOKEN").ok();

        Ok(match session_token {
            Some(token) => Credentials::with_session_token(access_key, secret_key, token),
            None => Credentials::new(access_key, secret_key),
        })
    }

    /// Load credentials from S3Config
    ///
    /// Uses the `access_key`, `secret_key` and `session_token` fields.
    pub fn from_config(config: &S3Config) -> Result<Credentials, CredentialsError> {
        let access_key = config.access_key.as_ref().ok_or_else(|| {
            CredentialsError::MissingCredentials("access_key not set in config".into())
        })?;

        let secret_key = config.secret_key.as_ref().ok_or_else(|| {
            CredentialsError::MissingCredentials("secret_key not set in config".into())
        })?;

        Ok(match config.session_token {
            Some(ref token) => {
                Credentials::with_session_token(access_key.clone(), secret_key.clone(), token)
            }
            None => Credentials::new(access_key.clone(), secret_key.clone()),
        })
    }

    /// Config keys when both are present, environment otherwise
    pub fn resolve(config: &S3Config) -> Result<Credentials, CredentialsError> {
        if config.access_key.is_some() && config.secret_key.is_some() {
            Self::from_config(config)
        } else {
            tracing::debug!("No keys in storage.s3, loading credentials from environment");
            Self::from_env()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn s3_config(access_key: Option<&str>, secret_key: Option<&str>) -> S3Config {
        S3Config {
            region: "us-east-1".into(),
            endpoint: None,
            access_key: access_key.map(String::from),
            secret_key: secret_key.map(String::from),
            session_token: None,
            timeout_seconds: None,
        }
    }

    #[test]
    fn test_credentials_with_session_token() {
        let creds = Credentials::with_session_token("access", "secret", "token");
        assert_eq!(creds.access_key_id(), "access");
        assert_eq!(creds.secret_access_key(), "secret");
        assert_eq!(creds.session_token(), Some("token"));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let creds = Credentials::new("access", "very-secret");
        let printed = format!("{:?}", creds);
        assert!(printed.contains("access"));
        assert!(!printed.contains("very-secret"));
    }

    #[test]
    fn test_from_config_missing_secret_key() {
        let config = s3_config(Some("access"), None);
        assert!(CredentialsProvider::from_config(&config).is_err());
    }

    #[test]
    fn test_from_config_success() {
        let config = s3_config(Some("config-access"), Some("config-secret"));
        let creds = CredentialsProvider::from_config(&config).unwrap();
        assert_eq!(creds.access_key_id(), "config-access");
        assert_eq!(creds.secret_access_key(), "config-secret");
    }

    #[test]
    #[serial]
    fn test_resolve_falls_back_to_env() {
        std::env::set_var("AWS_ACCESS_KEY_ID", "env-access");
        std::env::set_var("AWS_SECRET_ACCESS_KEY", "env-secret");
        std::env::remove_var("AWS_SESSION_TOKEN");

        let creds = CredentialsProvider::resolve(&s3_config(None, None)).unwrap();
        assert_eq!(creds.access_key_id(), "env-access");
        assert!(creds.session_token().is_none());

        let creds =
            CredentialsProvider::resolve(&s3_config(Some("cfg-access"), Some("cfg-secret")))
                .unwrap();
        assert_eq!(creds.access_key_id(), "cfg-access");

        std::env::remove_var("AWS_ACCESS_KEY_ID");
        std::env::remove_var("AWS_SECRET_ACCESS_KEY");
    }

    #[test]
    #[serial]
    fn test_from_env_missing() {
        std::env::remove_var("AWS_ACCESS_KEY_ID");
        std::env::remove_var("AWS_SECRET_ACCESS_KEY");
        assert!(matches!(
            CredentialsProvider::from_env(),
            Err(CredentialsError::MissingCredentials(_))
        ));
    }
}
