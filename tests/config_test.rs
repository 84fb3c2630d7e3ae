//! Configuration parsing tests

use s3_rename_upload::config::{BackendKind, Config, ConfigLoader, TransferMode};
use serial_test::serial;
use std::io::Write;

#[test]
fn test_parse_full_config() {
    let yaml = r#"
storage:
  backend: s3
  s3:
    region: "eu-central-1"
    endpoint: "http://localhost:9000"
    access_key: "minio"
    secret_key: "minio-secret"
    timeout_seconds: 30

filter:
  bucket: "/user-uploads/"
  target: "avatars/"
  use_upload_name: false
  use_upload_extension: true
  overwrite: true
  randomize: true

transfer:
  mode: streaming

logging:
  level: "debug"
  json: true
"#;

    let config: Config = serde_yaml::from_str(yaml).expect("Failed to parse YAML");
    config.validate().unwrap();

    assert_eq!(config.storage.backend, BackendKind::S3);
    let s3 = config.storage.s3.as_ref().unwrap();
    assert_eq!(s3.region, "eu-central-1");
    assert_eq!(s3.endpoint.as_deref(), Some("http://localhost:9000"));
    assert_eq!(s3.timeout_seconds, Some(30));

    assert_eq!(config.filter.bucket.as_deref(), Some("/user-uploads/"));
    assert_eq!(config.filter.rename.target.as_deref(), Some("avatars/"));
    assert!(!config.filter.rename.use_upload_name);
    assert!(config.filter.rename.use_upload_extension);
    assert!(config.filter.rename.overwrite);
    assert!(config.filter.rename.randomize);

    assert_eq!(config.transfer.mode, TransferMode::Streaming);
    assert_eq!(config.logging.level, "debug");
    assert!(config.logging.json);
}

#[test]
fn test_parse_local_backend() {
    let yaml = r#"
storage:
  backend: local
  local:
    root: "/var/lib/uploads"
filter:
  bucket: "media"
"#;

    let config = ConfigLoader::parse(yaml).unwrap();
    assert_eq!(config.storage.backend, BackendKind::Local);
    assert_eq!(
        config.storage.local.unwrap().root.to_str(),
        Some("/var/lib/uploads")
    );
}

#[test]
fn test_unknown_transfer_mode_rejected() {
    let yaml = r#"
storage:
  s3:
    region: "us-east-1"
transfer:
  mode: carrier-pigeon
"#;

    assert!(ConfigLoader::parse(yaml).is_err());
}

#[test]
#[serial]
fn test_env_expansion_in_s3_section() {
    std::env::set_var("S3RU_TEST_ENDPOINT", "http://minio:9000");
    std::env::set_var("S3RU_TEST_SECRET", "from-env");
    std::env::remove_var("S3RU_TEST_MISSING");

    let yaml = r#"
storage:
  s3:
    region: "${S3RU_TEST_REGION:-us-west-2}"
    endpoint: "${S3RU_TEST_ENDPOINT}"
    access_key: "access"
    secret_key: "${S3RU_TEST_SECRET}"
    session_token: "${S3RU_TEST_MISSING}"
"#;

    let config = ConfigLoader::parse(yaml).unwrap();
    let s3 = config.storage.s3.unwrap();
    assert_eq!(s3.region, "us-west-2");
    assert_eq!(s3.endpoint.as_deref(), Some("http://minio:9000"));
    assert_eq!(s3.secret_key.as_deref(), Some("from-env"));
    assert!(s3.session_token.is_none());

    std::env::remove_var("S3RU_TEST_ENDPOINT");
    std::env::remove_var("S3RU_TEST_SECRET");
}

#[test]
fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "storage:\n  backend: local\n  local:\n    root: /tmp/objects\nfilter:\n  bucket: media"
    )
    .unwrap();

    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.filter.bucket.as_deref(), Some("media"));
}

#[test]
fn test_load_missing_file() {
    assert!(Config::load("/nonexistent/config.yaml").is_err());
}
