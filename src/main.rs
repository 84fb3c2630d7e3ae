//! s3-rename-upload - relocate an uploaded file into object storage
//!
//! Runs the upload filter once over a temp file, as a web framework would
//! after receiving an upload, and prints the final target.

use clap::Parser;
use s3_rename_upload::config::{Config, TransferMode};
use s3_rename_upload::logging::init_logging;
use s3_rename_upload::request::UploadRequestContext;
use s3_rename_upload::upload::{S3RenameUpload, UploadedFile};
use std::path::PathBuf;
use tracing::info;

/// Relocate an uploaded file into an S3 bucket
#[derive(Parser, Debug)]
#[command(name = "s3-rename-upload")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// HTTP method of the originating request, case-sensitive (POST moves, PUT/PATCH copy)
    #[arg(short, long, default_value = "POST")]
    method: String,

    /// Client-supplied file name (defaults to the source file name)
    #[arg(short, long)]
    name: Option<String>,

    /// Client-supplied content type (guessed from the target extension otherwise)
    #[arg(long)]
    content_type: Option<String>,

    /// Bucket, overriding filter.bucket from the configuration
    #[arg(short, long)]
    bucket: Option<String>,

    /// Stream PUT/PATCH copies instead of buffering the whole file
    #[arg(long)]
    streaming: bool,

    /// Log level when RUST_LOG is unset (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Temporary upload file
    source: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = Config::load(&args.config)?;
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    init_logging(&config.logging)?;

    info!("Starting s3-rename-upload v{}", s3_rename_upload::VERSION);
    info!("Loaded configuration from {:?}", args.config);

    let storage = s3_rename_upload::storage_from_config(&config)?;
    let mode = if args.streaming {
        TransferMode::Streaming
    } else {
        config.transfer.mode
    };

    let mut filter = S3RenameUpload::from_config(storage, &config.filter, mode);
    if let Some(ref bucket) = args.bucket {
        filter.set_bucket(bucket);
    }
    filter.set_request(UploadRequestContext::from_method(&args.method));

    let name = match args.name {
        Some(name) => name,
        None => args
            .source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
    };
    let mut upload = UploadedFile::new(&args.source, name);
    if let Ok(metadata) = std::fs::metadata(&args.source) {
        upload = upload.with_size(metadata.len());
    }
    if let Some(content_type) = args.content_type {
        upload = upload.with_content_type(content_type);
    }

    let target = filter.filter(&upload).await?;

    if args.json {
        let output = serde_json::json!({
            "source": args.source,
            "target": target,
            "method": filter.request().map(|r| r.method().to_string()),
        });
        println!("{}", output);
    } else {
        println!("{}", target);
    }

    Ok(())
}
