/*!
 * Orbit S3 Stream CLI
 *
 * Streams a file or stdin into a single S3 object.
 */

use clap::{Parser, ValueEnum};
use orbit_s3_stream::{
    config::{LogLevel, StreamConfig},
    error::{OrbitError, Result, EXIT_SUCCESS},
    logging,
    protocol::s3::{MultipartObjectWriter, S3Client, WriterOptions},
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{info, warn};

/// Bytes read from the input per write call
const READ_CHUNK_SIZE: usize = 64 * 1024;

#[derive(Parser)]
#[command(name = "orbit-s3-stream")]
#[command(version, about = "Stream a file or stdin into a single S3 object", long_about = None)]
struct Cli {
    /// Target bucket (overrides the config file)
    #[arg(short = 'b', long = "bucket")]
    bucket: Option<String>,

    /// Object key
    #[arg(short = 'k', long = "key")]
    key: String,

    /// Input file; stdin when omitted or "-"
    #[arg(short = 'i', long = "input", value_name = "PATH")]
    input: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// AWS region
    #[arg(long = "region")]
    region: Option<String>,

    /// Custom endpoint URL (MinIO, LocalStack)
    #[arg(long = "endpoint", value_name = "URL")]
    endpoint: Option<String>,

    /// Use path-style addressing
    #[arg(long = "path-style")]
    path_style: bool,

    /// Part size in bytes
    #[arg(long = "part-size", value_name = "BYTES")]
    part_size: Option<usize>,

    /// Server-side encryption algorithm (AES256, aws:kms)
    #[arg(long = "sse", value_name = "ALGORITHM")]
    sse: Option<String>,

    /// KMS key id for aws:kms encryption
    #[arg(long = "sse-kms-key-id", value_name = "KEY_ID")]
    sse_kms_key_id: Option<String>,

    /// Fail instead of overwriting an existing object
    #[arg(long = "conditional-writes")]
    conditional_writes: bool,

    /// Rotation schedule interval of the producing pipeline
    #[arg(long = "rotate-interval-ms", value_name = "MS")]
    rotate_interval_ms: Option<u64>,

    /// Log level
    #[arg(long = "log-level", value_enum)]
    log_level: Option<LogLevelArg>,

    /// Verbose output (debug logging)
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Write JSON logs to a file instead of stderr
    #[arg(long = "log-file", value_name = "FILE")]
    log_file: Option<PathBuf>,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevelArg> for LogLevel {
    fn from(arg: LogLevelArg) -> Self {
        match arg {
            LogLevelArg::Error => LogLevel::Error,
            LogLevelArg::Warn => LogLevel::Warn,
            LogLevelArg::Info => LogLevel::Info,
            LogLevelArg::Debug => LogLevel::Debug,
            LogLevelArg::Trace => LogLevel::Trace,
        }
    }
}

fn main() {
    let code = match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    };
    std::process::exit(code);
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match cli.config {
        Some(ref path) => StreamConfig::from_file(path)?,
        None => StreamConfig::default(),
    };
    apply_overrides(&mut config, &cli);

    if let Err(e) = logging::init_logging(&config) {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(stream_to_s3(config, cli.key, cli.input))
}

/// Command-line flags win over the config file
fn apply_overrides(config: &mut StreamConfig, cli: &Cli) {
    let s3 = &mut config.s3;

    if let Some(ref bucket) = cli.bucket {
        s3.bucket = bucket.clone();
    }
    if cli.region.is_some() {
        s3.region = cli.region.clone();
    }
    if cli.endpoint.is_some() {
        s3.endpoint = cli.endpoint.clone();
    }
    if cli.path_style {
        s3.force_path_style = true;
    }
    if let Some(size) = cli.part_size {
        s3.part_size = size;
    }
    if cli.sse.is_some() {
        s3.sse_algorithm = cli.sse.clone();
    }
    if cli.sse_kms_key_id.is_some() {
        s3.sse_kms_key_id = cli.sse_kms_key_id.clone();
    }
    if cli.conditional_writes {
        s3.enable_conditional_writes = true;
    }
    if cli.rotate_interval_ms.is_some() {
        s3.rotate_schedule_interval_ms = cli.rotate_interval_ms;
    }

    if let Some(level) = cli.log_level {
        config.log_level = level.into();
    }
    if cli.verbose {
        config.verbose = true;
    }
    if cli.log_file.is_some() {
        config.log_file = cli.log_file.clone();
    }
}

async fn stream_to_s3(config: StreamConfig, key: String, input: Option<PathBuf>) -> Result<()> {
    let bucket = config.s3.bucket.clone();
    let options = WriterOptions::from_config(&config.s3)?;
    let client = Arc::new(S3Client::new(config.s3).await?);
    let mut writer = MultipartObjectWriter::new(client, key, options)?;

    let reader: Box<dyn AsyncRead + Unpin + Send> = match input {
        Some(path) if path.as_path() != Path::new("-") => {
            if !path.exists() {
                return Err(OrbitError::SourceNotFound(path));
            }
            Box::new(tokio::fs::File::open(&path).await?)
        }
        _ => Box::new(tokio::io::stdin()),
    };

    if let Err(e) = copy_into(&mut writer, reader).await {
        if let Err(abort_err) = writer.abort().await {
            warn!("Failed to abort upload of {}: {}", writer.key(), abort_err);
        }
        return Err(e);
    }

    info!(
        "Uploaded {} bytes to s3://{}/{}",
        writer.position(),
        bucket,
        writer.key()
    );
    Ok(())
}

async fn copy_into(
    writer: &mut MultipartObjectWriter,
    mut reader: Box<dyn AsyncRead + Unpin + Send>,
) -> Result<()> {
    let mut buf = vec![0u8; READ_CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        writer.write(&buf[..n]).await?;
    }

    writer.commit().await?;
    Ok(())
}
