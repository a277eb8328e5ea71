//! silverize: converts one Bronze-zone object into Silver-zone Parquet.
//!
//! The object is named either by an object-created trigger event (`--event`)
//! or directly (`--bucket` and `--key`). The conversion result is printed as
//! JSON on stdout; the process exits non-zero when the conversion failed.

use clap::Parser;
use snafu::prelude::*;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use silverize::error::{
    CliError, ConfigSnafu, ConversionFailedSnafu, EventSnafu, MissingTargetSnafu, NotifierSnafu,
    ReadEventSnafu, ResultSerializeSnafu,
};
use silverize::{Config, ConversionPipeline, ConversionResult, StoragePool, TriggerEvent, notify};

/// Bronze to Silver Parquet conversion.
#[derive(Parser, Debug)]
#[command(name = "silverize")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to a trigger event JSON file, or `-` for stdin.
    #[arg(short, long, conflicts_with_all = ["bucket", "key"])]
    event: Option<PathBuf>,

    /// Bucket holding the source object.
    #[arg(long, requires = "key")]
    bucket: Option<String>,

    /// Source object key, already decoded.
    #[arg(long, requires = "bucket")]
    key: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Convert without writing the Parquet object.
    #[arg(long)]
    dry_run: bool,
}

#[snafu::report]
#[tokio::main]
async fn main() -> Result<(), CliError> {
    let args = Args::parse();

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = build_config(&args)?;
    let event = build_event(&args)?;
    info!(bucket = %event.bucket, key = %event.key, "silverize starting");

    let storage = Arc::new(StoragePool::new(config.storage.clone()));
    let notifier = notify::from_config(&config.notifier).context(NotifierSnafu)?;
    let pipeline =
        ConversionPipeline::from_config(&config, storage, notifier).with_dry_run(args.dry_run);

    let result = pipeline.run_event(&event).await;

    let json = serde_json::to_string(&result).context(ResultSerializeSnafu)?;
    println!("{json}");

    match result {
        ConversionResult::Failed { kind, message } => ConversionFailedSnafu { kind, message }.fail(),
        _ => Ok(()),
    }
}

/// Build configuration from arguments.
fn build_config(args: &Args) -> Result<Config, CliError> {
    match &args.config {
        Some(path) => Config::from_file(path).context(ConfigSnafu),
        None => {
            debug!("No configuration file given, using defaults");
            Ok(Config::default())
        }
    }
}

/// Resolve the object to convert from the event file or the bucket/key pair.
fn build_event(args: &Args) -> Result<TriggerEvent, CliError> {
    if let Some(path) = &args.event {
        let mut payload = Vec::new();
        if path.as_os_str() == "-" {
            std::io::stdin()
                .read_to_end(&mut payload)
                .context(ReadEventSnafu)?;
        } else {
            payload = std::fs::read(path).context(ReadEventSnafu)?;
        }
        return TriggerEvent::parse(&payload).context(EventSnafu);
    }

    match (&args.bucket, &args.key) {
        (Some(bucket), Some(key)) => Ok(TriggerEvent {
            bucket: bucket.clone(),
            key: key.clone(),
        }),
        _ => MissingTargetSnafu.fail(),
    }
}
