//! Single-object conversion pipeline.
//!
//! One invocation moves one Bronze object through strictly sequential
//! stages:
//!
//! ```text
//! Fetching -> Reading -> Normalizing -> MappingPath -> Writing -> Done
//!     \           \            \                          \
//!      `-----------`------------`--------------------------`--> Failed
//! ```
//!
//! Parsing, normalization and encoding are CPU-bound and run on Tokio's
//! blocking pool. Every invocation returns a [`ConversionResult`]; failures
//! are logged and forwarded to the [`Notifier`].

mod result;

pub use result::{ConversionResult, FailureKind};

use chrono::{NaiveDate, Utc};
use snafu::prelude::*;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::config::Config;
use crate::emit;
use crate::error::{
    ConversionError, EncodeSnafu, FetchSnafu, NormalizeSnafu, PutSnafu, ReadSnafu,
    TaskJoinSnafu,
};
use crate::event::TriggerEvent;
use crate::metrics::events::{
    BytesRead, BytesWritten, ConversionCompleted, FileFailed, FileProcessed, FileStatus,
    PathMappingFallback, RowsConverted,
};
use crate::notify::{Notifier, failure_subject};
use crate::path::{KeyContext, PathMapper};
use crate::schema::SchemaNormalizer;
use crate::sink::{ColumnarWriter, WriterConfig};
use crate::source::FileFormat;
use crate::storage::ObjectStorage;

/// Source of the processing date.
pub type Clock = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

/// Default subject of failure notifications.
pub const DEFAULT_SUBJECT: &str = "Data Processing Error(Bronze-Silver)";

/// Pipeline stage, used in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetching,
    Reading,
    Normalizing,
    MappingPath,
    Writing,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Fetching => "fetching",
            Stage::Reading => "reading",
            Stage::Normalizing => "normalizing",
            Stage::MappingPath => "mapping_path",
            Stage::Writing => "writing",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Converts one Bronze object per invocation into a Silver Parquet object.
pub struct ConversionPipeline {
    storage: Arc<dyn ObjectStorage>,
    notifier: Arc<dyn Notifier>,
    mapper: PathMapper,
    normalizer: SchemaNormalizer,
    writer: ColumnarWriter,
    output_bucket: Option<String>,
    subject: String,
    clock: Clock,
    dry_run: bool,
}

impl ConversionPipeline {
    /// Pipeline with default zones, writer settings and the UTC clock.
    pub fn new(storage: Arc<dyn ObjectStorage>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            storage,
            notifier,
            mapper: PathMapper::default(),
            normalizer: SchemaNormalizer,
            writer: ColumnarWriter::default(),
            output_bucket: None,
            subject: DEFAULT_SUBJECT.to_string(),
            clock: Arc::new(|| Utc::now().date_naive()),
            dry_run: false,
        }
    }

    /// Pipeline configured from a loaded [`Config`].
    pub fn from_config(
        config: &Config,
        storage: Arc<dyn ObjectStorage>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self::new(storage, notifier)
            .with_mapper(config.path_mapper())
            .with_writer_config(config.writer_config())
            .with_output_bucket(config.output.bucket.clone())
            .with_subject(config.notifier.subject.clone())
    }

    pub fn with_mapper(mut self, mapper: PathMapper) -> Self {
        self.mapper = mapper;
        self
    }

    pub fn with_writer_config(mut self, config: WriterConfig) -> Self {
        self.writer = ColumnarWriter::new(config);
        self
    }

    /// Write to this bucket instead of the event's bucket.
    pub fn with_output_bucket(mut self, bucket: Option<String>) -> Self {
        self.output_bucket = bucket;
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Run every stage but skip the final put.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Convert the object named by a trigger event.
    pub async fn run_event(&self, event: &TriggerEvent) -> ConversionResult {
        self.run(&event.bucket, &event.key).await
    }

    /// Convert `key` in `bucket`. Never fails: errors become
    /// [`ConversionResult::Failed`].
    pub async fn run(&self, bucket: &str, key: &str) -> ConversionResult {
        let span = info_span!("conversion", stream = %KeyContext::from_key(key));
        self.run_in_span(bucket, key).instrument(span).await
    }

    async fn run_in_span(&self, bucket: &str, key: &str) -> ConversionResult {
        let start = Instant::now();

        if !self.mapper.in_source_zone(key) {
            info!(
                bucket,
                key,
                zone = self.mapper.source_zone(),
                "Key is outside the source zone, skipping"
            );
            emit!(FileProcessed {
                status: FileStatus::Skipped,
            });
            return ConversionResult::Skipped {
                reason: format!("key is not under '{}/'", self.mapper.source_zone()),
            };
        }

        let result = match self.convert(bucket, key).await {
            Ok(result) => {
                debug!(stage = %Stage::Done);
                emit!(FileProcessed {
                    status: FileStatus::Success,
                });
                result
            }
            Err(err) => {
                let kind = err.kind();
                let message = err.to_string();
                error!(stage = %Stage::Failed, kind = %kind, error = %message, "Conversion failed");
                emit!(FileProcessed {
                    status: FileStatus::Failed,
                });
                emit!(FileFailed { kind });

                let subject = failure_subject(bucket, &self.subject);
                let body = format!("File: {bucket}/{key}\nFailure: {kind}\nError: {message}");
                self.notifier.notify(&subject, &body).await;

                ConversionResult::Failed { kind, message }
            }
        };

        emit!(ConversionCompleted {
            duration: start.elapsed(),
        });
        result
    }

    async fn convert(&self, bucket: &str, key: &str) -> Result<ConversionResult, ConversionError> {
        // Unsupported extensions fail before any download.
        let format = FileFormat::from_key(key).context(ReadSnafu { key })?;

        debug!(stage = %Stage::Fetching, bucket, key);
        let data = self
            .storage
            .fetch(bucket, key)
            .await
            .context(FetchSnafu { bucket, key })?;
        info!(bytes = data.len(), format = %format, "File downloaded");
        emit!(BytesRead {
            bytes: data.len() as u64,
        });

        debug!(stage = %Stage::Reading);
        let table = tokio::task::spawn_blocking(move || format.read(data))
            .await
            .context(TaskJoinSnafu {
                stage: FailureKind::FormatReadError,
            })?
            .context(ReadSnafu { key })?;
        debug!(
            rows = table.num_rows(),
            columns = ?table.column_names(),
            "Dataset read"
        );

        debug!(stage = %Stage::Normalizing);
        let normalizer = self.normalizer;
        let table = tokio::task::spawn_blocking(move || normalizer.normalize(table))
            .await
            .context(TaskJoinSnafu {
                stage: FailureKind::FormatReadError,
            })?
            .context(NormalizeSnafu { key })?;
        let (rows, columns) = (table.num_rows(), table.num_columns());

        debug!(stage = %Stage::MappingPath);
        let mapped = self.mapper.map(key, (self.clock)());
        if mapped.is_fallback() {
            warn!(key, target = %mapped.key, "No date partition derivable, used fallback mapping");
            emit!(PathMappingFallback);
        }
        let target = mapped.key;
        let target_bucket = self.output_bucket.as_deref().unwrap_or(bucket);

        debug!(stage = %Stage::Writing, bucket = target_bucket, target = %target);
        let writer = self.writer.clone();
        let bytes = tokio::task::spawn_blocking(move || writer.write(&table))
            .await
            .context(TaskJoinSnafu {
                stage: FailureKind::WriteError,
            })?
            .context(EncodeSnafu { target: &target })?;
        let size = bytes.len() as u64;

        if self.dry_run {
            info!(target = %target, bytes = size, "Dry run, not writing");
        } else {
            self.storage
                .put(target_bucket, &target, bytes)
                .await
                .context(PutSnafu {
                    bucket: target_bucket,
                    target: &target,
                })?;
            emit!(BytesWritten { bytes: size });
            info!(bucket = target_bucket, target = %target, rows, columns, "Parquet file written");
        }

        emit!(RowsConverted {
            count: rows as u64,
            format,
        });

        Ok(ConversionResult::Success {
            target_key: target,
            rows,
            columns,
        })
    }
}
