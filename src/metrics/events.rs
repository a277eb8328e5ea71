//! Internal events for metrics emission.
//!
//! Each event struct represents a measurable occurrence during a conversion.
//! Events implement the `InternalEvent` trait which records the corresponding
//! metric.

use metrics::{counter, histogram};
use std::time::Duration;
use tracing::trace;

use crate::pipeline::FailureKind;
use crate::source::FileFormat;

/// Trait for internal events that can be emitted as metrics.
pub trait InternalEvent {
    /// Emit this event as a metric.
    fn emit(self);
}

/// Event emitted when source bytes have been fetched.
pub struct BytesRead {
    pub bytes: u64,
}

impl InternalEvent for BytesRead {
    fn emit(self) {
        trace!(bytes = self.bytes, "Bytes read");
        counter!("silverize_bytes_read_total").increment(self.bytes);
    }
}

/// Event emitted when a Parquet object has been written.
pub struct BytesWritten {
    pub bytes: u64,
}

impl InternalEvent for BytesWritten {
    fn emit(self) {
        trace!(bytes = self.bytes, "Bytes written");
        counter!("silverize_bytes_written_total").increment(self.bytes);
    }
}

/// Event emitted when a dataset has been converted.
pub struct RowsConverted {
    pub count: u64,
    pub format: FileFormat,
}

impl InternalEvent for RowsConverted {
    fn emit(self) {
        trace!(count = self.count, format = self.format.as_str(), "Rows converted");
        counter!("silverize_rows_converted_total", "format" => self.format.as_str())
            .increment(self.count);
    }
}

/// Outcome of one invocation.
#[derive(Debug, Clone, Copy)]
pub enum FileStatus {
    Success,
    Skipped,
    Failed,
}

impl FileStatus {
    fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Success => "success",
            FileStatus::Skipped => "skipped",
            FileStatus::Failed => "failed",
        }
    }
}

/// Event emitted once per invocation.
pub struct FileProcessed {
    pub status: FileStatus,
}

impl InternalEvent for FileProcessed {
    fn emit(self) {
        trace!(status = self.status.as_str(), "File processed");
        counter!("silverize_files_processed_total", "status" => self.status.as_str())
            .increment(1);
    }
}

/// Event emitted when an invocation fails.
pub struct FileFailed {
    pub kind: FailureKind,
}

impl InternalEvent for FileFailed {
    fn emit(self) {
        trace!(kind = self.kind.as_str(), "File failed");
        counter!("silverize_files_failed_total", "kind" => self.kind.as_str()).increment(1);
    }
}

/// Event emitted when the target key came from the fallback mapping.
pub struct PathMappingFallback;

impl InternalEvent for PathMappingFallback {
    fn emit(self) {
        trace!("Path mapping fell back");
        counter!("silverize_path_mapping_fallbacks_total").increment(1);
    }
}

/// Event emitted when a notification could not be delivered.
pub struct NotificationFailed;

impl InternalEvent for NotificationFailed {
    fn emit(self) {
        trace!("Notification failed");
        counter!("silverize_notifications_failed_total").increment(1);
    }
}

/// Event emitted when a conversion finishes, with its wall time.
pub struct ConversionCompleted {
    pub duration: Duration,
}

impl InternalEvent for ConversionCompleted {
    fn emit(self) {
        trace!(duration_ms = self.duration.as_millis(), "Conversion completed");
        histogram!("silverize_conversion_duration_seconds").record(self.duration.as_secs_f64());
    }
}

// ============================================================================
// Storage operation events
// ============================================================================

/// Storage operation types.
#[derive(Debug, Clone, Copy)]
pub enum StorageOperation {
    Get,
    Put,
}

impl StorageOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageOperation::Get => "get",
            StorageOperation::Put => "put",
        }
    }
}

/// Status of a storage request.
#[derive(Debug, Clone, Copy)]
pub enum RequestStatus {
    Success,
    Error,
}

impl RequestStatus {
    pub fn from_ok(ok: bool) -> Self {
        if ok {
            RequestStatus::Success
        } else {
            RequestStatus::Error
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Success => "success",
            RequestStatus::Error => "error",
        }
    }
}

/// Event emitted when a storage request completes.
pub struct StorageRequest {
    pub operation: StorageOperation,
    pub status: RequestStatus,
}

impl InternalEvent for StorageRequest {
    fn emit(self) {
        trace!(
            operation = self.operation.as_str(),
            status = self.status.as_str(),
            "Storage request"
        );
        counter!(
            "silverize_storage_requests_total",
            "operation" => self.operation.as_str(),
            "status" => self.status.as_str()
        )
        .increment(1);
    }
}

/// Event emitted when a storage request completes with duration.
pub struct StorageRequestDuration {
    pub operation: StorageOperation,
    pub duration: Duration,
}

impl InternalEvent for StorageRequestDuration {
    fn emit(self) {
        trace!(
            operation = self.operation.as_str(),
            duration_ms = self.duration.as_millis(),
            "Storage request duration"
        );
        histogram!(
            "silverize_storage_request_duration_seconds",
            "operation" => self.operation.as_str()
        )
        .record(self.duration.as_secs_f64());
    }
}
