//! Object-created trigger events.
//!
//! Parses S3-style notification payloads:
//!
//! ```json
//! {"Records": [{"s3": {"bucket": {"name": "lake-dev"}, "object": {"key": "bronze/a+b.csv"}}}]}
//! ```
//!
//! Object keys arrive form-encoded (`+` for space, `%XX` escapes) and are
//! decoded before use.

use percent_encoding::percent_decode_str;
use serde::Deserialize;
use snafu::prelude::*;
use tracing::warn;

use crate::error::{EmptyKeySnafu, EventError, EventParseSnafu, NoRecordsSnafu};

#[derive(Debug, Deserialize)]
struct Notification {
    #[serde(rename = "Records", default)]
    records: Vec<Record>,
}

#[derive(Debug, Deserialize)]
struct Record {
    s3: S3Entity,
}

#[derive(Debug, Deserialize)]
struct S3Entity {
    bucket: BucketEntity,
    object: ObjectEntity,
}

#[derive(Debug, Deserialize)]
struct BucketEntity {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ObjectEntity {
    key: String,
}

/// The object a conversion runs for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerEvent {
    pub bucket: String,
    /// Decoded object key.
    pub key: String,
}

impl TriggerEvent {
    /// Parse a notification payload. Only the first record is used.
    pub fn parse(payload: &[u8]) -> Result<Self, EventError> {
        let notification: Notification =
            serde_json::from_slice(payload).context(EventParseSnafu)?;
        let count = notification.records.len();

        let record = notification
            .records
            .into_iter()
            .next()
            .context(NoRecordsSnafu)?;
        if count > 1 {
            warn!(count, "Event carries multiple records, only the first is processed");
        }

        let key = decode_key(&record.s3.object.key);
        ensure!(!key.is_empty(), EmptyKeySnafu);

        Ok(Self {
            bucket: record.s3.bucket.name,
            key,
        })
    }
}

/// Decode a form-encoded object key: `+` becomes a space, then `%XX`
/// escapes are decoded. Invalid UTF-8 sequences are replaced.
pub fn decode_key(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}
