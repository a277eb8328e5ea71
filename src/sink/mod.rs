//! Output encoding for the Silver zone.

pub mod parquet;

pub use self::parquet::{ColumnarWriter, WriterConfig};
