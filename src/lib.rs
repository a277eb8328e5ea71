//! silverize: converts raw Bronze-zone objects into Silver-zone Parquet.
//!
//! One invocation handles one object: it is fetched from object storage,
//! parsed by extension (CSV, Excel, JSON, Parquet), normalized to an
//! all-string schema, and written as Parquet under a date-partitioned key.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use silverize::{Config, ConversionPipeline, StoragePool, notify};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::from_file("config.yaml").unwrap();
//!     let storage = Arc::new(StoragePool::new(config.storage.clone()));
//!     let notifier = notify::from_config(&config.notifier).unwrap();
//!     let pipeline = ConversionPipeline::from_config(&config, storage, notifier);
//!     let result = pipeline.run("lake-dev-data", "bronze/report_2025-01-10.csv").await;
//!     println!("{result:?}");
//! }
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod metrics;
pub mod notify;
pub mod path;
pub mod pipeline;
pub mod schema;
pub mod sink;
pub mod source;
pub mod storage;
pub mod table;

// Re-export main types
pub use config::Config;
pub use event::TriggerEvent;
pub use path::{PathMapper, PartitionExtractor};
pub use pipeline::{ConversionPipeline, ConversionResult, FailureKind};
pub use schema::SchemaNormalizer;
pub use sink::{ColumnarWriter, WriterConfig};
pub use source::{FileFormat, FormatReader};
pub use storage::{ObjectStorage, StoragePool, StorageProvider, StorageProviderRef};
pub use table::TabularDataset;
