//! Parquet encoder.
//!
//! Encodes a normalized dataset as one in-memory Parquet file: column order
//! as in the dataset, no index column, and no timestamps or random ids in
//! the footer, so equal datasets encode to equal bytes.

use arrow::array::RecordBatch;
use bytes::Bytes;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::file::properties::WriterProperties;
use snafu::prelude::*;

use crate::config::{DEFAULT_MAX_ROW_GROUP_SIZE, ParquetCompression};
use crate::error::{ParquetError, ParquetWriteSnafu, WriterCreateSnafu};
use crate::table::TabularDataset;

/// Parquet writer settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterConfig {
    pub compression: ParquetCompression,
    pub max_row_group_size: usize,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            compression: ParquetCompression::default(),
            max_row_group_size: DEFAULT_MAX_ROW_GROUP_SIZE,
        }
    }
}

impl WriterConfig {
    fn writer_properties(&self) -> WriterProperties {
        WriterProperties::builder()
            .set_created_by(format!("silverize version {}", env!("CARGO_PKG_VERSION")))
            .set_max_row_group_size(self.max_row_group_size.max(1))
            .set_compression(match self.compression {
                ParquetCompression::Uncompressed => Compression::UNCOMPRESSED,
                ParquetCompression::Snappy => Compression::SNAPPY,
                ParquetCompression::Gzip => Compression::GZIP(GzipLevel::default()),
                ParquetCompression::Zstd => Compression::ZSTD(ZstdLevel::default()),
                ParquetCompression::Lz4 => Compression::LZ4_RAW,
            })
            .build()
    }
}

/// Encodes datasets as Parquet bytes.
#[derive(Debug, Clone, Default)]
pub struct ColumnarWriter {
    config: WriterConfig,
}

impl ColumnarWriter {
    pub fn new(config: WriterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    /// Encode the dataset as a complete Parquet file.
    pub fn write(&self, table: &TabularDataset) -> Result<Bytes, ParquetError> {
        encode(table.batch(), self.config.writer_properties())
    }
}

fn encode(batch: &RecordBatch, props: WriterProperties) -> Result<Bytes, ParquetError> {
    let mut buffer = Vec::new();
    let mut writer =
        ArrowWriter::try_new(&mut buffer, batch.schema(), Some(props)).context(WriterCreateSnafu)?;
    writer.write(batch).context(ParquetWriteSnafu)?;
    writer.close().context(ParquetWriteSnafu)?;
    Ok(Bytes::from(buffer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Array, AsArray};
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use parquet::file::reader::{FileReader, SerializedFileReader};

    fn sample(rows: usize) -> TabularDataset {
        let ids: Vec<String> = (0..rows).map(|i| format!("{i:05}")).collect();
        let names: Vec<String> = (0..rows).map(|i| format!("name-{i}")).collect();
        TabularDataset::from_string_columns(vec!["id".into(), "name".into()], vec![ids, names])
            .unwrap()
    }

    #[test]
    fn test_write_reads_back() {
        let table = sample(10);
        let bytes = ColumnarWriter::default().write(&table).unwrap();

        assert!(bytes.starts_with(b"PAR1"));
        let reader = ParquetRecordBatchReaderBuilder::try_new(bytes)
            .unwrap()
            .build()
            .unwrap();
        let batches: Vec<RecordBatch> = reader.collect::<Result<_, _>>().unwrap();
        let batch = &batches[0];

        assert_eq!(batch.num_rows(), 10);
        assert_eq!(batch.schema().field(0).name(), "id");
        assert_eq!(batch.schema().field(1).name(), "name");
        let ids = batch.column(0).as_string::<i32>();
        assert_eq!(ids.value(3), "00003");
        assert_eq!(ids.null_count(), 0);
    }

    #[test]
    fn test_deterministic() {
        let writer = ColumnarWriter::default();
        let table = sample(100);

        assert_eq!(writer.write(&table).unwrap(), writer.write(&table).unwrap());
    }

    #[test]
    fn test_row_group_size_and_compression() {
        let writer = ColumnarWriter::new(WriterConfig {
            compression: ParquetCompression::Zstd,
            max_row_group_size: 25,
        });
        let bytes = writer.write(&sample(100)).unwrap();

        let reader = SerializedFileReader::new(bytes).unwrap();
        let metadata = reader.metadata();
        assert_eq!(metadata.num_row_groups(), 4);
        assert_eq!(
            metadata.row_group(0).column(0).compression(),
            Compression::ZSTD(ZstdLevel::default())
        );
        assert!(
            metadata
                .file_metadata()
                .created_by()
                .is_some_and(|c| c.starts_with("silverize"))
        );
    }

    #[test]
    fn test_lz4_uses_raw_framing() {
        let writer = ColumnarWriter::new(WriterConfig {
            compression: ParquetCompression::Lz4,
            max_row_group_size: 1024,
        });
        let bytes = writer.write(&sample(5)).unwrap();

        let reader = SerializedFileReader::new(bytes).unwrap();
        let column = reader.metadata().row_group(0).column(0);
        assert_eq!(column.compression(), Compression::LZ4_RAW);
    }

    #[test]
    fn test_every_codec_encodes() {
        for compression in [
            ParquetCompression::Uncompressed,
            ParquetCompression::Snappy,
            ParquetCompression::Gzip,
            ParquetCompression::Zstd,
            ParquetCompression::Lz4,
        ] {
            let writer = ColumnarWriter::new(WriterConfig {
                compression,
                max_row_group_size: 1024,
            });
            assert!(writer.write(&sample(3)).is_ok(), "{compression:?}");
        }
    }
}
