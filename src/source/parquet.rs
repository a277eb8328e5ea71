//! Parquet reader.
//!
//! Decodes every row group with its native types; string coercion happens in
//! the schema normalizer.

use arrow::array::RecordBatch;
use arrow::compute::concat_batches;
use bytes::Bytes;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use snafu::prelude::*;

use super::{FileFormat, FormatReader};
use crate::error::{AssembleSnafu, ParquetDecodeSnafu, ReaderError};
use crate::table::TabularDataset;

/// Reads a whole Parquet file into one batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParquetReader;

impl FormatReader for ParquetReader {
    fn read(&self, data: Bytes) -> Result<TabularDataset, ReaderError> {
        let builder = ParquetRecordBatchReaderBuilder::try_new(data).context(ParquetDecodeSnafu)?;
        let schema = builder.schema().clone();
        let reader = builder.build().context(ParquetDecodeSnafu)?;

        let batches = reader
            .collect::<Result<Vec<RecordBatch>, _>>()
            .context(AssembleSnafu {
                format: FileFormat::Parquet,
            })?;
        let batch = concat_batches(&schema, &batches).context(AssembleSnafu {
            format: FileFormat::Parquet,
        })?;

        Ok(TabularDataset::new(batch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{ArrayRef, Int64Array, StringArray};
    use parquet::arrow::ArrowWriter;
    use parquet::file::properties::WriterProperties;
    use std::sync::Arc;

    fn parquet_bytes(batch: &RecordBatch, rows_per_group: usize) -> Bytes {
        let props = WriterProperties::builder()
            .set_max_row_group_size(rows_per_group)
            .build();
        let mut buffer = Vec::new();
        let mut writer = ArrowWriter::try_new(&mut buffer, batch.schema(), Some(props)).unwrap();
        writer.write(batch).unwrap();
        writer.close().unwrap();
        Bytes::from(buffer)
    }

    #[test]
    fn test_reads_all_row_groups_with_native_types() {
        let batch = RecordBatch::try_from_iter(vec![
            (
                "id",
                Arc::new(Int64Array::from(vec![1, 2, 3, 4, 5])) as ArrayRef,
            ),
            (
                "name",
                Arc::new(StringArray::from(vec![Some("a"), None, Some("c"), Some("d"), Some("e")]))
                    as ArrayRef,
            ),
        ])
        .unwrap();

        let table = ParquetReader.read(parquet_bytes(&batch, 2)).unwrap();

        assert_eq!(table.num_rows(), 5);
        assert_eq!(table.column_names(), vec!["id", "name"]);
        assert_eq!(
            table.batch().schema().field(0).data_type(),
            &arrow::datatypes::DataType::Int64
        );
    }

    #[test]
    fn test_not_parquet() {
        let err = ParquetReader
            .read(Bytes::from_static(b"id,name\n1,a\n"))
            .unwrap_err();
        assert!(matches!(err, ReaderError::ParquetDecode { .. }));
    }

    #[test]
    fn test_empty_bytes() {
        let err = ParquetReader.read(Bytes::new()).unwrap_err();
        assert!(matches!(err, ReaderError::ParquetDecode { .. }));
    }
}
