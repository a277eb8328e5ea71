//! CSV reader.
//!
//! Every cell is kept as its original text. The first record is the header.

use bytes::Bytes;
use csv::{ReaderBuilder, StringRecord};
use snafu::prelude::*;

use super::{FileFormat, FormatReader};
use crate::error::{AssembleSnafu, CsvSnafu, RaggedRowSnafu, ReaderError};
use crate::table::{TabularDataset, header_names};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Reads comma-separated text with a header row.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvReader;

impl FormatReader for CsvReader {
    fn read(&self, data: Bytes) -> Result<TabularDataset, ReaderError> {
        let data = data.strip_prefix(UTF8_BOM).unwrap_or(&data[..]);

        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(data);
        let mut records = reader.records();

        let header = match records.next() {
            Some(record) => record.context(CsvSnafu)?,
            None => StringRecord::new(),
        };
        let names = header_names(header.iter());

        let mut rows = Vec::new();
        for (idx, record) in records.enumerate() {
            let record = record.context(CsvSnafu)?;
            ensure!(
                record.len() <= names.len(),
                RaggedRowSnafu {
                    record: idx + 1,
                    expected: names.len(),
                    found: record.len(),
                }
            );
            rows.push(record.iter().map(str::to_string).collect());
        }

        TabularDataset::from_string_rows(names, &rows).context(AssembleSnafu {
            format: FileFormat::Csv,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Array, AsArray};

    fn read(text: &str) -> Result<TabularDataset, ReaderError> {
        CsvReader.read(Bytes::copy_from_slice(text.as_bytes()))
    }

    fn column(table: &TabularDataset, idx: usize) -> Vec<String> {
        let array = table.batch().column(idx).as_string::<i32>();
        (0..array.len()).map(|i| array.value(i).to_string()).collect()
    }

    #[test]
    fn test_cells_kept_as_text() {
        let table = read("id,amount,flag\n007,1.50,TRUE\n8,,NA\n").unwrap();

        assert_eq!(table.column_names(), vec!["id", "amount", "flag"]);
        assert_eq!(column(&table, 0), vec!["007", "8"]);
        assert_eq!(column(&table, 1), vec!["1.50", ""]);
        assert_eq!(column(&table, 2), vec!["TRUE", "NA"]);
    }

    #[test]
    fn test_quoted_fields() {
        let table = read("name,note\n\"Smith, J\",\"said \"\"hi\"\"\"\n").unwrap();
        assert_eq!(column(&table, 0), vec!["Smith, J"]);
        assert_eq!(column(&table, 1), vec!["said \"hi\""]);
    }

    #[test]
    fn test_blank_and_duplicate_headers() {
        let table = read(",a,a\n0,1,2\n").unwrap();
        assert_eq!(table.column_names(), vec!["Unnamed: 0", "a", "a.1"]);
    }

    #[test]
    fn test_bom_stripped() {
        let table = CsvReader
            .read(Bytes::from_static(b"\xEF\xBB\xBFid,v\n1,2\n"))
            .unwrap();
        assert_eq!(table.column_names(), vec!["id", "v"]);
    }

    #[test]
    fn test_short_rows_padded() {
        let table = read("a,b,c\n1\n1,2,3\n").unwrap();
        assert_eq!(table.num_rows(), 2);
        assert_eq!(column(&table, 2), vec!["", "3"]);
    }

    #[test]
    fn test_long_row_rejected() {
        let err = read("a,b\n1,2,3\n").unwrap_err();
        assert!(matches!(
            err,
            ReaderError::RaggedRow {
                record: 1,
                expected: 2,
                found: 3
            }
        ));
    }

    #[test]
    fn test_header_only() {
        let table = read("a,b\n").unwrap();
        assert_eq!(table.num_columns(), 2);
        assert_eq!(table.num_rows(), 0);
    }

    #[test]
    fn test_empty_input() {
        let table = read("").unwrap();
        assert_eq!(table.num_columns(), 0);
        assert_eq!(table.num_rows(), 0);
    }

    #[test]
    fn test_invalid_utf8_is_error() {
        let err = CsvReader
            .read(Bytes::from_static(b"a,b\n\xff\xfe,1\n"))
            .unwrap_err();
        assert!(matches!(err, ReaderError::Csv { .. }));
    }
}
