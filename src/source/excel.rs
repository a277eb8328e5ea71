//! Excel workbook reader (`.xlsx`, `.xls`).
//!
//! Only the first worksheet is read; its first row is the header.

use bytes::Bytes;
use calamine::{Data, DataType, Reader, open_workbook_auto_from_rs};
use snafu::prelude::*;
use std::io::Cursor;

use super::{FileFormat, FormatReader};
use crate::error::{AssembleSnafu, ExcelSnafu, NoWorksheetSnafu, ReaderError};
use crate::table::{TabularDataset, header_names};

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Reads the first worksheet of a workbook.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExcelReader;

impl FormatReader for ExcelReader {
    fn read(&self, data: Bytes) -> Result<TabularDataset, ReaderError> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(data)).context(ExcelSnafu)?;
        let range = workbook
            .worksheet_range_at(0)
            .context(NoWorksheetSnafu)?
            .context(ExcelSnafu)?;

        let mut rows = range.rows();
        let names = match rows.next() {
            Some(header) => header_names(header.iter().map(render_cell)),
            None => Vec::new(),
        };
        let rows: Vec<Vec<String>> = rows
            .map(|row| row.iter().map(render_cell).collect())
            .collect();

        TabularDataset::from_string_rows(names, &rows).context(AssembleSnafu {
            format: FileFormat::Excel,
        })
    }
}

/// Textual form of a cell. Empty cells are `""`; dates use
/// `YYYY-MM-DD HH:MM:SS`.
pub(crate) fn render_cell(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::DateTime(_) => cell
            .as_datetime()
            .map(|dt| dt.format(DATETIME_FORMAT).to_string())
            .unwrap_or_else(|| cell.to_string()),
        other => other.to_string(),
    }
}
