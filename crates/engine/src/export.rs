//! Flattened display table for chart and export collaborators.

use serde::{Deserialize, Serialize};

use crate::column::{Column, Row};
use crate::error::EngineError;
use crate::locale::{display_value, Locale};
use crate::value::CellValue;

static EMPTY: CellValue = CellValue::Empty;

/// Headers plus locale-formatted display strings, one `Vec` per row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl DisplayTable {
    /// Index of the first header equal to `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col).map(String::as_str)
    }
}

/// Render `rows` under `columns` with the locale's formats.
pub fn flatten<'a>(
    columns: &[Column],
    rows: impl IntoIterator<Item = &'a Row>,
    locale: &Locale,
) -> DisplayTable {
    let headers = columns.iter().map(|c| c.name.clone()).collect();
    let rows = rows
        .into_iter()
        .map(|row| {
            columns
                .iter()
                .enumerate()
                .map(|(col, column)| {
                    let cell = row.get(col).unwrap_or(&EMPTY);
                    display_value(cell, column, locale)
                })
                .collect()
        })
        .collect();
    DisplayTable { headers, rows }
}

/// CSV text with every field double-quoted and embedded quotes doubled.
/// Lines end in `\n`.
pub fn to_csv(table: &DisplayTable) -> Result<String, EngineError> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer
        .write_record(&table.headers)
        .map_err(|e| EngineError::Export(e.to_string()))?;
    for row in &table.rows {
        writer
            .write_record(row)
            .map_err(|e| EngineError::Export(e.to_string()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| EngineError::Export(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| EngineError::Export(e.to_string()))
}
