//! Column Type Model and the dataset container.
//!
//! Identity is the column `id`. Names are user-editable and may collide;
//! collisions are reported by validation and never break lookups.
//!
//! Invariant: every row holds exactly `columns.len()` cells. Short rows are
//! padded with `Empty`, over-long rows are truncated, at every entry point.

use serde::{Deserialize, Serialize};

use crate::filter::{self, FilterOperator};
use crate::locale::DateFormat;
use crate::value::CellValue;

/// Default display width for columns created without one.
pub const DEFAULT_COLUMN_WIDTH: f32 = 120.0;

pub type Row = Vec<CellValue>;

static EMPTY_CELL: CellValue = CellValue::Empty;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    #[default]
    Text,
    Number,
    Date,
}

impl ColumnType {
    /// Filter operators available for this column type.
    pub fn operators(&self) -> &'static [FilterOperator] {
        filter::operators_for(*self)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Text => "text",
            ColumnType::Number => "number",
            ColumnType::Date => "date",
        }
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub column_type: ColumnType,
    #[serde(default = "default_width")]
    pub width: f32,
    /// Per-column date pattern; overrides the dataset pattern.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_format: Option<String>,
}

fn default_width() -> f32 {
    DEFAULT_COLUMN_WIDTH
}

impl Column {
    pub fn new(id: impl Into<String>, name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            column_type,
            width: DEFAULT_COLUMN_WIDTH,
            date_format: None,
        }
    }

    pub fn text(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(id, name, ColumnType::Text)
    }

    pub fn number(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(id, name, ColumnType::Number)
    }

    pub fn date(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(id, name, ColumnType::Date)
    }

    pub fn with_width(mut self, width: f32) -> Self {
        self.width = width;
        self
    }

    pub fn with_date_format(mut self, pattern: impl Into<String>) -> Self {
        self.date_format = Some(pattern.into());
        self
    }

    /// The date pattern that applies to this column's cells.
    pub fn effective_date_format(&self, dataset_format: &DateFormat) -> DateFormat {
        match &self.date_format {
            Some(pattern) if !pattern.trim().is_empty() => DateFormat::new(pattern.clone()),
            _ => dataset_format.clone(),
        }
    }
}

// ============================================================================
// Dataset
// ============================================================================

/// Columns plus rows aligned by column index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawDataset")]
pub struct Dataset {
    columns: Vec<Column>,
    rows: Vec<Row>,
}

#[derive(Deserialize)]
struct RawDataset {
    columns: Vec<Column>,
    #[serde(default)]
    rows: Vec<Row>,
}

impl From<RawDataset> for Dataset {
    fn from(raw: RawDataset) -> Self {
        Dataset::new(raw.columns, raw.rows)
    }
}

impl Dataset {
    pub fn new(columns: Vec<Column>, rows: Vec<Row>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|row| normalize_row(row, width))
            .collect();
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn column(&self, col: usize) -> Option<&Column> {
        self.columns.get(col)
    }

    pub fn column_mut(&mut self, col: usize) -> Option<&mut Column> {
        self.columns.get_mut(col)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, id: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.id == id)
    }

    /// Cell at (row, col). Out-of-range reads are `Empty`.
    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY_CELL)
    }

    /// Replace a cell, returning the previous value. `None` when out of range.
    pub fn set_cell(&mut self, row: usize, col: usize, value: CellValue) -> Option<CellValue> {
        let slot = self.rows.get_mut(row)?.get_mut(col)?;
        Some(std::mem::replace(slot, value))
    }

    /// Insert a row at `index` (clamped to the row count).
    pub fn insert_row(&mut self, index: usize, row: Row) -> usize {
        let index = index.min(self.rows.len());
        self.rows.insert(index, normalize_row(row, self.columns.len()));
        index
    }

    pub fn remove_row(&mut self, index: usize) -> Option<Row> {
        if index < self.rows.len() {
            Some(self.rows.remove(index))
        } else {
            None
        }
    }

    /// Insert a column at `index` (clamped); every row gains an `Empty` cell.
    pub fn insert_column(&mut self, index: usize, column: Column) -> usize {
        let index = index.min(self.columns.len());
        self.columns.insert(index, column);
        for row in &mut self.rows {
            row.insert(index, CellValue::Empty);
        }
        index
    }

    pub fn remove_column(&mut self, index: usize) -> Option<Column> {
        if index >= self.columns.len() {
            return None;
        }
        for row in &mut self.rows {
            row.remove(index);
        }
        Some(self.columns.remove(index))
    }
}

fn normalize_row(mut row: Row, width: usize) -> Row {
    row.resize(width, CellValue::Empty);
    row
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        Dataset::new(
            vec![Column::text("a", "A"), Column::number("b", "B")],
            vec![
                vec![CellValue::from("x")],
                vec![CellValue::from("y"), CellValue::Number(2.0), CellValue::from("extra")],
            ],
        )
    }

    #[test]
    fn test_rows_are_normalized_to_column_count() {
        let ds = sample();
        assert!(ds.rows().iter().all(|r| r.len() == 2));
        assert_eq!(ds.cell(0, 1), &CellValue::Empty);
        assert_eq!(ds.cell(1, 1), &CellValue::Number(2.0));
    }

    #[test]
    fn test_out_of_range_reads_are_empty() {
        let ds = sample();
        assert_eq!(ds.cell(99, 0), &CellValue::Empty);
        assert_eq!(ds.cell(0, 99), &CellValue::Empty);
    }

    #[test]
    fn test_set_cell_out_of_range_is_rejected() {
        let mut ds = sample();
        assert!(ds.set_cell(5, 0, CellValue::from("z")).is_none());
        assert_eq!(ds.set_cell(0, 0, CellValue::from("z")), Some(CellValue::from("x")));
    }

    #[test]
    fn test_column_insert_and_remove_keep_rows_aligned() {
        let mut ds = sample();
        ds.insert_column(1, Column::date("d", "When"));
        assert_eq!(ds.column_count(), 3);
        assert!(ds.rows().iter().all(|r| r.len() == 3));
        assert_eq!(ds.column_index("b"), Some(2));

        let removed = ds.remove_column(0).unwrap();
        assert_eq!(removed.id, "a");
        assert!(ds.rows().iter().all(|r| r.len() == 2));
        assert_eq!(ds.cell(1, 1), &CellValue::Number(2.0));
    }

    #[test]
    fn test_insert_row_clamps_index() {
        let mut ds = sample();
        let at = ds.insert_row(42, vec![CellValue::from("tail")]);
        assert_eq!(at, 2);
        assert_eq!(ds.cell(2, 0), &CellValue::from("tail"));
        assert_eq!(ds.rows()[2].len(), 2);
    }

    #[test]
    fn test_column_deserializes_from_wire_shape() {
        let col: Column =
            serde_json::from_str(r#"{"id":"c1","name":"Qty","type":"number","width":90}"#).unwrap();
        assert_eq!(col.column_type, ColumnType::Number);
        assert_eq!(col.width, 90.0);
        assert!(col.date_format.is_none());

        let ds: Dataset = serde_json::from_str(
            r#"{"columns":[{"id":"c1","name":"Qty","type":"number"}],"rows":[[],["5", 1]]}"#,
        )
        .unwrap();
        assert_eq!(ds.rows()[0], vec![CellValue::Empty]);
        assert_eq!(ds.rows()[1], vec![CellValue::from("5")]);
    }

    #[test]
    fn test_per_column_date_pattern_wins() {
        let dataset_format = DateFormat::default();
        let col = Column::date("d", "Month").with_date_format("MM/YYYY");
        assert_eq!(col.effective_date_format(&dataset_format).pattern(), "MM/YYYY");
        let plain = Column::date("e", "Day");
        assert_eq!(plain.effective_date_format(&dataset_format), dataset_format);
    }
}
