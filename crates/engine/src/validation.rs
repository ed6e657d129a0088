//! Validation Engine
//!
//! Advisory flags derived from columns + rows:
//! - duplicate column names (case-sensitive)
//! - columns with no non-blank value
//! - cells that do not parse under their column's type
//!
//! Nothing here blocks editing. A full [`ValidationState::compute`] runs on
//! load and structural changes; single-cell edits go through
//! [`ValidationState::update_cell`], which touches one map entry and one
//! counter.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::column::{Column, ColumnType, Dataset};
use crate::locale::{cell_date, cell_number, DateFormat, Locale};
use crate::value::CellValue;

// ============================================================================
// Core Types
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateColumns {
    /// Names appearing more than once, in order of first appearance.
    pub duplicate_names: Vec<String>,
    /// Every column index sharing a duplicated name, ascending.
    pub duplicate_column_indices: Vec<usize>,
}

impl DuplicateColumns {
    pub fn from_columns(columns: &[Column]) -> Self {
        let mut by_name: Vec<(&str, Vec<usize>)> = Vec::new();
        for (idx, column) in columns.iter().enumerate() {
            match by_name.iter_mut().find(|(name, _)| *name == column.name) {
                Some((_, indices)) => indices.push(idx),
                None => by_name.push((column.name.as_str(), vec![idx])),
            }
        }

        let mut result = Self::default();
        for (name, indices) in by_name.into_iter().filter(|(_, ix)| ix.len() > 1) {
            result.duplicate_names.push(name.to_string());
            result.duplicate_column_indices.extend(indices);
        }
        result.duplicate_column_indices.sort_unstable();
        result
    }
}

/// What an incremental update actually changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationDelta {
    pub row_errors_changed: bool,
    pub empty_columns_changed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationState {
    #[serde(rename = "duplicateColumns")]
    duplicates: DuplicateColumns,
    /// Ascending column indices.
    empty_columns: Vec<usize>,
    /// row -> ascending column indices
    parse_errors: BTreeMap<usize, Vec<usize>>,
    #[serde(skip)]
    non_empty_counts: Vec<usize>,
}

/// Per-column parse rule, resolved once per pass.
enum CellRule {
    Any,
    Number,
    Date(DateFormat),
}

impl CellRule {
    fn for_column(column: &Column, locale: &Locale) -> Self {
        match column.column_type {
            ColumnType::Text => CellRule::Any,
            ColumnType::Number => CellRule::Number,
            ColumnType::Date => CellRule::Date(column.effective_date_format(&locale.date)),
        }
    }

    fn accepts(&self, cell: &CellValue, locale: &Locale) -> bool {
        if cell.is_blank() {
            return true;
        }
        match self {
            CellRule::Any => true,
            CellRule::Number => cell_number(cell, &locale.number).is_some(),
            CellRule::Date(format) => cell_date(cell, format).is_some(),
        }
    }
}

/// Does `cell` parse under `column`'s type? Blank cells always do.
pub fn cell_parses(cell: &CellValue, column: &Column, locale: &Locale) -> bool {
    CellRule::for_column(column, locale).accepts(cell, locale)
}

impl ValidationState {
    /// Full scan.
    pub fn compute(dataset: &Dataset, locale: &Locale) -> Self {
        let columns = dataset.columns();
        let rules: Vec<CellRule> = columns
            .iter()
            .map(|c| CellRule::for_column(c, locale))
            .collect();

        let mut non_empty_counts = vec![0usize; columns.len()];
        let mut parse_errors = BTreeMap::new();

        for (row_idx, row) in dataset.rows().iter().enumerate() {
            let mut failed = Vec::new();
            for (col, cell) in row.iter().enumerate() {
                if !cell.is_blank() {
                    non_empty_counts[col] += 1;
                }
                if !rules[col].accepts(cell, locale) {
                    failed.push(col);
                }
            }
            if !failed.is_empty() {
                parse_errors.insert(row_idx, failed);
            }
        }

        let empty_columns = non_empty_counts
            .iter()
            .enumerate()
            .filter(|(_, count)| **count == 0)
            .map(|(col, _)| col)
            .collect();

        let state = Self {
            duplicates: DuplicateColumns::from_columns(columns),
            empty_columns,
            parse_errors,
            non_empty_counts,
        };
        log::debug!(
            "validation: {} rows x {} columns, {} parse errors, {} empty columns, {} duplicate names",
            dataset.row_count(),
            columns.len(),
            state.error_count(),
            state.empty_columns.len(),
            state.duplicates.duplicate_names.len()
        );
        state
    }

    /// Re-check one cell after an edit. `was_blank` is the blankness of the
    /// value the edit replaced.
    pub fn update_cell(
        &mut self,
        dataset: &Dataset,
        row: usize,
        col: usize,
        was_blank: bool,
        locale: &Locale,
    ) -> ValidationDelta {
        let mut delta = ValidationDelta::default();
        let Some(column) = dataset.column(col) else {
            return delta;
        };
        if col >= self.non_empty_counts.len() {
            return delta;
        }

        let cell = dataset.cell(row, col);
        let is_blank = cell.is_blank();
        if was_blank != is_blank {
            let count = &mut self.non_empty_counts[col];
            if is_blank {
                *count = count.saturating_sub(1);
            } else {
                *count += 1;
            }
            let now_empty = *count == 0;
            let listed = self.empty_columns.binary_search(&col);
            match (now_empty, listed) {
                (true, Err(pos)) => {
                    self.empty_columns.insert(pos, col);
                    delta.empty_columns_changed = true;
                }
                (false, Ok(pos)) => {
                    self.empty_columns.remove(pos);
                    delta.empty_columns_changed = true;
                }
                _ => {}
            }
        }

        let ok = cell_parses(cell, column, locale);
        delta.row_errors_changed = self.set_cell_error(row, col, !ok);
        delta
    }

    /// Re-check every cell of one column, e.g. after its type or date
    /// pattern changed. Returns the rows whose error list changed.
    pub fn recheck_column(
        &mut self,
        dataset: &Dataset,
        col: usize,
        locale: &Locale,
    ) -> Vec<usize> {
        let Some(column) = dataset.column(col) else {
            return Vec::new();
        };
        let rule = CellRule::for_column(column, locale);
        (0..dataset.row_count())
            .filter(|&row| {
                let ok = rule.accepts(dataset.cell(row, col), locale);
                self.set_cell_error(row, col, !ok)
            })
            .collect()
    }

    /// Recompute duplicate names. Returns true if the result changed.
    pub fn recheck_duplicates(&mut self, columns: &[Column]) -> bool {
        let duplicates = DuplicateColumns::from_columns(columns);
        if duplicates == self.duplicates {
            return false;
        }
        self.duplicates = duplicates;
        true
    }

    /// Rows whose error list differs between `self` and `previous`.
    pub fn changed_rows(&self, previous: &ValidationState) -> Vec<usize> {
        let mut rows: Vec<usize> = self
            .parse_errors
            .keys()
            .chain(previous.parse_errors.keys())
            .copied()
            .filter(|&row| self.row_errors(row) != previous.row_errors(row))
            .collect();
        rows.sort_unstable();
        rows.dedup();
        rows
    }

    fn set_cell_error(&mut self, row: usize, col: usize, failed: bool) -> bool {
        let entry = self.parse_errors.entry(row).or_default();
        let changed = match (entry.binary_search(&col), failed) {
            (Err(pos), true) => {
                entry.insert(pos, col);
                true
            }
            (Ok(pos), false) => {
                entry.remove(pos);
                true
            }
            _ => false,
        };
        if entry.is_empty() {
            self.parse_errors.remove(&row);
        }
        changed
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn duplicate_columns(&self) -> &DuplicateColumns {
        &self.duplicates
    }

    pub fn is_duplicate_column(&self, col: usize) -> bool {
        self.duplicates
            .duplicate_column_indices
            .binary_search(&col)
            .is_ok()
    }

    pub fn empty_columns(&self) -> &[usize] {
        &self.empty_columns
    }

    pub fn is_empty_column(&self, col: usize) -> bool {
        self.empty_columns.binary_search(&col).is_ok()
    }

    pub fn parse_errors(&self) -> &BTreeMap<usize, Vec<usize>> {
        &self.parse_errors
    }

    pub fn row_errors(&self, row: usize) -> &[usize] {
        self.parse_errors
            .get(&row)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn has_parse_error(&self, row: usize, col: usize) -> bool {
        self.row_errors(row).binary_search(&col).is_ok()
    }

    /// Total number of failing cells.
    pub fn error_count(&self) -> usize {
        self.parse_errors.values().map(Vec::len).sum()
    }
}
