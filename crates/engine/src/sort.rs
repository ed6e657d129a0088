//! Sort Engine
//!
//! Multi-level stable sort over data row indices, plus the sort-level editing
//! protocol. Invariant: no two levels of a [`SortSpec`] reference the same
//! column id.

use std::cmp::Ordering;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::column::{Column, ColumnType, Dataset};
use crate::locale::{cell_date, cell_number, DateFormat, Locale};
use crate::value::CellValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortLevel {
    pub column_id: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortLevel {
    pub fn new(column_id: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            column_id: column_id.into(),
            direction,
        }
    }
}

// =============================================================================
// SortSpec: ordered levels with the editing protocol
// =============================================================================

/// Sort levels in priority order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<SortLevel>", into = "Vec<SortLevel>")]
pub struct SortSpec {
    levels: Vec<SortLevel>,
}

impl From<Vec<SortLevel>> for SortSpec {
    fn from(levels: Vec<SortLevel>) -> Self {
        Self::from_levels(levels)
    }
}

impl From<SortSpec> for Vec<SortLevel> {
    fn from(spec: SortSpec) -> Self {
        spec.levels
    }
}

impl SortSpec {
    /// Build from a level list. Later levels repeating a column are dropped.
    pub fn from_levels(levels: Vec<SortLevel>) -> Self {
        let mut spec = Self::default();
        for level in levels {
            if spec.level_for(&level.column_id).is_none() {
                spec.levels.push(level);
            }
        }
        spec
    }

    pub fn levels(&self) -> &[SortLevel] {
        &self.levels
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn level_for(&self, column_id: &str) -> Option<(usize, &SortLevel)> {
        self.levels
            .iter()
            .enumerate()
            .find(|(_, l)| l.column_id == column_id)
    }

    pub fn direction_for(&self, column_id: &str) -> Option<SortDirection> {
        self.level_for(column_id).map(|(_, l)| l.direction)
    }

    /// Append an ascending level on the first column not already used.
    /// Returns false when every column is in use.
    pub fn add_level(&mut self, columns: &[Column]) -> bool {
        let Some(column) = columns
            .iter()
            .find(|c| self.level_for(&c.id).is_none())
        else {
            return false;
        };
        self.levels
            .push(SortLevel::new(column.id.clone(), SortDirection::Asc));
        true
    }

    /// Point level `index` at `column_id`. When another level already uses
    /// that column the two levels trade columns; each keeps its direction.
    pub fn set_level_column(&mut self, index: usize, column_id: &str) -> bool {
        if index >= self.levels.len() || self.levels[index].column_id == column_id {
            return false;
        }
        match self.level_for(column_id).map(|(i, _)| i) {
            Some(other) => {
                let previous = self.levels[index].column_id.clone();
                self.levels[index].column_id = column_id.to_string();
                self.levels[other].column_id = previous;
            }
            None => self.levels[index].column_id = column_id.to_string(),
        }
        true
    }

    pub fn set_level_direction(&mut self, index: usize, direction: SortDirection) -> bool {
        match self.levels.get_mut(index) {
            Some(level) if level.direction != direction => {
                level.direction = direction;
                true
            }
            _ => false,
        }
    }

    pub fn toggle_direction(&mut self, index: usize) -> bool {
        match self.levels.get_mut(index) {
            Some(level) => {
                level.direction = level.direction.toggled();
                true
            }
            None => false,
        }
    }

    pub fn remove_level(&mut self, index: usize) -> bool {
        if index < self.levels.len() {
            self.levels.remove(index);
            true
        } else {
            false
        }
    }

    /// Drop the level referencing `column_id`, if any.
    pub fn remove_column(&mut self, column_id: &str) -> bool {
        let before = self.levels.len();
        self.levels.retain(|l| l.column_id != column_id);
        self.levels.len() != before
    }

    pub fn clear(&mut self) -> bool {
        let had_levels = !self.levels.is_empty();
        self.levels.clear();
        had_levels
    }
}

// =============================================================================
// Sorting
// =============================================================================

/// Precomputed comparison key of one cell.
/// Rank: numbers < instants < text < blank.
#[derive(Debug, Clone)]
enum SortValue {
    Number(f64),
    Instant(NaiveDateTime),
    Text(String),
    Blank,
}

impl SortValue {
    fn rank(&self) -> u8 {
        match self {
            SortValue::Number(_) => 0,
            SortValue::Instant(_) => 1,
            SortValue::Text(_) => 2,
            SortValue::Blank => 3,
        }
    }

    fn read(
        cell: &CellValue,
        column: &Column,
        locale: &Locale,
        date_format: Option<&DateFormat>,
    ) -> Self {
        if cell.is_blank() {
            return SortValue::Blank;
        }
        let typed = match (column.column_type, date_format) {
            (ColumnType::Number, _) => cell_number(cell, &locale.number).map(SortValue::Number),
            (ColumnType::Date, Some(format)) => cell_date(cell, format).map(SortValue::Instant),
            _ => None,
        };
        typed.unwrap_or_else(|| SortValue::Text(cell.raw_text().trim().to_string()))
    }

    /// Compare two keys under `direction`. Blanks stay last either way.
    fn compare(&self, other: &Self, direction: SortDirection) -> Ordering {
        match (self, other) {
            (SortValue::Blank, SortValue::Blank) => return Ordering::Equal,
            (SortValue::Blank, _) => return Ordering::Greater,
            (_, SortValue::Blank) => return Ordering::Less,
            _ => {}
        }
        let ord = match (self, other) {
            (SortValue::Number(a), SortValue::Number(b)) => a.total_cmp(b),
            (SortValue::Instant(a), SortValue::Instant(b)) => a.cmp(b),
            (SortValue::Text(a), SortValue::Text(b)) => natural_cmp(a, b),
            _ => self.rank().cmp(&other.rank()),
        };
        match direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    }
}

/// Stable multi-level sort of `rows` (data row indices). Levels naming
/// unknown columns are ignored.
pub fn sort_rows(
    dataset: &Dataset,
    rows: &[usize],
    spec: &SortSpec,
    locale: &Locale,
) -> Vec<usize> {
    let mut resolved = Vec::with_capacity(spec.len());
    for level in spec.levels() {
        match dataset.column_index(&level.column_id) {
            Some(col) => resolved.push((col, level.direction)),
            None => log::warn!("sort level references unknown column '{}'", level.column_id),
        }
    }
    if resolved.is_empty() {
        return rows.to_vec();
    }

    let formats: Vec<_> = resolved
        .iter()
        .map(|&(col, _)| {
            dataset
                .column(col)
                .filter(|c| c.column_type == ColumnType::Date)
                .map(|c| c.effective_date_format(&locale.date))
        })
        .collect();

    let mut keyed: Vec<(usize, Vec<SortValue>)> = rows
        .iter()
        .map(|&row| {
            let keys = resolved
                .iter()
                .zip(&formats)
                .map(|(&(col, _), format)| match dataset.column(col) {
                    Some(column) => {
                        SortValue::read(dataset.cell(row, col), column, locale, format.as_ref())
                    }
                    None => SortValue::Blank,
                })
                .collect();
            (row, keys)
        })
        .collect();

    keyed.sort_by(|(_, a), (_, b)| {
        resolved
            .iter()
            .enumerate()
            .map(|(i, &(_, direction))| a[i].compare(&b[i], direction))
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    });
    keyed.into_iter().map(|(row, _)| row).collect()
}

// =============================================================================
// Natural string comparison
// =============================================================================

/// Natural order: digit runs compare by numeric value, other characters
/// case-insensitively; ties fall back to case-sensitive then byte order.
/// `"Item 2" < "Item 10"`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    natural_pass(a, b, true)
        .then_with(|| natural_pass(a, b, false))
        .then_with(|| a.cmp(b))
}

fn natural_pass(a: &str, b: &str, fold_case: bool) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();
    loop {
        let (ca, cb) = match (left.peek(), right.peek()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(&ca), Some(&cb)) => (ca, cb),
        };

        let ord = if ca.is_ascii_digit() && cb.is_ascii_digit() {
            let run_a = take_digits(&mut left);
            let run_b = take_digits(&mut right);
            compare_digit_runs(&run_a, &run_b)
        } else {
            left.next();
            right.next();
            if fold_case {
                ca.to_lowercase().cmp(cb.to_lowercase())
            } else {
                ca.cmp(&cb)
            }
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
}

fn take_digits(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(&ch) = chars.peek() {
        if !ch.is_ascii_digit() {
            break;
        }
        run.push(ch);
        chars.next();
    }
    run
}

fn compare_digit_runs(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}
