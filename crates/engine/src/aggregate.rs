//! Aggregation Engine
//!
//! Groups rows by the raw canonical value of one or more columns and reduces
//! metric columns per group. The output is a derived [`Dataset`] for display;
//! `groups` keeps the path back to the source rows.

use std::cmp::Ordering;
use std::fmt;

use chrono::NaiveDateTime;
use ordered_float::OrderedFloat;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::column::{Column, ColumnType, Dataset, Row};
use crate::locale::{cell_date, cell_number, DateFormat, Locale};
use crate::sort::natural_cmp;
use crate::value::CellValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reducer {
    Sum,
    Avg,
    Count,
    CountDistinct,
    Min,
    Max,
    First,
}

impl Reducer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reducer::Sum => "sum",
            Reducer::Avg => "avg",
            Reducer::Count => "count",
            Reducer::CountDistinct => "count_distinct",
            Reducer::Min => "min",
            Reducer::Max => "max",
            Reducer::First => "first",
        }
    }

    /// Type of the output column for a source column of `source` type.
    pub fn output_type(&self, source: ColumnType) -> ColumnType {
        match self {
            Reducer::Min | Reducer::Max | Reducer::First => source,
            Reducer::Sum | Reducer::Avg | Reducer::Count | Reducer::CountDistinct => {
                ColumnType::Number
            }
        }
    }
}

impl fmt::Display for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSpec {
    pub column_id: String,
    pub reducer: Reducer,
}

impl MetricSpec {
    pub fn new(column_id: impl Into<String>, reducer: Reducer) -> Self {
        Self {
            column_id: column_id.into(),
            reducer,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AggregationSpec {
    pub group_by: Vec<String>,
    pub metrics: Vec<MetricSpec>,
}

impl AggregationSpec {
    pub fn new(group_by: Vec<String>, metrics: Vec<MetricSpec>) -> Self {
        Self { group_by, metrics }
    }

    /// An aggregation with neither group-by columns nor metrics leaves rows as-is.
    pub fn is_active(&self) -> bool {
        !self.group_by.is_empty() || !self.metrics.is_empty()
    }

    /// Every column id the aggregation reads.
    pub fn column_ids(&self) -> impl Iterator<Item = &str> {
        self.group_by
            .iter()
            .map(String::as_str)
            .chain(self.metrics.iter().map(|m| m.column_id.as_str()))
    }

    /// Drop references to a deleted column. Returns true if anything changed.
    pub fn remove_column(&mut self, column_id: &str) -> bool {
        let before = self.group_by.len() + self.metrics.len();
        self.group_by.retain(|id| id != column_id);
        self.metrics.retain(|m| m.column_id != column_id);
        before != self.group_by.len() + self.metrics.len()
    }
}

/// Aggregated rows plus, per output row, the source rows it reduces.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregatedView {
    dataset: Dataset,
    groups: Vec<Vec<usize>>,
}

impl AggregatedView {
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn columns(&self) -> &[Column] {
        self.dataset.columns()
    }

    pub fn rows(&self) -> &[Row] {
        self.dataset.rows()
    }

    pub fn groups(&self) -> &[Vec<usize>] {
        &self.groups
    }

    /// Source data rows of output row `row`.
    pub fn source_rows(&self, row: usize) -> &[usize] {
        self.groups.get(row).map(Vec::as_slice).unwrap_or(&[])
    }
}

// ============================================================================
// Grouping keys
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum KeyPart {
    Blank,
    Number(OrderedFloat<f64>),
    Instant(NaiveDateTime),
    Text(String),
}

/// How one source column is read for keys and reductions.
struct ColumnReader<'a> {
    col: usize,
    column: &'a Column,
    date_format: Option<DateFormat>,
}

impl<'a> ColumnReader<'a> {
    fn resolve(
        dataset: &'a Dataset,
        column_id: &str,
        locale: &Locale,
        what: &str,
    ) -> Option<Self> {
        let Some(col) = dataset.column_index(column_id) else {
            log::warn!("aggregation {what} references unknown column '{column_id}'");
            return None;
        };
        let column = dataset.column(col)?;
        let date_format = (column.column_type == ColumnType::Date)
            .then(|| column.effective_date_format(&locale.date));
        Some(Self {
            col,
            column,
            date_format,
        })
    }

    fn key(&self, cell: &CellValue, locale: &Locale) -> KeyPart {
        if cell.is_blank() {
            return KeyPart::Blank;
        }
        let typed = match (self.column.column_type, &self.date_format) {
            (ColumnType::Number, _) => {
                cell_number(cell, &locale.number).map(|n| KeyPart::Number(OrderedFloat(n)))
            }
            (ColumnType::Date, Some(format)) => cell_date(cell, format).map(KeyPart::Instant),
            _ => None,
        };
        typed.unwrap_or_else(|| KeyPart::Text(cell.raw_text().trim().to_string()))
    }

    fn compare(&self, a: &CellValue, b: &CellValue, locale: &Locale) -> Ordering {
        match (self.key(a, locale), self.key(b, locale)) {
            (KeyPart::Number(x), KeyPart::Number(y)) => x.cmp(&y),
            (KeyPart::Instant(x), KeyPart::Instant(y)) => x.cmp(&y),
            (KeyPart::Number(_), _) => Ordering::Less,
            (_, KeyPart::Number(_)) => Ordering::Greater,
            (KeyPart::Instant(_), _) => Ordering::Less,
            (_, KeyPart::Instant(_)) => Ordering::Greater,
            _ => natural_cmp(a.raw_text().trim(), b.raw_text().trim()),
        }
    }

    fn reduce(
        &self,
        reducer: Reducer,
        dataset: &Dataset,
        rows: &[usize],
        locale: &Locale,
    ) -> CellValue {
        let cells = rows
            .iter()
            .map(|&row| dataset.cell(row, self.col))
            .filter(|cell| !cell.is_blank());

        match reducer {
            Reducer::Sum => CellValue::Number(
                cells.filter_map(|c| cell_number(c, &locale.number)).sum(),
            ),
            Reducer::Avg => {
                let (sum, n) = cells
                    .filter_map(|c| cell_number(c, &locale.number))
                    .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
                if n == 0 {
                    CellValue::Empty
                } else {
                    CellValue::Number(sum / n as f64)
                }
            }
            Reducer::Count => CellValue::Number(cells.count() as f64),
            Reducer::CountDistinct => {
                let distinct: FxHashSet<KeyPart> = cells.map(|c| self.key(c, locale)).collect();
                CellValue::Number(distinct.len() as f64)
            }
            Reducer::Min => self.extreme(cells, locale, Ordering::Less),
            Reducer::Max => self.extreme(cells, locale, Ordering::Greater),
            Reducer::First => cells.cloned().next().unwrap_or_default(),
        }
    }

    fn extreme<'c>(
        &self,
        cells: impl Iterator<Item = &'c CellValue>,
        locale: &Locale,
        wanted: Ordering,
    ) -> CellValue {
        let typed_only = self.column.column_type != ColumnType::Text;
        let mut best: Option<&CellValue> = None;
        for cell in cells {
            if typed_only && matches!(self.key(cell, locale), KeyPart::Text(_)) {
                continue;
            }
            best = match best {
                Some(current) if self.compare(cell, current, locale) != wanted => Some(current),
                _ => Some(cell),
            };
        }
        match (best, self.column.column_type) {
            (Some(cell), ColumnType::Number) => cell_number(cell, &locale.number)
                .map(CellValue::Number)
                .unwrap_or_else(|| cell.clone()),
            (Some(cell), _) => cell.clone(),
            (None, _) => CellValue::Empty,
        }
    }
}

/// Metric column id: `"<source id>__<reducer>"`.
pub fn metric_column_id(column_id: &str, reducer: Reducer) -> String {
    format!("{column_id}__{reducer}")
}

/// Group `rows` (data row indices, in display order) and reduce metrics.
/// Groups appear in first-seen order. With no group-by columns every row
/// falls into a single group.
pub fn aggregate(
    dataset: &Dataset,
    rows: &[usize],
    spec: &AggregationSpec,
    locale: &Locale,
) -> AggregatedView {
    let keys: Vec<ColumnReader<'_>> = spec
        .group_by
        .iter()
        .filter_map(|id| ColumnReader::resolve(dataset, id, locale, "group-by"))
        .collect();
    let metrics: Vec<(ColumnReader<'_>, Reducer)> = spec
        .metrics
        .iter()
        .filter_map(|m| {
            ColumnReader::resolve(dataset, &m.column_id, locale, "metric").map(|r| (r, m.reducer))
        })
        .collect();

    let mut index: FxHashMap<Vec<KeyPart>, usize> = FxHashMap::default();
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for &row in rows {
        let key: Vec<KeyPart> = keys
            .iter()
            .map(|k| k.key(dataset.cell(row, k.col), locale))
            .collect();
        match index.get(&key) {
            Some(&g) => groups[g].push(row),
            None => {
                index.insert(key, groups.len());
                groups.push(vec![row]);
            }
        }
    }

    let mut columns: Vec<Column> = keys.iter().map(|k| k.column.clone()).collect();
    for (reader, reducer) in &metrics {
        let source = reader.column;
        let mut column = Column::new(
            metric_column_id(&source.id, *reducer),
            format!("{} ({})", source.name, reducer),
            reducer.output_type(source.column_type),
        )
        .with_width(source.width);
        if column.column_type == ColumnType::Date {
            column.date_format = source.date_format.clone();
        }
        columns.push(column);
    }

    let out_rows: Vec<Row> = groups
        .iter()
        .map(|members| {
            let first = members[0];
            keys.iter()
                .map(|k| dataset.cell(first, k.col).clone())
                .chain(
                    metrics
                        .iter()
                        .map(|(reader, reducer)| reader.reduce(*reducer, dataset, members, locale)),
                )
                .collect()
        })
        .collect();

    log::debug!(
        "aggregated {} rows into {} groups ({} metrics)",
        rows.len(),
        groups.len(),
        metrics.len()
    );

    AggregatedView {
        dataset: Dataset::new(columns, out_rows),
        groups,
    }
}
