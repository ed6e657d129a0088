//! Filter Evaluation Engine
//!
//! Typed predicates over cells:
//! - Operator catalog depends on the column type (text vs number/date)
//! - Conditions on one column AND together; columns AND together
//! - Text matching is trimmed and case-insensitive
//! - Date operands and cells compare at the granularity of the column's
//!   date pattern
//! - An invalid condition compiles to `Never`, so a half-edited filter hides
//!   rows instead of failing the pipeline

use std::fmt;

use chrono::NaiveDateTime;
use ordered_float::OrderedFloat;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::column::{Column, ColumnType, Dataset};
use crate::locale::{
    cell_date, cell_number, display_value, truncate_to, DateFormat, Granularity, Locale,
    NumberFormat,
};
use crate::sort::natural_cmp;
use crate::value::CellValue;

// =============================================================================
// Operators
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    Contains,
    NotContains,
    Equals,
    NotEquals,
    StartsWith,
    EndsWith,
    GreaterThan,
    GreaterOrEqual,
    LessThan,
    LessOrEqual,
    Between,
    BetweenExclusive,
    IsEmpty,
    IsNotEmpty,
}

pub const TEXT_OPERATORS: [FilterOperator; 8] = [
    FilterOperator::Contains,
    FilterOperator::NotContains,
    FilterOperator::Equals,
    FilterOperator::NotEquals,
    FilterOperator::StartsWith,
    FilterOperator::EndsWith,
    FilterOperator::IsEmpty,
    FilterOperator::IsNotEmpty,
];

/// Number and date columns share one comparison catalog.
pub const ORDERED_OPERATORS: [FilterOperator; 10] = [
    FilterOperator::Equals,
    FilterOperator::NotEquals,
    FilterOperator::GreaterThan,
    FilterOperator::GreaterOrEqual,
    FilterOperator::LessThan,
    FilterOperator::LessOrEqual,
    FilterOperator::Between,
    FilterOperator::BetweenExclusive,
    FilterOperator::IsEmpty,
    FilterOperator::IsNotEmpty,
];

pub fn operators_for(column_type: ColumnType) -> &'static [FilterOperator] {
    match column_type {
        ColumnType::Text => &TEXT_OPERATORS,
        ColumnType::Number | ColumnType::Date => &ORDERED_OPERATORS,
    }
}

impl FilterOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Contains => "contains",
            FilterOperator::NotContains => "not_contains",
            FilterOperator::Equals => "equals",
            FilterOperator::NotEquals => "not_equals",
            FilterOperator::StartsWith => "starts_with",
            FilterOperator::EndsWith => "ends_with",
            FilterOperator::GreaterThan => "greater_than",
            FilterOperator::GreaterOrEqual => "greater_or_equal",
            FilterOperator::LessThan => "less_than",
            FilterOperator::LessOrEqual => "less_or_equal",
            FilterOperator::Between => "between",
            FilterOperator::BetweenExclusive => "between_exclusive",
            FilterOperator::IsEmpty => "is_empty",
            FilterOperator::IsNotEmpty => "is_not_empty",
        }
    }

    pub fn requires_value(&self) -> bool {
        !matches!(self, FilterOperator::IsEmpty | FilterOperator::IsNotEmpty)
    }

    pub fn is_range(&self) -> bool {
        matches!(self, FilterOperator::Between | FilterOperator::BetweenExclusive)
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Filter configuration
// =============================================================================

/// Operand of a condition: a single scalar or a multi-select set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Many(Vec<CellValue>),
    One(CellValue),
}

impl Default for FilterValue {
    fn default() -> Self {
        FilterValue::One(CellValue::Empty)
    }
}

impl FilterValue {
    /// Non-blank operand values.
    pub fn values(&self) -> impl Iterator<Item = &CellValue> {
        let slice = match self {
            FilterValue::Many(values) => values.as_slice(),
            FilterValue::One(value) => std::slice::from_ref(value),
        };
        slice.iter().filter(|v| !v.is_blank())
    }

    pub fn first(&self) -> Option<&CellValue> {
        self.values().next()
    }

    pub fn is_missing(&self) -> bool {
        self.first().is_none()
    }
}

impl From<CellValue> for FilterValue {
    fn from(value: CellValue) -> Self {
        FilterValue::One(value)
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::One(value.into())
    }
}

impl From<f64> for FilterValue {
    fn from(value: f64) -> Self {
        FilterValue::One(value.into())
    }
}

impl From<Vec<CellValue>> for FilterValue {
    fn from(values: Vec<CellValue>) -> Self {
        FilterValue::Many(values)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCondition {
    pub operator: FilterOperator,
    #[serde(default)]
    pub value: FilterValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_end: Option<CellValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_start: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_end: Option<bool>,
}

impl FilterCondition {
    pub fn new(operator: FilterOperator, value: impl Into<FilterValue>) -> Self {
        Self {
            operator,
            value: value.into(),
            value_end: None,
            include_start: None,
            include_end: None,
        }
    }

    pub fn is_empty() -> Self {
        Self::new(FilterOperator::IsEmpty, CellValue::Empty)
    }

    pub fn is_not_empty() -> Self {
        Self::new(FilterOperator::IsNotEmpty, CellValue::Empty)
    }

    pub fn between(start: impl Into<CellValue>, end: impl Into<CellValue>) -> Self {
        Self {
            value_end: Some(end.into()),
            ..Self::new(FilterOperator::Between, FilterValue::One(start.into()))
        }
    }

    pub fn with_bounds(mut self, include_start: bool, include_end: bool) -> Self {
        self.include_start = Some(include_start);
        self.include_end = Some(include_end);
        self
    }

    /// Bound inclusivity: `between` defaults to inclusive, `between_exclusive`
    /// to exclusive; explicit flags override either.
    pub fn inclusive_bounds(&self) -> (bool, bool) {
        let default = self.operator == FilterOperator::Between;
        (
            self.include_start.unwrap_or(default),
            self.include_end.unwrap_or(default),
        )
    }

    fn range_end(&self) -> Option<&CellValue> {
        self.value_end.as_ref().filter(|v| !v.is_blank())
    }
}

/// All conditions configured for one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnFilter {
    pub column_id: String,
    #[serde(default)]
    pub conditions: Vec<FilterCondition>,
}

impl ColumnFilter {
    pub fn new(column_id: impl Into<String>, conditions: Vec<FilterCondition>) -> Self {
        Self {
            column_id: column_id.into(),
            conditions,
        }
    }

    pub fn single(column_id: impl Into<String>, condition: FilterCondition) -> Self {
        Self::new(column_id, vec![condition])
    }

    pub fn is_active(&self) -> bool {
        !self.conditions.is_empty()
    }
}

// =============================================================================
// Configuration pre-check
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum FilterConfigError {
    MissingValue,
    MissingRangeBound,
    InvalidValue(String),
    InvalidRange,
    UnknownColumn(String),
    UnsupportedOperator {
        operator: FilterOperator,
        column_type: ColumnType,
    },
}

impl fmt::Display for FilterConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingValue => write!(f, "Enter a value"),
            Self::MissingRangeBound => write!(f, "Enter both a start and an end value"),
            Self::InvalidValue(raw) => write!(f, "\"{raw}\" is not a valid value for this column"),
            Self::InvalidRange => write!(f, "The start value must come before the end value"),
            Self::UnknownColumn(id) => write!(f, "Column \"{id}\" does not exist"),
            Self::UnsupportedOperator {
                operator,
                column_type,
            } => write!(f, "\"{operator}\" is not available for {column_type} columns"),
        }
    }
}

impl std::error::Error for FilterConfigError {}

/// Operand parsed under the column's type.
#[derive(Debug, Clone, PartialEq, PartialOrd)]
enum Operand {
    Number(f64),
    Date(NaiveDateTime),
    Text(String),
}

fn parse_operand(
    value: &CellValue,
    kind: &CellKind,
) -> Result<Operand, FilterConfigError> {
    let parsed = match kind {
        CellKind::Text => Some(Operand::Text(normalize_text(value))),
        CellKind::Number(format) => cell_number(value, format).map(Operand::Number),
        CellKind::Date { format, granularity } => cell_date(value, format)
            .map(|instant| Operand::Date(truncate_to(instant, *granularity))),
    };
    parsed.ok_or_else(|| FilterConfigError::InvalidValue(value.raw_text().trim().to_string()))
}

/// Check a condition before it is applied. Operands are read with the same
/// normalization the formatter uses, so `1,234` validates under `,` grouping.
pub fn validate_condition(
    condition: &FilterCondition,
    column: &Column,
    locale: &Locale,
) -> Result<(), FilterConfigError> {
    let kind = CellKind::for_column(column, locale);
    check_condition(condition, column.column_type, &kind).map(|_| ())
}

fn check_condition(
    condition: &FilterCondition,
    column_type: ColumnType,
    kind: &CellKind,
) -> Result<Vec<Operand>, FilterConfigError> {
    let operator = condition.operator;
    if !operators_for(column_type).contains(&operator) {
        return Err(FilterConfigError::UnsupportedOperator {
            operator,
            column_type,
        });
    }
    if !operator.requires_value() {
        return Ok(Vec::new());
    }

    if operator.is_range() {
        let (Some(start), Some(end)) = (condition.value.first(), condition.range_end()) else {
            return Err(FilterConfigError::MissingRangeBound);
        };
        let start = parse_operand(start, kind)?;
        let end = parse_operand(end, kind)?;
        let (include_start, include_end) = condition.inclusive_bounds();
        let ordered = match start.partial_cmp(&end) {
            Some(std::cmp::Ordering::Less) => true,
            Some(std::cmp::Ordering::Equal) => include_start || include_end,
            _ => false,
        };
        if !ordered {
            return Err(FilterConfigError::InvalidRange);
        }
        return Ok(vec![start, end]);
    }

    let operands = condition
        .value
        .values()
        .map(|value| parse_operand(value, kind))
        .collect::<Result<Vec<_>, _>>()?;
    if operands.is_empty() {
        return Err(FilterConfigError::MissingValue);
    }
    Ok(operands)
}

// =============================================================================
// Compiled predicates
// =============================================================================

/// How a column's cells are read before predicates run.
#[derive(Debug, Clone)]
enum CellKind {
    Text,
    Number(NumberFormat),
    Date {
        format: DateFormat,
        granularity: Granularity,
    },
}

impl CellKind {
    fn for_column(column: &Column, locale: &Locale) -> Self {
        match column.column_type {
            ColumnType::Text => CellKind::Text,
            ColumnType::Number => CellKind::Number(locale.number),
            ColumnType::Date => {
                let format = column.effective_date_format(&locale.date);
                let granularity = format.granularity();
                CellKind::Date {
                    format,
                    granularity,
                }
            }
        }
    }

    fn read(&self, cell: &CellValue) -> Reading {
        match self {
            CellKind::Text => Reading::Text(normalize_text(cell)),
            CellKind::Number(format) => Reading::Number(cell_number(cell, format)),
            CellKind::Date {
                format,
                granularity,
            } => Reading::Date(cell_date(cell, format).map(|i| truncate_to(i, *granularity))),
        }
    }
}

enum Reading {
    Text(String),
    Number(Option<f64>),
    Date(Option<NaiveDateTime>),
}

fn normalize_text(value: &CellValue) -> String {
    value.raw_text().trim().to_lowercase()
}

#[derive(Debug, Clone)]
enum TextPredicate {
    Contains(String),
    NotContains(String),
    Equals(Vec<String>),
    NotEquals(Vec<String>),
    StartsWith(String),
    EndsWith(String),
}

impl TextPredicate {
    fn test(&self, text: &str) -> bool {
        match self {
            TextPredicate::Contains(needle) => text.contains(needle.as_str()),
            TextPredicate::NotContains(needle) => !text.contains(needle.as_str()),
            TextPredicate::Equals(set) => set.iter().any(|s| s == text),
            TextPredicate::NotEquals(set) => !set.iter().any(|s| s == text),
            TextPredicate::StartsWith(prefix) => text.starts_with(prefix.as_str()),
            TextPredicate::EndsWith(suffix) => text.ends_with(suffix.as_str()),
        }
    }
}

/// Ordered comparison shared by number and date columns.
#[derive(Debug, Clone)]
enum Comparison<T> {
    Equals(Vec<T>),
    NotEquals(Vec<T>),
    Greater(T),
    GreaterOrEqual(T),
    Less(T),
    LessOrEqual(T),
    Range {
        start: T,
        end: T,
        include_start: bool,
        include_end: bool,
    },
}

impl<T: PartialOrd> Comparison<T> {
    fn test(&self, v: &T) -> bool {
        match self {
            Comparison::Equals(set) => set.iter().any(|x| x == v),
            Comparison::NotEquals(set) => !set.iter().any(|x| x == v),
            Comparison::Greater(x) => v > x,
            Comparison::GreaterOrEqual(x) => v >= x,
            Comparison::Less(x) => v < x,
            Comparison::LessOrEqual(x) => v <= x,
            Comparison::Range {
                start,
                end,
                include_start,
                include_end,
            } => {
                let above = if *include_start { v >= start } else { v > start };
                let below = if *include_end { v <= end } else { v < end };
                above && below
            }
        }
    }
}

#[derive(Debug, Clone)]
enum Predicate {
    Never,
    Blank { want_blank: bool },
    Text(TextPredicate),
    Number(Comparison<f64>),
    Date(Comparison<NaiveDateTime>),
}

impl Predicate {
    fn compile(condition: &FilterCondition, column_type: ColumnType, kind: &CellKind) -> Self {
        let operands = match check_condition(condition, column_type, kind) {
            Ok(operands) => operands,
            Err(err) => {
                log::trace!("filter condition {} disabled: {err}", condition.operator);
                return Predicate::Never;
            }
        };
        let (include_start, include_end) = condition.inclusive_bounds();
        let operator = condition.operator;

        match operator {
            FilterOperator::IsEmpty => return Predicate::Blank { want_blank: true },
            FilterOperator::IsNotEmpty => return Predicate::Blank { want_blank: false },
            _ => {}
        }

        match kind {
            CellKind::Text => {
                let mut texts: Vec<String> = operands
                    .into_iter()
                    .filter_map(|op| match op {
                        Operand::Text(s) => Some(s),
                        _ => None,
                    })
                    .collect();
                let first = texts.first().cloned().unwrap_or_default();
                let predicate = match operator {
                    FilterOperator::Contains => TextPredicate::Contains(first),
                    FilterOperator::NotContains => TextPredicate::NotContains(first),
                    FilterOperator::StartsWith => TextPredicate::StartsWith(first),
                    FilterOperator::EndsWith => TextPredicate::EndsWith(first),
                    FilterOperator::Equals => TextPredicate::Equals(std::mem::take(&mut texts)),
                    FilterOperator::NotEquals => {
                        TextPredicate::NotEquals(std::mem::take(&mut texts))
                    }
                    _ => return Predicate::Never,
                };
                Predicate::Text(predicate)
            }
            CellKind::Number(_) => {
                let values = operands
                    .into_iter()
                    .filter_map(|op| match op {
                        Operand::Number(n) => Some(n),
                        _ => None,
                    })
                    .collect();
                comparison(operator, values, include_start, include_end)
                    .map_or(Predicate::Never, Predicate::Number)
            }
            CellKind::Date { .. } => {
                let values = operands
                    .into_iter()
                    .filter_map(|op| match op {
                        Operand::Date(d) => Some(d),
                        _ => None,
                    })
                    .collect();
                comparison(operator, values, include_start, include_end)
                    .map_or(Predicate::Never, Predicate::Date)
            }
        }
    }

    fn test(&self, blank: bool, reading: &Reading) -> bool {
        match (self, reading) {
            (Predicate::Never, _) => false,
            (Predicate::Blank { want_blank }, _) => blank == *want_blank,
            (Predicate::Text(p), Reading::Text(s)) => p.test(s),
            (Predicate::Number(c), Reading::Number(Some(n))) => c.test(n),
            (Predicate::Date(c), Reading::Date(Some(d))) => c.test(d),
            // Blank or unparsable cells never satisfy a comparison.
            _ => false,
        }
    }
}

fn comparison<T: Copy>(
    operator: FilterOperator,
    mut values: Vec<T>,
    include_start: bool,
    include_end: bool,
) -> Option<Comparison<T>> {
    let first = *values.first()?;
    let cmp = match operator {
        FilterOperator::Equals => Comparison::Equals(std::mem::take(&mut values)),
        FilterOperator::NotEquals => Comparison::NotEquals(std::mem::take(&mut values)),
        FilterOperator::GreaterThan => Comparison::Greater(first),
        FilterOperator::GreaterOrEqual => Comparison::GreaterOrEqual(first),
        FilterOperator::LessThan => Comparison::Less(first),
        FilterOperator::LessOrEqual => Comparison::LessOrEqual(first),
        FilterOperator::Between | FilterOperator::BetweenExclusive => Comparison::Range {
            start: first,
            end: *values.get(1)?,
            include_start,
            include_end,
        },
        _ => return None,
    };
    Some(cmp)
}

/// Every condition configured on one column, ready to evaluate.
#[derive(Debug, Clone)]
struct ColumnPredicate {
    col: usize,
    kind: CellKind,
    predicates: Vec<Predicate>,
}

impl ColumnPredicate {
    fn compile(col: usize, column: &Column, filter: &ColumnFilter, locale: &Locale) -> Self {
        let kind = CellKind::for_column(column, locale);
        let predicates = filter
            .conditions
            .iter()
            .map(|c| Predicate::compile(c, column.column_type, &kind))
            .collect();
        Self {
            col,
            kind,
            predicates,
        }
    }

    fn matches(&self, cell: &CellValue) -> bool {
        let blank = cell.is_blank();
        let reading = self.kind.read(cell);
        self.predicates.iter().all(|p| p.test(blank, &reading))
    }
}

/// Does `value` satisfy every condition of `filter` under `column`'s type?
pub fn matches_value(
    column: &Column,
    filter: &ColumnFilter,
    value: &CellValue,
    locale: &Locale,
) -> bool {
    ColumnPredicate::compile(0, column, filter, locale).matches(value)
}

/// A filter list resolved against one dataset's columns.
#[derive(Debug, Clone, Default)]
pub struct CompiledFilter {
    columns: Vec<ColumnPredicate>,
}

impl CompiledFilter {
    /// Resolve column ids once. Filters naming unknown columns are skipped.
    pub fn compile(filters: &[ColumnFilter], dataset: &Dataset, locale: &Locale) -> Self {
        let mut columns = Vec::with_capacity(filters.len());
        for filter in filters.iter().filter(|f| f.is_active()) {
            let Some(col) = dataset.column_index(&filter.column_id) else {
                log::warn!("filter references unknown column '{}'", filter.column_id);
                continue;
            };
            if let Some(column) = dataset.column(col) {
                columns.push(ColumnPredicate::compile(col, column, filter, locale));
            }
        }
        Self { columns }
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Column indices this filter reads.
    pub fn columns(&self) -> impl Iterator<Item = usize> + '_ {
        self.columns.iter().map(|c| c.col)
    }

    pub fn matches_row(&self, dataset: &Dataset, row: usize) -> bool {
        self.columns
            .iter()
            .all(|c| c.matches(dataset.cell(row, c.col)))
    }

    /// Visibility per data row.
    pub fn filter_mask(&self, dataset: &Dataset) -> Vec<bool> {
        (0..dataset.row_count())
            .map(|row| self.matches_row(dataset, row))
            .collect()
    }
}

/// Data rows (in order) that pass `filters`.
pub fn apply_filters(dataset: &Dataset, filters: &[ColumnFilter], locale: &Locale) -> Vec<usize> {
    let compiled = CompiledFilter::compile(filters, dataset, locale);
    (0..dataset.row_count())
        .filter(|&row| compiled.matches_row(dataset, row))
        .collect()
}

// =============================================================================
// Unique values (filter value pickers)
// =============================================================================

/// One distinct value of a column with its occurrence count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniqueValue {
    /// First occurrence, as stored.
    pub value: CellValue,
    pub display: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum UniqueKey {
    Number(OrderedFloat<f64>),
    Date(NaiveDateTime),
    Text(String),
}

/// Distinct non-blank values of column `col`, numbers first (numeric order),
/// then dates (chronological), then text (natural order). Truncated to
/// `limit` entries.
pub fn unique_values(
    dataset: &Dataset,
    col: usize,
    locale: &Locale,
    limit: usize,
) -> Vec<UniqueValue> {
    let Some(column) = dataset.column(col) else {
        return Vec::new();
    };
    let kind = CellKind::for_column(column, locale);

    let mut index: FxHashMap<UniqueKey, usize> = FxHashMap::default();
    let mut entries: Vec<(UniqueKey, UniqueValue)> = Vec::new();

    for row in 0..dataset.row_count() {
        let cell = dataset.cell(row, col);
        if cell.is_blank() {
            continue;
        }
        let key = match kind.read(cell) {
            Reading::Number(Some(n)) => UniqueKey::Number(OrderedFloat(n)),
            Reading::Date(Some(d)) => UniqueKey::Date(d),
            _ => UniqueKey::Text(normalize_text(cell)),
        };
        match index.get(&key) {
            Some(&i) => entries[i].1.count += 1,
            None => {
                index.insert(key.clone(), entries.len());
                entries.push((
                    key,
                    UniqueValue {
                        value: cell.clone(),
                        display: display_value(cell, column, locale),
                        count: 1,
                    },
                ));
            }
        }
    }

    entries.sort_by(|(ka, a), (kb, b)| match (ka, kb) {
        (UniqueKey::Number(x), UniqueKey::Number(y)) => x.cmp(y),
        (UniqueKey::Number(_), _) => std::cmp::Ordering::Less,
        (_, UniqueKey::Number(_)) => std::cmp::Ordering::Greater,
        (UniqueKey::Date(x), UniqueKey::Date(y)) => x.cmp(y),
        (UniqueKey::Date(_), _) => std::cmp::Ordering::Less,
        (_, UniqueKey::Date(_)) => std::cmp::Ordering::Greater,
        _ => natural_cmp(&a.display, &b.display),
    });
    entries.truncate(limit);
    entries.into_iter().map(|(_, v)| v).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn qty_dataset() -> Dataset {
        Dataset::new(
            vec![Column::number("c1", "Qty")],
            vec![
                vec![CellValue::from("1,234")],
                vec![CellValue::from("-50")],
                vec![CellValue::from("abc")],
            ],
        )
    }

    fn text_column() -> Column {
        Column::text("t", "Name")
    }

    fn matches_text(op: FilterOperator, needle: &str, cell: &str) -> bool {
        let filter = ColumnFilter::single("t", FilterCondition::new(op, needle));
        matches_value(&text_column(), &filter, &CellValue::from(cell), &Locale::default())
    }

    #[test]
    fn test_greater_than_on_formatted_numbers() {
        let ds = qty_dataset();
        let filters = vec![ColumnFilter::single(
            "c1",
            FilterCondition::new(FilterOperator::GreaterThan, 0.0),
        )];
        assert_eq!(apply_filters(&ds, &filters, &Locale::default()), vec![0]);
    }

    #[test]
    fn test_text_operators_are_case_insensitive() {
        assert!(matches_text(FilterOperator::Contains, "PPL", " Apple "));
        assert!(!matches_text(FilterOperator::NotContains, "ppl", "Apple"));
        assert!(matches_text(FilterOperator::Equals, "apple", "APPLE"));
        assert!(matches_text(FilterOperator::NotEquals, "pear", "apple"));
        assert!(matches_text(FilterOperator::StartsWith, "ap", "Apple"));
        assert!(matches_text(FilterOperator::EndsWith, "LE", "apple"));
        assert!(!matches_text(FilterOperator::EndsWith, "ap", "apple"));
    }

    #[test]
    fn test_equals_accepts_a_value_set() {
        let filter = ColumnFilter::single(
            "t",
            FilterCondition::new(
                FilterOperator::Equals,
                vec![CellValue::from("red"), CellValue::from("blue")],
            ),
        );
        let locale = Locale::default();
        assert!(matches_value(&text_column(), &filter, &CellValue::from("Blue"), &locale));
        assert!(!matches_value(&text_column(), &filter, &CellValue::from("green"), &locale));
    }

    #[test]
    fn test_between_bounds() {
        let col = Column::number("n", "N");
        let locale = Locale::default();
        let check = |cond: FilterCondition, v: f64| {
            matches_value(&col, &ColumnFilter::single("n", cond), &CellValue::Number(v), &locale)
        };

        assert!(check(FilterCondition::between(1.0, 5.0), 1.0));
        assert!(check(FilterCondition::between(1.0, 5.0), 5.0));

        let exclusive = FilterCondition {
            operator: FilterOperator::BetweenExclusive,
            ..FilterCondition::between(1.0, 5.0)
        };
        assert!(!check(exclusive.clone(), 1.0));
        assert!(check(exclusive.clone(), 3.0));
        assert!(check(exclusive.with_bounds(true, false), 1.0));

        let half_open = FilterCondition::between(1.0, 5.0).with_bounds(true, false);
        assert!(!check(half_open, 5.0));
    }

    #[test]
    fn test_blank_cells_fail_numeric_comparisons() {
        let col = Column::number("n", "N");
        let locale = Locale::default();
        let not_equals =
            ColumnFilter::single("n", FilterCondition::new(FilterOperator::NotEquals, 3.0));
        assert!(!matches_value(&col, &not_equals, &CellValue::Empty, &locale));
        assert!(!matches_value(&col, &not_equals, &CellValue::from("n/a"), &locale));
        assert!(matches_value(&col, &not_equals, &CellValue::Number(4.0), &locale));
    }

    #[test]
    fn test_is_empty_partitions_rows() {
        let ds = Dataset::new(
            vec![text_column()],
            vec![
                vec![CellValue::from("a")],
                vec![CellValue::from("  ")],
                vec![CellValue::Empty],
            ],
        );
        let locale = Locale::default();
        let empty = apply_filters(&ds, &[ColumnFilter::single("t", FilterCondition::is_empty())], &locale);
        let not_empty = apply_filters(
            &ds,
            &[ColumnFilter::single("t", FilterCondition::is_not_empty())],
            &locale,
        );
        assert_eq!(empty, vec![1, 2]);
        assert_eq!(not_empty, vec![0]);
    }

    #[test]
    fn test_date_filter_uses_pattern_granularity() {
        let col = Column::date("d", "Month").with_date_format("YYYY-MM");
        let locale = Locale::default();
        let filter = ColumnFilter::single("d", FilterCondition::new(FilterOperator::Equals, "2024-03"));
        assert!(matches_value(&col, &filter, &CellValue::from("2024-03-28"), &locale));
        assert!(!matches_value(&col, &filter, &CellValue::from("2024-04-01"), &locale));

        let after = ColumnFilter::single(
            "d",
            FilterCondition::new(FilterOperator::GreaterThan, "2024-03-15"),
        );
        // 2024-03-20 truncates to March, which is not after March.
        assert!(!matches_value(&col, &after, &CellValue::from("2024-03-20"), &locale));
        assert!(matches_value(&col, &after, &CellValue::from("2024-04-02"), &locale));
    }

    #[test]
    fn test_conditions_on_one_column_and_together() {
        let col = Column::number("n", "N");
        let filter = ColumnFilter::new(
            "n",
            vec![
                FilterCondition::new(FilterOperator::GreaterThan, 1.0),
                FilterCondition::new(FilterOperator::LessThan, 3.0),
            ],
        );
        let locale = Locale::default();
        assert!(matches_value(&col, &filter, &CellValue::Number(2.0), &locale));
        assert!(!matches_value(&col, &filter, &CellValue::Number(4.0), &locale));
    }

    #[test]
    fn test_validate_condition() {
        let locale = Locale::default();
        let num = Column::number("n", "N");

        assert_eq!(validate_condition(&FilterCondition::is_empty(), &num, &locale), Ok(()));
        assert_eq!(
            validate_condition(&FilterCondition::new(FilterOperator::GreaterThan, ""), &num, &locale),
            Err(FilterConfigError::MissingValue)
        );
        assert_eq!(
            validate_condition(&FilterCondition::new(FilterOperator::GreaterThan, "1,500"), &num, &locale),
            Ok(())
        );
        assert_eq!(
            validate_condition(&FilterCondition::new(FilterOperator::LessThan, "lots"), &num, &locale),
            Err(FilterConfigError::InvalidValue("lots".into()))
        );
        assert_eq!(
            validate_condition(&FilterCondition::new(FilterOperator::Contains, "x"), &num, &locale),
            Err(FilterConfigError::UnsupportedOperator {
                operator: FilterOperator::Contains,
                column_type: ColumnType::Number,
            })
        );

        let missing_end = FilterCondition {
            value_end: None,
            ..FilterCondition::between(1.0, 2.0)
        };
        assert_eq!(
            validate_condition(&missing_end, &num, &locale),
            Err(FilterConfigError::MissingRangeBound)
        );
        assert_eq!(
            validate_condition(&FilterCondition::between(5.0, 1.0), &num, &locale),
            Err(FilterConfigError::InvalidRange)
        );
        assert_eq!(validate_condition(&FilterCondition::between(2.0, 2.0), &num, &locale), Ok(()));
        assert_eq!(
            validate_condition(
                &FilterCondition::between(2.0, 2.0).with_bounds(false, false),
                &num,
                &locale
            ),
            Err(FilterConfigError::InvalidRange)
        );
    }

    #[test]
    fn test_invalid_condition_never_matches() {
        let ds = qty_dataset();
        let filters = vec![ColumnFilter::single("c1", FilterCondition::between(10.0, 1.0))];
        assert!(apply_filters(&ds, &filters, &Locale::default()).is_empty());
    }

    #[test]
    fn test_unknown_column_is_skipped() {
        let ds = qty_dataset();
        let filters = vec![ColumnFilter::single("ghost", FilterCondition::is_empty())];
        let compiled = CompiledFilter::compile(&filters, &ds, &Locale::default());
        assert!(compiled.is_empty());
        assert_eq!(compiled.filter_mask(&ds), vec![true, true, true]);
    }

    #[test]
    fn test_condition_wire_format() {
        let cond: FilterCondition = serde_json::from_str(
            r#"{"operator":"between_exclusive","value":1,"valueEnd":"9","includeStart":true}"#,
        )
        .unwrap();
        assert_eq!(cond.operator, FilterOperator::BetweenExclusive);
        assert_eq!(cond.inclusive_bounds(), (true, false));
        assert_eq!(cond.value, FilterValue::One(CellValue::Number(1.0)));

        let set: FilterCondition =
            serde_json::from_str(r#"{"operator":"equals","value":["a","b"]}"#).unwrap();
        assert_eq!(set.value.values().count(), 2);

        let bare: FilterCondition = serde_json::from_str(r#"{"operator":"is_empty"}"#).unwrap();
        assert!(bare.value.is_missing());
    }

    #[test]
    fn test_unique_values_order_and_counts() {
        let ds = Dataset::new(
            vec![Column::number("n", "N")],
            vec![
                vec![CellValue::from("10")],
                vec![CellValue::from("n/a")],
                vec![CellValue::Number(2.0)],
                vec![CellValue::from("2")],
                vec![CellValue::Empty],
                vec![CellValue::from("1,000")],
            ],
        );
        let values = unique_values(&ds, 0, &Locale::default(), 100);
        let displays: Vec<&str> = values.iter().map(|v| v.display.as_str()).collect();
        assert_eq!(displays, vec!["2", "10", "1,000", "n/a"]);
        assert_eq!(values[0].count, 2);
    }

    #[test]
    fn test_unique_values_natural_order_and_limit() {
        let ds = Dataset::new(
            vec![text_column()],
            vec![
                vec![CellValue::from("Item 10")],
                vec![CellValue::from("item 2")],
                vec![CellValue::from("Item 2")],
                vec![CellValue::from("Item 1")],
            ],
        );
        let values = unique_values(&ds, 0, &Locale::default(), 2);
        let displays: Vec<&str> = values.iter().map(|v| v.display.as_str()).collect();
        assert_eq!(displays, vec!["Item 1", "item 2"]);
        assert_eq!(values[1].count, 2);
    }
}
