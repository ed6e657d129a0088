//! Typed tabular dataset engine.
//!
//! Columns carry a type (text, number, date); cells keep their raw value
//! and are parsed on demand under the active [`Locale`]. On top of that:
//! filter -> sort -> aggregate as a memoized pipeline, advisory validation,
//! and per-row/column/cell selectors that only recompute when their own
//! inputs change. All mutation goes through [`DatasetStore::apply`].

pub mod aggregate;
pub mod chart;
pub mod column;
pub mod error;
pub mod export;
pub mod filter;
pub mod locale;
pub mod selectors;
pub mod sort;
pub mod store;
pub mod validation;
pub mod value;
pub mod view;

pub use aggregate::{AggregatedView, AggregationSpec, MetricSpec, Reducer};
pub use chart::{ChartConfig, ChartData, ChartSeries};
pub use column::{Column, ColumnType, Dataset, Row};
pub use error::EngineError;
pub use export::{to_csv, DisplayTable};
pub use filter::{
    ColumnFilter, FilterCondition, FilterConfigError, FilterOperator, FilterValue, UniqueValue,
};
pub use locale::{DateFormat, Granularity, Locale, NumberFormat};
pub use selectors::{SelectorCache, SelectorId, SelectorKey, SelectorValue};
pub use sort::{SortDirection, SortLevel, SortSpec};
pub use store::{DatasetStore, Revisions, SortEdit, StateSlice, Update, UpdateOutcome};
pub use validation::{DuplicateColumns, ValidationState};
pub use value::CellValue;
pub use view::{DerivedView, Pipeline, RowView, StageRuns};
