//! Central dataset state with a single update entry point.
//!
//! Every mutation goes through [`DatasetStore::apply`]. Each applied update
//! advances a logical clock and stamps only the state slices whose content
//! actually changed, so downstream memoization (pipeline stages, selectors)
//! can tell an unrelated edit from a relevant one by comparing revisions.
//!
//! Single writer: callers serialize updates; readers borrow the store
//! between updates.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::aggregate::AggregationSpec;
use crate::column::{Column, ColumnType, Dataset, Row};
use crate::filter::{self, ColumnFilter, FilterCondition, FilterConfigError, UniqueValue};
use crate::locale::{DateFormat, Locale, NumberFormat};
use crate::sort::{SortDirection, SortLevel, SortSpec};
use crate::validation::ValidationState;
use crate::value::CellValue;

// ============================================================================
// Revisions
// ============================================================================

/// Whole-store state slices with a single revision each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateSlice {
    /// Row or column count/order.
    Structure,
    /// Column ids, types and date patterns.
    Columns,
    /// Column names and widths.
    Headers,
    Locale,
    Filters,
    Sort,
    Aggregation,
    Duplicates,
    EmptyColumns,
}

/// Revision stamps. A stamp moves only when its slice changed.
#[derive(Debug, Clone, Default)]
pub struct Revisions {
    clock: u64,
    structure: u64,
    columns: u64,
    headers: u64,
    locale: u64,
    filters: u64,
    sort: u64,
    aggregation: u64,
    duplicates: u64,
    empty_columns: u64,
    column_content: Vec<u64>,
    row_content: Vec<u64>,
    row_errors: FxHashMap<usize, u64>,
    selection: FxHashMap<usize, u64>,
}

impl Revisions {
    fn new(rows: usize, cols: usize) -> Self {
        let mut revisions = Self::default();
        revisions.touch_structure(rows, cols);
        for slice in [
            StateSlice::Columns,
            StateSlice::Headers,
            StateSlice::Locale,
            StateSlice::Filters,
            StateSlice::Sort,
            StateSlice::Aggregation,
            StateSlice::Duplicates,
            StateSlice::EmptyColumns,
        ] {
            revisions.touch(slice);
        }
        revisions
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Latest stamp handed out.
    pub fn current(&self) -> u64 {
        self.clock
    }

    pub fn of(&self, slice: StateSlice) -> u64 {
        match slice {
            StateSlice::Structure => self.structure,
            StateSlice::Columns => self.columns,
            StateSlice::Headers => self.headers,
            StateSlice::Locale => self.locale,
            StateSlice::Filters => self.filters,
            StateSlice::Sort => self.sort,
            StateSlice::Aggregation => self.aggregation,
            StateSlice::Duplicates => self.duplicates,
            StateSlice::EmptyColumns => self.empty_columns,
        }
    }

    pub fn column_content(&self, col: usize) -> u64 {
        self.column_content.get(col).copied().unwrap_or(self.structure)
    }

    pub fn row_content(&self, row: usize) -> u64 {
        self.row_content.get(row).copied().unwrap_or(self.structure)
    }

    pub fn row_errors(&self, row: usize) -> u64 {
        self.row_errors.get(&row).copied().unwrap_or(0)
    }

    pub fn selection(&self, row: usize) -> u64 {
        self.selection.get(&row).copied().unwrap_or(0)
    }

    fn touch(&mut self, slice: StateSlice) {
        let rev = self.tick();
        let slot = match slice {
            StateSlice::Structure => &mut self.structure,
            StateSlice::Columns => &mut self.columns,
            StateSlice::Headers => &mut self.headers,
            StateSlice::Locale => &mut self.locale,
            StateSlice::Filters => &mut self.filters,
            StateSlice::Sort => &mut self.sort,
            StateSlice::Aggregation => &mut self.aggregation,
            StateSlice::Duplicates => &mut self.duplicates,
            StateSlice::EmptyColumns => &mut self.empty_columns,
        };
        *slot = rev;
    }

    /// Row/column indices shifted: every per-index stamp restarts at the new
    /// structure revision.
    fn touch_structure(&mut self, rows: usize, cols: usize) {
        let rev = self.tick();
        self.structure = rev;
        self.row_content = vec![rev; rows];
        self.column_content = vec![rev; cols];
        self.row_errors.clear();
        self.selection.clear();
    }

    fn touch_cell(&mut self, row: usize, col: usize) {
        let rev = self.tick();
        if let Some(slot) = self.row_content.get_mut(row) {
            *slot = rev;
        }
        if let Some(slot) = self.column_content.get_mut(col) {
            *slot = rev;
        }
    }

    fn touch_column_content(&mut self, col: usize) {
        let rev = self.tick();
        if let Some(slot) = self.column_content.get_mut(col) {
            *slot = rev;
        }
    }

    fn touch_row_errors(&mut self, row: usize) {
        let rev = self.tick();
        self.row_errors.insert(row, rev);
    }

    fn touch_selection(&mut self, row: usize) {
        let rev = self.tick();
        self.selection.insert(row, rev);
    }
}

// ============================================================================
// Updates
// ============================================================================

/// Sort-level edits, applied with the [`SortSpec`] editing protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum SortEdit {
    AddLevel,
    SetColumn { index: usize, column_id: String },
    SetDirection { index: usize, direction: SortDirection },
    ToggleDirection { index: usize },
    RemoveLevel { index: usize },
    Clear,
}

/// One logical change. Columns are addressed by index, filters and sort
/// levels by column id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Update {
    Load {
        columns: Vec<Column>,
        #[serde(default)]
        rows: Vec<Row>,
    },
    EditCell {
        row: usize,
        col: usize,
        value: CellValue,
    },
    InsertRow {
        index: usize,
        #[serde(default)]
        cells: Row,
    },
    DeleteRow {
        index: usize,
    },
    InsertColumn {
        index: usize,
        column: Column,
    },
    DeleteColumn {
        index: usize,
    },
    RenameColumn {
        col: usize,
        name: String,
    },
    SetColumnType {
        col: usize,
        column_type: ColumnType,
    },
    SetColumnDateFormat {
        col: usize,
        date_format: Option<String>,
    },
    SetColumnWidth {
        col: usize,
        width: f32,
    },
    SetFilters {
        filters: Vec<ColumnFilter>,
    },
    SetColumnFilter {
        filter: ColumnFilter,
    },
    ClearColumnFilter {
        column_id: String,
    },
    SetSort {
        levels: Vec<SortLevel>,
    },
    EditSort {
        edit: SortEdit,
    },
    SetAggregation {
        spec: Option<AggregationSpec>,
    },
    ToggleRowSelection {
        row: usize,
    },
    SetRowSelected {
        row: usize,
        selected: bool,
    },
    ClearSelection,
    SetNumberFormat {
        format: NumberFormat,
    },
    SetDateFormat {
        format: DateFormat,
    },
}

impl Update {
    pub fn kind(&self) -> &'static str {
        match self {
            Update::Load { .. } => "load",
            Update::EditCell { .. } => "edit_cell",
            Update::InsertRow { .. } => "insert_row",
            Update::DeleteRow { .. } => "delete_row",
            Update::InsertColumn { .. } => "insert_column",
            Update::DeleteColumn { .. } => "delete_column",
            Update::RenameColumn { .. } => "rename_column",
            Update::SetColumnType { .. } => "set_column_type",
            Update::SetColumnDateFormat { .. } => "set_column_date_format",
            Update::SetColumnWidth { .. } => "set_column_width",
            Update::SetFilters { .. } => "set_filters",
            Update::SetColumnFilter { .. } => "set_column_filter",
            Update::ClearColumnFilter { .. } => "clear_column_filter",
            Update::SetSort { .. } => "set_sort",
            Update::EditSort { .. } => "edit_sort",
            Update::SetAggregation { .. } => "set_aggregation",
            Update::ToggleRowSelection { .. } => "toggle_row_selection",
            Update::SetRowSelected { .. } => "set_row_selected",
            Update::ClearSelection => "clear_selection",
            Update::SetNumberFormat { .. } => "set_number_format",
            Update::SetDateFormat { .. } => "set_date_format",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// False when the update was a no-op (same value, out of range, invalid).
    pub changed: bool,
    /// Store clock after the update.
    pub revision: u64,
}

// ============================================================================
// DatasetStore
// ============================================================================

#[derive(Debug, Clone)]
pub struct DatasetStore {
    dataset: Dataset,
    locale: Locale,
    filters: Vec<ColumnFilter>,
    sort: SortSpec,
    aggregation: Option<AggregationSpec>,
    selection: FxHashSet<usize>,
    validation: ValidationState,
    revisions: Revisions,
}

impl Default for DatasetStore {
    fn default() -> Self {
        Self::new(Dataset::default(), Locale::default())
    }
}

impl DatasetStore {
    pub fn new(dataset: Dataset, locale: Locale) -> Self {
        let validation = ValidationState::compute(&dataset, &locale);
        let revisions = Revisions::new(dataset.row_count(), dataset.column_count());
        Self {
            dataset,
            locale,
            filters: Vec::new(),
            sort: SortSpec::default(),
            aggregation: None,
            selection: FxHashSet::default(),
            validation,
            revisions,
        }
    }

    /// Apply one update. Degraded input (out-of-range index, unknown id,
    /// invalid format) is logged and becomes a no-op.
    pub fn apply(&mut self, update: Update) -> UpdateOutcome {
        let kind = update.kind();
        let changed = match update {
            Update::Load { columns, rows } => self.load(Dataset::new(columns, rows)),
            Update::EditCell { row, col, value } => self.edit_cell(row, col, value),
            Update::InsertRow { index, cells } => self.insert_row(index, cells),
            Update::DeleteRow { index } => self.delete_row(index),
            Update::InsertColumn { index, column } => self.insert_column(index, column),
            Update::DeleteColumn { index } => self.delete_column(index),
            Update::RenameColumn { col, name } => self.rename_column(col, name),
            Update::SetColumnType { col, column_type } => self.set_column_type(col, column_type),
            Update::SetColumnDateFormat { col, date_format } => {
                self.set_column_date_format(col, date_format)
            }
            Update::SetColumnWidth { col, width } => self.set_column_width(col, width),
            Update::SetFilters { filters } => self.set_filters(filters),
            Update::SetColumnFilter { filter } => self.set_column_filter(filter),
            Update::ClearColumnFilter { column_id } => self.clear_column_filter(&column_id),
            Update::SetSort { levels } => self.set_sort(SortSpec::from_levels(levels)),
            Update::EditSort { edit } => self.edit_sort(edit),
            Update::SetAggregation { spec } => self.set_aggregation(spec),
            Update::ToggleRowSelection { row } => {
                let selected = !self.selection.contains(&row);
                self.set_row_selected(row, selected)
            }
            Update::SetRowSelected { row, selected } => self.set_row_selected(row, selected),
            Update::ClearSelection => self.clear_selection(),
            Update::SetNumberFormat { format } => self.set_number_format(format),
            Update::SetDateFormat { format } => self.set_date_format(format),
        };
        let revision = self.revisions.current();
        log::debug!("store update {kind}: changed={changed} revision={revision}");
        UpdateOutcome { changed, revision }
    }

    // ------------------------------------------------------------------------
    // Data
    // ------------------------------------------------------------------------

    fn load(&mut self, dataset: Dataset) -> bool {
        self.dataset = dataset;
        self.filters.clear();
        self.sort.clear();
        self.aggregation = None;
        self.selection.clear();
        self.revisions
            .touch_structure(self.dataset.row_count(), self.dataset.column_count());
        for slice in [
            StateSlice::Columns,
            StateSlice::Headers,
            StateSlice::Filters,
            StateSlice::Sort,
            StateSlice::Aggregation,
        ] {
            self.revisions.touch(slice);
        }
        self.revalidate(true);
        true
    }

    fn edit_cell(&mut self, row: usize, col: usize, value: CellValue) -> bool {
        if row >= self.dataset.row_count() || col >= self.dataset.column_count() {
            log::warn!(
                "edit_cell out of range: ({row}, {col}) in {}x{}",
                self.dataset.row_count(),
                self.dataset.column_count()
            );
            return false;
        }
        if self.dataset.cell(row, col) == &value {
            return false;
        }
        let Some(old) = self.dataset.set_cell(row, col, value) else {
            return false;
        };
        self.revisions.touch_cell(row, col);

        let delta =
            self.validation
                .update_cell(&self.dataset, row, col, old.is_blank(), &self.locale);
        if delta.row_errors_changed {
            self.revisions.touch_row_errors(row);
        }
        if delta.empty_columns_changed {
            self.revisions.touch(StateSlice::EmptyColumns);
        }
        true
    }

    fn insert_row(&mut self, index: usize, cells: Row) -> bool {
        let index = self.dataset.insert_row(index, cells);
        self.selection = self
            .selection
            .iter()
            .map(|&r| if r >= index { r + 1 } else { r })
            .collect();
        self.touch_structure();
        self.revalidate(true);
        true
    }

    fn delete_row(&mut self, index: usize) -> bool {
        if self.dataset.remove_row(index).is_none() {
            log::warn!("delete_row out of range: {index}");
            return false;
        }
        self.selection = self
            .selection
            .iter()
            .filter(|&&r| r != index)
            .map(|&r| if r > index { r - 1 } else { r })
            .collect();
        self.touch_structure();
        self.revalidate(true);
        true
    }

    fn insert_column(&mut self, index: usize, column: Column) -> bool {
        if self.dataset.column_index(&column.id).is_some() {
            log::warn!("insert_column: id '{}' already exists", column.id);
            return false;
        }
        self.dataset.insert_column(index, column);
        self.touch_structure();
        self.revisions.touch(StateSlice::Columns);
        self.revisions.touch(StateSlice::Headers);
        self.revalidate(true);
        true
    }

    fn delete_column(&mut self, index: usize) -> bool {
        let Some(column) = self.dataset.remove_column(index) else {
            log::warn!("delete_column out of range: {index}");
            return false;
        };
        let id = column.id.as_str();

        let filters_before = self.filters.len();
        self.filters.retain(|f| f.column_id != id);
        if self.filters.len() != filters_before {
            self.revisions.touch(StateSlice::Filters);
        }
        if self.sort.remove_column(id) {
            self.revisions.touch(StateSlice::Sort);
        }
        if let Some(spec) = self.aggregation.as_mut() {
            if spec.remove_column(id) {
                self.revisions.touch(StateSlice::Aggregation);
            }
        }

        self.touch_structure();
        self.revisions.touch(StateSlice::Columns);
        self.revisions.touch(StateSlice::Headers);
        self.revalidate(true);
        true
    }

    // ------------------------------------------------------------------------
    // Column metadata
    // ------------------------------------------------------------------------

    fn column_mut_checked(&mut self, col: usize, op: &str) -> Option<&mut Column> {
        let count = self.dataset.column_count();
        let column = self.dataset.column_mut(col);
        if column.is_none() {
            log::warn!("{op}: column {col} out of range ({count} columns)");
        }
        column
    }

    fn rename_column(&mut self, col: usize, name: String) -> bool {
        let Some(column) = self.column_mut_checked(col, "rename_column") else {
            return false;
        };
        if column.name == name {
            return false;
        }
        column.name = name;
        self.revisions.touch(StateSlice::Headers);
        if self.validation.recheck_duplicates(self.dataset.columns()) {
            self.revisions.touch(StateSlice::Duplicates);
        }
        true
    }

    fn set_column_type(&mut self, col: usize, column_type: ColumnType) -> bool {
        let Some(column) = self.column_mut_checked(col, "set_column_type") else {
            return false;
        };
        if column.column_type == column_type {
            return false;
        }
        column.column_type = column_type;
        self.column_parse_rules_changed(col);
        true
    }

    fn set_column_date_format(&mut self, col: usize, date_format: Option<String>) -> bool {
        let date_format = date_format.filter(|p| !p.trim().is_empty());
        let Some(column) = self.column_mut_checked(col, "set_column_date_format") else {
            return false;
        };
        if column.date_format == date_format {
            return false;
        }
        column.date_format = date_format;
        self.column_parse_rules_changed(col);
        true
    }

    fn column_parse_rules_changed(&mut self, col: usize) {
        self.revisions.touch(StateSlice::Columns);
        self.revisions.touch_column_content(col);
        for row in self.validation.recheck_column(&self.dataset, col, &self.locale) {
            self.revisions.touch_row_errors(row);
        }
    }

    fn set_column_width(&mut self, col: usize, width: f32) -> bool {
        let Some(column) = self.column_mut_checked(col, "set_column_width") else {
            return false;
        };
        if column.width == width {
            return false;
        }
        column.width = width;
        self.revisions.touch(StateSlice::Headers);
        true
    }

    // ------------------------------------------------------------------------
    // Filters, sort, aggregation
    // ------------------------------------------------------------------------

    fn set_filters(&mut self, filters: Vec<ColumnFilter>) -> bool {
        if self.filters == filters {
            return false;
        }
        self.filters = filters;
        self.revisions.touch(StateSlice::Filters);
        true
    }

    fn set_column_filter(&mut self, filter: ColumnFilter) -> bool {
        if !filter.is_active() {
            return self.clear_column_filter(&filter.column_id);
        }
        let mut filters = self.filters.clone();
        match filters.iter_mut().find(|f| f.column_id == filter.column_id) {
            Some(existing) => *existing = filter,
            None => filters.push(filter),
        }
        self.set_filters(filters)
    }

    fn clear_column_filter(&mut self, column_id: &str) -> bool {
        let mut filters = self.filters.clone();
        filters.retain(|f| f.column_id != column_id);
        self.set_filters(filters)
    }

    fn set_sort(&mut self, sort: SortSpec) -> bool {
        if self.sort == sort {
            return false;
        }
        self.sort = sort;
        self.revisions.touch(StateSlice::Sort);
        true
    }

    fn edit_sort(&mut self, edit: SortEdit) -> bool {
        let changed = match edit {
            SortEdit::AddLevel => self.sort.add_level(self.dataset.columns()),
            SortEdit::SetColumn { index, column_id } => {
                self.sort.set_level_column(index, &column_id)
            }
            SortEdit::SetDirection { index, direction } => {
                self.sort.set_level_direction(index, direction)
            }
            SortEdit::ToggleDirection { index } => self.sort.toggle_direction(index),
            SortEdit::RemoveLevel { index } => self.sort.remove_level(index),
            SortEdit::Clear => self.sort.clear(),
        };
        if changed {
            self.revisions.touch(StateSlice::Sort);
        }
        changed
    }

    fn set_aggregation(&mut self, spec: Option<AggregationSpec>) -> bool {
        if self.aggregation == spec {
            return false;
        }
        self.aggregation = spec;
        self.revisions.touch(StateSlice::Aggregation);
        true
    }

    // ------------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------------

    fn set_row_selected(&mut self, row: usize, selected: bool) -> bool {
        if row >= self.dataset.row_count() {
            log::warn!("selection out of range: row {row}");
            return false;
        }
        let changed = if selected {
            self.selection.insert(row)
        } else {
            self.selection.remove(&row)
        };
        if changed {
            self.revisions.touch_selection(row);
        }
        changed
    }

    fn clear_selection(&mut self) -> bool {
        if self.selection.is_empty() {
            return false;
        }
        let rows: Vec<usize> = self.selection.drain().collect();
        for row in rows {
            self.revisions.touch_selection(row);
        }
        true
    }

    // ------------------------------------------------------------------------
    // Locale
    // ------------------------------------------------------------------------

    fn set_number_format(&mut self, format: NumberFormat) -> bool {
        if let Err(err) = format.validate() {
            log::warn!("rejected number format: {err}");
            return false;
        }
        if self.locale.number == format {
            return false;
        }
        self.locale.number = format;
        self.revisions.touch(StateSlice::Locale);
        self.revalidate(false);
        true
    }

    fn set_date_format(&mut self, format: DateFormat) -> bool {
        if self.locale.date == format {
            return false;
        }
        self.locale.date = format;
        self.revisions.touch(StateSlice::Locale);
        self.revalidate(false);
        true
    }

    // ------------------------------------------------------------------------
    // Validation bookkeeping
    // ------------------------------------------------------------------------

    fn touch_structure(&mut self) {
        self.revisions
            .touch_structure(self.dataset.row_count(), self.dataset.column_count());
    }

    /// Full recompute. With `structural` the per-row stamps were already
    /// reset; otherwise only rows whose error list changed are stamped.
    fn revalidate(&mut self, structural: bool) {
        let next = ValidationState::compute(&self.dataset, &self.locale);
        if !structural {
            for row in next.changed_rows(&self.validation) {
                self.revisions.touch_row_errors(row);
            }
        }
        if next.duplicate_columns() != self.validation.duplicate_columns() {
            self.revisions.touch(StateSlice::Duplicates);
        }
        if next.empty_columns() != self.validation.empty_columns() {
            self.revisions.touch(StateSlice::EmptyColumns);
        }
        self.validation = next;
    }

    // ------------------------------------------------------------------------
    // Readers
    // ------------------------------------------------------------------------

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn columns(&self) -> &[Column] {
        self.dataset.columns()
    }

    pub fn locale(&self) -> &Locale {
        &self.locale
    }

    pub fn filters(&self) -> &[ColumnFilter] {
        &self.filters
    }

    pub fn column_filter(&self, column_id: &str) -> Option<&ColumnFilter> {
        self.filters.iter().find(|f| f.column_id == column_id)
    }

    pub fn sort(&self) -> &SortSpec {
        &self.sort
    }

    pub fn aggregation(&self) -> Option<&AggregationSpec> {
        self.aggregation.as_ref()
    }

    pub fn validation(&self) -> &ValidationState {
        &self.validation
    }

    pub fn revisions(&self) -> &Revisions {
        &self.revisions
    }

    pub fn is_row_selected(&self, row: usize) -> bool {
        self.selection.contains(&row)
    }

    pub fn selected_rows(&self) -> Vec<usize> {
        let mut rows: Vec<usize> = self.selection.iter().copied().collect();
        rows.sort_unstable();
        rows
    }

    /// Distinct values of column `col` over the original rows, regardless
    /// of active filters, sort or aggregation.
    pub fn unique_values(&self, col: usize, limit: usize) -> Vec<UniqueValue> {
        filter::unique_values(&self.dataset, col, &self.locale, limit)
    }

    /// Pre-check a condition for the column with id `column_id`.
    pub fn validate_filter_condition(
        &self,
        column_id: &str,
        condition: &FilterCondition,
    ) -> Result<(), FilterConfigError> {
        let column = self
            .dataset
            .column_index(column_id)
            .and_then(|col| self.dataset.column(col))
            .ok_or_else(|| FilterConfigError::UnknownColumn(column_id.to_string()))?;
        filter::validate_condition(condition, column, &self.locale)
    }
}
