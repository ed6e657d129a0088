//! Row View Layer and the derived-view pipeline.
//!
//! This module maps between:
//! - View space (what the grid shows, affected by sort/filter)
//! - Data space (canonical storage, row 0..N-1)
//!
//! Key invariants:
//! - visible_mask is indexed by DATA row (not view row)
//! - row_order is a permutation of all data rows; filtering never reorders
//! - Pipeline order is fixed: filter -> sort -> aggregate
//! - Each stage recomputes only when a revision it reads has moved

use crate::aggregate::{self, AggregatedView};
use crate::column::{Column, Dataset};
use crate::export::{self, DisplayTable};
use crate::filter::CompiledFilter;
use crate::locale::Locale;
use crate::sort;
use crate::store::{DatasetStore, StateSlice};
use crate::value::CellValue;

static EMPTY: CellValue = CellValue::Empty;

// =============================================================================
// RowView: view <-> data mapping
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowView {
    /// view_row -> data_row, over every data row (hidden rows included)
    row_order: Vec<usize>,

    /// Inverse of row_order: data_row -> view_row
    data_to_view_map: Vec<usize>,

    /// Visibility per DATA row; true = passes the filter
    visible_mask: Vec<bool>,

    /// Visible DATA rows in view order. This is what the grid iterates.
    visible_rows: Vec<usize>,
}

impl RowView {
    /// Identity mapping for N rows, everything visible.
    pub fn new(row_count: usize) -> Self {
        Self::from_parts((0..row_count).collect(), vec![true; row_count])
    }

    /// Build from a sort permutation and a filter mask over the same rows.
    pub fn from_parts(row_order: Vec<usize>, visible_mask: Vec<bool>) -> Self {
        let mut view = Self {
            row_order,
            data_to_view_map: Vec::new(),
            visible_mask,
            visible_rows: Vec::new(),
        };
        view.rebuild_inverse_map();
        view.rebuild_visible_cache();
        view
    }

    /// Total number of data rows.
    pub fn row_count(&self) -> usize {
        self.row_order.len()
    }

    pub fn visible_count(&self) -> usize {
        self.visible_rows.len()
    }

    /// Map view row to data row.
    pub fn view_to_data(&self, view_row: usize) -> Option<usize> {
        self.row_order.get(view_row).copied()
    }

    /// Map data row to view row. None if the row is hidden by a filter.
    pub fn data_to_view(&self, data_row: usize) -> Option<usize> {
        if self.is_data_row_visible(data_row) {
            self.data_to_view_map.get(data_row).copied()
        } else {
            None
        }
    }

    pub fn is_data_row_visible(&self, data_row: usize) -> bool {
        self.visible_mask.get(data_row).copied().unwrap_or(false)
    }

    /// Visible data rows in display order.
    pub fn visible_rows(&self) -> &[usize] {
        &self.visible_rows
    }

    /// Data row shown at display position `n`.
    pub fn nth_visible(&self, n: usize) -> Option<usize> {
        self.visible_rows.get(n).copied()
    }

    pub fn is_filtered(&self) -> bool {
        self.visible_count() < self.row_count()
    }

    /// Is the view sorted (non-identity order)?
    pub fn is_sorted(&self) -> bool {
        self.row_order.iter().enumerate().any(|(i, &d)| i != d)
    }

    fn rebuild_inverse_map(&mut self) {
        self.data_to_view_map = vec![0; self.row_order.len()];
        for (view_row, &data_row) in self.row_order.iter().enumerate() {
            if let Some(slot) = self.data_to_view_map.get_mut(data_row) {
                *slot = view_row;
            }
        }
    }

    fn rebuild_visible_cache(&mut self) {
        self.visible_rows = self
            .row_order
            .iter()
            .copied()
            .filter(|&data_row| self.visible_mask.get(data_row).copied().unwrap_or(false))
            .collect();
    }
}

// =============================================================================
// DerivedView: what the grid renders
// =============================================================================

/// The rows actually shown: either the filtered/sorted original rows, or
/// the aggregated rows built from them.
#[derive(Debug, Clone, Copy)]
pub enum DerivedView<'a> {
    Rows {
        dataset: &'a Dataset,
        rows: &'a RowView,
    },
    Aggregated(&'a AggregatedView),
}

impl<'a> DerivedView<'a> {
    pub fn is_aggregated(&self) -> bool {
        matches!(self, DerivedView::Aggregated(_))
    }

    pub fn columns(&self) -> &'a [Column] {
        match *self {
            DerivedView::Rows { dataset, .. } => dataset.columns(),
            DerivedView::Aggregated(view) => view.columns(),
        }
    }

    pub fn row_count(&self) -> usize {
        match self {
            DerivedView::Rows { rows, .. } => rows.visible_count(),
            DerivedView::Aggregated(view) => view.rows().len(),
        }
    }

    /// Cell at display position (`row`, `col`); `Empty` when out of range.
    pub fn cell(&self, row: usize, col: usize) -> &'a CellValue {
        match *self {
            DerivedView::Rows { dataset, rows } => match rows.nth_visible(row) {
                Some(data_row) => dataset.cell(data_row, col),
                None => &EMPTY,
            },
            DerivedView::Aggregated(view) => view.dataset().cell(row, col),
        }
    }

    /// Original data rows behind display row `row`.
    pub fn source_rows(&self, row: usize) -> Vec<usize> {
        match self {
            DerivedView::Rows { rows, .. } => rows.nth_visible(row).into_iter().collect(),
            DerivedView::Aggregated(view) => view.source_rows(row).to_vec(),
        }
    }

    /// Locale-formatted headers and rows, in display order.
    pub fn to_display_table(&self, locale: &Locale) -> DisplayTable {
        match self {
            DerivedView::Rows { dataset, rows } => export::flatten(
                dataset.columns(),
                rows.visible_rows()
                    .iter()
                    .filter_map(|&r| dataset.rows().get(r)),
                locale,
            ),
            DerivedView::Aggregated(view) => {
                export::flatten(view.columns(), view.rows().iter(), locale)
            }
        }
    }
}

// =============================================================================
// Pipeline: memoized filter -> sort -> aggregate
// =============================================================================

/// How often each stage actually ran.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageRuns {
    /// Full filter evaluations over every row.
    pub filter: usize,
    /// Incremental filter passes that re-evaluated only edited rows.
    pub filter_partial: usize,
    pub sort: usize,
    pub aggregate: usize,
}

#[derive(Debug, Clone, Default)]
struct MaskStage {
    /// structure, columns, locale, filters
    deps: Option<[u64; 4]>,
    computed_at: u64,
    filter: CompiledFilter,
    mask: Vec<bool>,
    generation: u64,
}

#[derive(Debug, Clone, Default)]
struct OrderStage {
    /// structure, columns, locale, sort
    deps: Option<[u64; 4]>,
    /// content revisions of the sort columns
    content: Vec<u64>,
    order: Vec<usize>,
    generation: u64,
}

#[derive(Debug, Clone, Default)]
struct AggregateStage {
    /// columns, headers, locale, aggregation
    deps: Option<[u64; 4]>,
    /// (mask generation, order generation)
    input: Option<(u64, u64)>,
    /// content revisions of the aggregated columns
    content: Vec<u64>,
    output: Option<AggregatedView>,
}

#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    mask: MaskStage,
    order: OrderStage,
    aggregate: AggregateStage,
    rows: RowView,
    rows_built_from: Option<(u64, u64)>,
    runs: StageRuns,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage_runs(&self) -> StageRuns {
        self.runs
    }

    /// Row view as of the last refresh.
    pub fn row_view(&self) -> &RowView {
        &self.rows
    }

    /// Bring every stage up to date with `store` and return the view.
    pub fn view<'a>(&'a mut self, store: &'a DatasetStore) -> DerivedView<'a> {
        self.refresh(store);
        match &self.aggregate.output {
            Some(view) => DerivedView::Aggregated(view),
            None => DerivedView::Rows {
                dataset: store.dataset(),
                rows: &self.rows,
            },
        }
    }

    pub fn refresh(&mut self, store: &DatasetStore) {
        self.refresh_mask(store);
        self.refresh_order(store);

        let built_from = (self.mask.generation, self.order.generation);
        if self.rows_built_from != Some(built_from) {
            self.rows = RowView::from_parts(self.order.order.clone(), self.mask.mask.clone());
            self.rows_built_from = Some(built_from);
        }

        self.refresh_aggregate(store);
    }

    fn refresh_mask(&mut self, store: &DatasetStore) {
        let revs = store.revisions();
        let dataset = store.dataset();
        let deps = [
            revs.of(StateSlice::Structure),
            revs.of(StateSlice::Columns),
            revs.of(StateSlice::Locale),
            revs.of(StateSlice::Filters),
        ];
        let stage = &mut self.mask;

        if stage.deps != Some(deps) {
            stage.filter = CompiledFilter::compile(store.filters(), dataset, store.locale());
            let mask = stage.filter.filter_mask(dataset);
            if stage.deps.is_none() || mask != stage.mask {
                stage.mask = mask;
                stage.generation += 1;
            }
            stage.deps = Some(deps);
            self.runs.filter += 1;
            log::trace!("filter stage: full pass over {} rows", dataset.row_count());
        } else {
            let since = stage.computed_at;
            let stale = stage
                .filter
                .columns()
                .any(|col| revs.column_content(col) > since);
            if stale {
                let mut changed = false;
                for row in 0..dataset.row_count() {
                    if revs.row_content(row) <= since {
                        continue;
                    }
                    let visible = stage.filter.matches_row(dataset, row);
                    if let Some(slot) = stage.mask.get_mut(row) {
                        if *slot != visible {
                            *slot = visible;
                            changed = true;
                        }
                    }
                }
                if changed {
                    stage.generation += 1;
                }
                self.runs.filter_partial += 1;
                log::trace!("filter stage: re-evaluated edited rows (changed={changed})");
            } else {
                log::trace!("filter stage: memo hit");
            }
        }
        stage.computed_at = revs.current();
    }

    fn refresh_order(&mut self, store: &DatasetStore) {
        let revs = store.revisions();
        let dataset = store.dataset();
        let deps = [
            revs.of(StateSlice::Structure),
            revs.of(StateSlice::Columns),
            revs.of(StateSlice::Locale),
            revs.of(StateSlice::Sort),
        ];
        let content: Vec<u64> = store
            .sort()
            .levels()
            .iter()
            .filter_map(|level| dataset.column_index(&level.column_id))
            .map(|col| revs.column_content(col))
            .collect();
        let stage = &mut self.order;

        if stage.deps == Some(deps) && stage.content == content {
            log::trace!("sort stage: memo hit");
            return;
        }

        let all_rows: Vec<usize> = (0..dataset.row_count()).collect();
        let order = if store.sort().is_empty() {
            all_rows
        } else {
            sort::sort_rows(dataset, &all_rows, store.sort(), store.locale())
        };
        if stage.deps.is_none() || order != stage.order {
            stage.order = order;
            stage.generation += 1;
        }
        stage.deps = Some(deps);
        stage.content = content;
        self.runs.sort += 1;
        log::trace!("sort stage: ordered {} rows", dataset.row_count());
    }

    fn refresh_aggregate(&mut self, store: &DatasetStore) {
        let stage = &mut self.aggregate;
        let Some(spec) = store.aggregation().filter(|spec| spec.is_active()) else {
            stage.deps = None;
            stage.output = None;
            return;
        };

        let revs = store.revisions();
        let dataset = store.dataset();
        // Output column names are derived from the source headers.
        let deps = [
            revs.of(StateSlice::Columns),
            revs.of(StateSlice::Headers),
            revs.of(StateSlice::Locale),
            revs.of(StateSlice::Aggregation),
        ];
        let input = (self.mask.generation, self.order.generation);
        let content: Vec<u64> = spec
            .column_ids()
            .filter_map(|id| dataset.column_index(id))
            .map(|col| revs.column_content(col))
            .collect();

        if stage.deps == Some(deps)
            && stage.input == Some(input)
            && stage.content == content
            && stage.output.is_some()
        {
            log::trace!("aggregate stage: memo hit");
            return;
        }

        let view = aggregate::aggregate(dataset, self.rows.visible_rows(), spec, store.locale());
        log::trace!("aggregate stage: {} groups", view.groups().len());
        stage.output = Some(view);
        stage.deps = Some(deps);
        stage.input = Some(input);
        stage.content = content;
        self.runs.aggregate += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{AggregationSpec, MetricSpec, Reducer};
    use crate::filter::{ColumnFilter, FilterCondition, FilterOperator};
    use crate::sort::{SortDirection, SortLevel};
    use crate::store::Update;

    fn store() -> DatasetStore {
        let dataset = Dataset::new(
            vec![
                Column::text("region", "Region"),
                Column::number("qty", "Qty"),
                Column::text("note", "Note"),
            ],
            vec![
                vec!["west".into(), "10".into(), "".into()],
                vec!["east".into(), "5".into(), "".into()],
                vec!["west".into(), "-2".into(), "".into()],
                vec!["north".into(), "abc".into(), "".into()],
            ],
        );
        DatasetStore::new(dataset, Locale::default())
    }

    fn positive_qty() -> Update {
        Update::SetFilters {
            filters: vec![ColumnFilter::single(
                "qty",
                FilterCondition::new(FilterOperator::GreaterThan, 0.0),
            )],
        }
    }

    #[test]
    fn test_row_view_mapping() {
        let view = RowView::from_parts(vec![2, 0, 1], vec![true, false, true]);
        assert_eq!(view.visible_rows(), &[2, 1]);
        assert_eq!(view.view_to_data(0), Some(2));
        assert_eq!(view.data_to_view(1), Some(2));
        assert_eq!(view.data_to_view(0), None);
        assert!(view.is_filtered());
        assert!(view.is_sorted());
        assert_eq!(view.view_to_data(9), None);
    }

    #[test]
    fn test_identity_view() {
        let store = store();
        let mut pipeline = Pipeline::new();
        let view = pipeline.view(&store);
        assert_eq!(view.row_count(), 4);
        assert!(!view.is_aggregated());
        assert_eq!(view.cell(1, 0), &CellValue::from("east"));
        assert_eq!(view.cell(9, 0), &CellValue::Empty);
    }

    #[test]
    fn test_filter_then_sort() {
        let mut store = store();
        store.apply(positive_qty());
        store.apply(Update::SetSort {
            levels: vec![SortLevel::new("qty", SortDirection::Asc)],
        });
        let mut pipeline = Pipeline::new();
        let view = pipeline.view(&store);
        assert_eq!(view.source_rows(0), vec![1]);
        assert_eq!(view.source_rows(1), vec![0]);
        assert_eq!(view.row_count(), 2);
    }

    #[test]
    fn test_unrelated_edit_hits_memo() {
        let mut store = store();
        store.apply(positive_qty());
        store.apply(Update::SetSort {
            levels: vec![SortLevel::new("qty", SortDirection::Desc)],
        });
        let mut pipeline = Pipeline::new();
        pipeline.refresh(&store);
        let before = pipeline.stage_runs();

        store.apply(Update::EditCell {
            row: 0,
            col: 2,
            value: "checked".into(),
        });
        store.apply(Update::ToggleRowSelection { row: 1 });
        pipeline.refresh(&store);
        assert_eq!(pipeline.stage_runs(), before);
    }

    #[test]
    fn test_filtered_column_edit_is_incremental() {
        let mut store = store();
        store.apply(positive_qty());
        let mut pipeline = Pipeline::new();
        pipeline.refresh(&store);
        let before = pipeline.stage_runs();

        store.apply(Update::EditCell {
            row: 3,
            col: 1,
            value: "7".into(),
        });
        let view = pipeline.view(&store);
        assert_eq!(view.row_count(), 3);
        let runs = pipeline.stage_runs();
        assert_eq!(runs.filter, before.filter);
        assert_eq!(runs.filter_partial, before.filter_partial + 1);
    }

    #[test]
    fn test_filter_change_recomputes() {
        let mut store = store();
        let mut pipeline = Pipeline::new();
        pipeline.refresh(&store);
        let before = pipeline.stage_runs();
        store.apply(positive_qty());
        pipeline.refresh(&store);
        assert_eq!(pipeline.stage_runs().filter, before.filter + 1);
        assert_eq!(pipeline.stage_runs().sort, before.sort);
        assert_eq!(pipeline.row_view().visible_rows(), &[0, 1]);
    }

    #[test]
    fn test_aggregation_over_visible_rows() {
        let mut store = store();
        store.apply(positive_qty());
        store.apply(Update::SetAggregation {
            spec: Some(AggregationSpec::new(
                vec!["region".into()],
                vec![MetricSpec::new("qty", Reducer::Sum)],
            )),
        });
        let mut pipeline = Pipeline::new();
        let view = pipeline.view(&store);
        assert!(view.is_aggregated());
        assert_eq!(view.row_count(), 2);
        assert_eq!(view.cell(0, 0), &CellValue::from("west"));
        assert_eq!(view.cell(0, 1), &CellValue::Number(10.0));
        assert_eq!(view.source_rows(0), vec![0]);

        let table = view.to_display_table(store.locale());
        assert_eq!(table.headers, vec!["Region", "Qty (sum)"]);
    }

    #[test]
    fn test_rename_refreshes_aggregated_headers() {
        let mut store = store();
        store.apply(Update::SetAggregation {
            spec: Some(AggregationSpec::new(
                vec!["region".into()],
                vec![MetricSpec::new("qty", Reducer::Sum)],
            )),
        });
        let mut pipeline = Pipeline::new();
        let before = pipeline.view(&store).to_display_table(store.locale()).headers;
        assert_eq!(before, vec!["Region", "Qty (sum)"]);

        store.apply(Update::RenameColumn {
            col: 1,
            name: "Quantity".into(),
        });
        store.apply(Update::RenameColumn {
            col: 0,
            name: "Area".into(),
        });
        let after = pipeline.view(&store).to_display_table(store.locale()).headers;
        assert_eq!(after, vec!["Area", "Quantity (sum)"]);
        assert_eq!(pipeline.stage_runs().aggregate, 2);
    }

    #[test]
    fn test_clearing_aggregation_restores_rows() {
        let mut store = store();
        store.apply(Update::SetAggregation {
            spec: Some(AggregationSpec::new(vec!["region".into()], vec![])),
        });
        let mut pipeline = Pipeline::new();
        assert_eq!(pipeline.view(&store).row_count(), 3);
        store.apply(Update::SetAggregation { spec: None });
        assert_eq!(pipeline.view(&store).row_count(), 4);
    }
}
