//! Memoized per-row, per-column and per-cell selectors.
//!
//! Each key gets one arena slot on first request; the returned
//! [`SelectorId`] is stable for the life of the cache. A slot keeps its
//! last value plus the revision snapshot it was computed from, and
//! recomputes only when that snapshot moves.
//!
//! Dependencies per key:
//! - row selected: structure, selection(row)
//! - row has errors: structure, row_errors(row)
//! - cell parse error: structure, columns, row_errors(row)
//! - column duplicate: columns, duplicates
//! - column empty: columns, empty columns
//! - sort direction / filter for a column id: sort / filters

use rustc_hash::FxHashMap;

use crate::filter::ColumnFilter;
use crate::sort::SortDirection;
use crate::store::{DatasetStore, Revisions, StateSlice};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SelectorKey {
    RowSelected(usize),
    RowHasErrors(usize),
    CellParseError { row: usize, col: usize },
    ColumnDuplicate(usize),
    ColumnEmpty(usize),
    ColumnSortDirection(String),
    ColumnFilter(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SelectorId(usize);

#[derive(Debug, Clone, PartialEq)]
pub enum SelectorValue {
    Flag(bool),
    Direction(Option<SortDirection>),
    Filter(Option<ColumnFilter>),
}

impl SelectorValue {
    /// Flag value; false for the non-flag variants.
    pub fn as_flag(&self) -> bool {
        matches!(self, SelectorValue::Flag(true))
    }
}

type Snapshot = [u64; 3];

impl SelectorKey {
    fn snapshot(&self, revs: &Revisions) -> Snapshot {
        match self {
            SelectorKey::RowSelected(row) => {
                [revs.of(StateSlice::Structure), revs.selection(*row), 0]
            }
            SelectorKey::RowHasErrors(row) => {
                [revs.of(StateSlice::Structure), revs.row_errors(*row), 0]
            }
            SelectorKey::CellParseError { row, .. } => [
                revs.of(StateSlice::Structure),
                revs.of(StateSlice::Columns),
                revs.row_errors(*row),
            ],
            SelectorKey::ColumnDuplicate(_) => {
                [revs.of(StateSlice::Columns), revs.of(StateSlice::Duplicates), 0]
            }
            SelectorKey::ColumnEmpty(_) => {
                [revs.of(StateSlice::Columns), revs.of(StateSlice::EmptyColumns), 0]
            }
            SelectorKey::ColumnSortDirection(_) => [revs.of(StateSlice::Sort), 0, 0],
            SelectorKey::ColumnFilter(_) => [revs.of(StateSlice::Filters), 0, 0],
        }
    }

    fn compute(&self, store: &DatasetStore) -> SelectorValue {
        let validation = store.validation();
        let rows = store.dataset().row_count();
        match self {
            SelectorKey::RowSelected(row) => {
                SelectorValue::Flag(*row < rows && store.is_row_selected(*row))
            }
            SelectorKey::RowHasErrors(row) => {
                SelectorValue::Flag(*row < rows && !validation.row_errors(*row).is_empty())
            }
            SelectorKey::CellParseError { row, col } => {
                SelectorValue::Flag(*row < rows && validation.has_parse_error(*row, *col))
            }
            SelectorKey::ColumnDuplicate(col) => {
                SelectorValue::Flag(validation.is_duplicate_column(*col))
            }
            SelectorKey::ColumnEmpty(col) => SelectorValue::Flag(validation.is_empty_column(*col)),
            SelectorKey::ColumnSortDirection(id) => {
                SelectorValue::Direction(store.sort().direction_for(id))
            }
            SelectorKey::ColumnFilter(id) => {
                SelectorValue::Filter(store.column_filter(id).cloned())
            }
        }
    }
}

#[derive(Debug, Clone)]
struct Slot {
    key: SelectorKey,
    snapshot: Option<Snapshot>,
    value: SelectorValue,
    recomputes: usize,
}

/// Arena of memoized selectors. Slots are never evicted individually; ids
/// stay valid until [`SelectorCache::clear`].
#[derive(Debug, Clone, Default)]
pub struct SelectorCache {
    slots: Vec<Slot>,
    index: FxHashMap<SelectorKey, SelectorId>,
}

impl SelectorCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for `key`. The same key always yields the same id.
    pub fn selector(&mut self, key: SelectorKey) -> SelectorId {
        if let Some(&id) = self.index.get(&key) {
            return id;
        }
        let id = SelectorId(self.slots.len());
        self.slots.push(Slot {
            key: key.clone(),
            snapshot: None,
            value: SelectorValue::Flag(false),
            recomputes: 0,
        });
        self.index.insert(key, id);
        id
    }

    /// Current value of `id`, recomputed only if its inputs moved.
    /// Ids from another cache read as `Flag(false)`.
    pub fn read(&mut self, id: SelectorId, store: &DatasetStore) -> &SelectorValue {
        static MISSING: SelectorValue = SelectorValue::Flag(false);
        let Some(slot) = self.slots.get_mut(id.0) else {
            return &MISSING;
        };
        let snapshot = slot.key.snapshot(store.revisions());
        if slot.snapshot != Some(snapshot) {
            slot.value = slot.key.compute(store);
            slot.snapshot = Some(snapshot);
            slot.recomputes += 1;
            log::trace!("selector {:?} recomputed", slot.key);
        }
        &slot.value
    }

    /// `selector` + `read` in one call.
    pub fn get(&mut self, key: SelectorKey, store: &DatasetStore) -> &SelectorValue {
        let id = self.selector(key);
        self.read(id, store)
    }

    /// Shorthand for flag selectors.
    pub fn flag(&mut self, key: SelectorKey, store: &DatasetStore) -> bool {
        self.get(key, store).as_flag()
    }

    pub fn recompute_count(&self, id: SelectorId) -> usize {
        self.slots.get(id.0).map_or(0, |slot| slot.recomputes)
    }

    pub fn key(&self, id: SelectorId) -> Option<&SelectorKey> {
        self.slots.get(id.0).map(|slot| &slot.key)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Drop every slot, e.g. after loading a new dataset. Previously issued
    /// ids read as `Flag(false)` until re-registered.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.index.clear();
    }
}
