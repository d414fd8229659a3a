use std::cell::RefCell;
use std::rc::Rc;

use ahash::{AHashMap, AHashSet};

use crate::events::{
    CallbackError, ColumnSelector, ErrorSink, EventKind, LogErrorSink, NotifyMask, NotifySink,
    RowSelector, Selector, StructureEvent, TraceEvent, TraceMask, TraceSink,
};
use crate::ident::{Axis, ColumnId, RowId, TableAxis};
use crate::keys::{KeyAtom, KeyIndex};
use crate::notify::{NotifierEntry, NotifierId, NotifierInfo, Notifiers};
use crate::tags::{TagSet, TAG_ALL, TAG_END};
use crate::trace::{TraceEntry, TraceId, TraceInfo, Traces};
use crate::value::{ColumnType, Value};
use crate::TableError;

#[derive(Copy, Clone, PartialEq, Eq, Hash)]
struct CellKey {
    row: u64,
    col: u64,
}

struct Core {
    rows: Axis,
    cols: Axis,
    cells: AHashMap<CellKey, Value>,
    col_types: AHashMap<u64, ColumnType>,
    row_tags: TagSet,
    col_tags: TagSet,
    traces: Traces,
    row_notifiers: Notifiers<RowId>,
    col_notifiers: Notifiers<ColumnId>,
    next_notifier_id: u64,
    keys: KeyIndex,
    empty_value: String,
    error_sink: Rc<dyn ErrorSink>,
    work_depth: u32,
    idle_rows: Vec<(NotifierId, StructureEvent<RowId>)>,
    idle_cols: Vec<(NotifierId, StructureEvent<ColumnId>)>,
}

impl Core {
    fn column_type(&self, col: u64) -> ColumnType {
        self.col_types.get(&col).copied().unwrap_or_default()
    }

    fn matching_traces(
        &self,
        row: RowId,
        col: ColumnId,
        mask: TraceMask,
    ) -> Vec<(TraceId, Rc<dyn TraceSink>)> {
        self.traces
            .iter()
            .filter(|(_, entry)| entry.mask.intersects(mask))
            .filter(|(_, entry)| match &entry.rows {
                Selector::Id(r) => *r == row,
                Selector::Tag(tag) => self.row_tags.matches(&self.rows, row.0, tag),
            })
            .filter(|(_, entry)| match &entry.columns {
                Selector::Id(c) => *c == col,
                Selector::Tag(tag) => self.col_tags.matches(&self.cols, col.0, tag),
            })
            .map(|(id, entry)| (id, entry.sink.clone()))
            .collect()
    }

    fn queue_idle_row(&mut self, notifier: NotifierId, event: StructureEvent<RowId>) {
        queue_idle(&mut self.idle_rows, notifier, event);
    }

    fn queue_idle_col(&mut self, notifier: NotifierId, event: StructureEvent<ColumnId>) {
        queue_idle(&mut self.idle_cols, notifier, event);
    }
}

/// One pending idle delivery per (notifier, event kind, id); a later event
/// for the same key just refreshes the reported index.
fn queue_idle<I: Copy + PartialEq>(
    queue: &mut Vec<(NotifierId, StructureEvent<I>)>,
    notifier: NotifierId,
    event: StructureEvent<I>,
) {
    for (pending_id, pending) in queue.iter_mut() {
        if *pending_id == notifier && pending.kind == event.kind && pending.id == event.id {
            pending.index = event.index;
            return;
        }
    }
    queue.push((notifier, event));
}

fn matching_notifiers<I: Copy + PartialEq>(
    notifiers: &Notifiers<I>,
    tags: &TagSet,
    axis: &Axis,
    kind: EventKind,
    id: I,
    raw: u64,
) -> Vec<(NotifierId, Rc<dyn NotifySink<I>>, bool)> {
    notifiers
        .iter()
        .filter(|(_, entry)| entry.mask.intersects(kind.mask()))
        .filter(|(_, entry)| match &entry.selector {
            Selector::Id(i) => *i == id,
            Selector::Tag(tag) => tags.matches(axis, raw, tag),
        })
        .map(|(nid, entry)| (nid, entry.sink.clone(), entry.when_idle))
        .collect()
}

type RowPlan = Vec<(NotifierId, Rc<dyn NotifySink<RowId>>, bool)>;
type ColPlan = Vec<(NotifierId, Rc<dyn NotifySink<ColumnId>>, bool)>;

/// A handle to a table.
///
/// Handles are cheap to clone and all refer to the same storage; mutations
/// and notification effects made through one handle are immediately visible
/// through every other. The table and everything it owns (rows, columns,
/// values, tags, traces, notifiers) are released when the last handle is
/// dropped.
///
/// All methods take `&self`: the core lives behind interior mutability so
/// that trace and notifier callbacks may re-enter the table (including
/// mutating it) while an operation is in flight. The engine snapshots every
/// dispatch plan before invoking callbacks and re-checks registration
/// liveness per delivery, so a callback deleting rows, traces, or notifiers
/// never corrupts a traversal already under way.
///
/// The engine is single-threaded by construction; one logical owner mutates
/// a table at a time.
#[derive(Clone)]
pub struct Table {
    core: Rc<RefCell<Core>>,
}

impl Default for Table {
    fn default() -> Self {
        Self::new()
    }
}

impl Table {
    /// Create a new empty table.
    pub fn new() -> Self {
        Table {
            core: Rc::new(RefCell::new(Core {
                rows: Axis::new(TableAxis::Rows),
                cols: Axis::new(TableAxis::Columns),
                cells: AHashMap::new(),
                col_types: AHashMap::new(),
                row_tags: TagSet::new(TableAxis::Rows),
                col_tags: TagSet::new(TableAxis::Columns),
                traces: Traces::new(),
                row_notifiers: Notifiers::new(),
                col_notifiers: Notifiers::new(),
                next_notifier_id: 1,
                keys: KeyIndex::new(),
                empty_value: String::new(),
                error_sink: Rc::new(LogErrorSink),
                work_depth: 0,
                idle_rows: Vec::new(),
                idle_cols: Vec::new(),
            })),
        }
    }

    /// Replace the sink that receives trace/notifier callback failures.
    pub fn set_error_sink(&self, sink: Rc<dyn ErrorSink>) {
        self.core.borrow_mut().error_sink = sink;
    }

    /// The display surrogate rendered for absent cells by [`Table::get_display`].
    pub fn empty_value(&self) -> String {
        self.core.borrow().empty_value.clone()
    }

    pub fn set_empty_value(&self, value: impl Into<String>) {
        self.core.borrow_mut().empty_value = value.into();
    }

    pub fn row_count(&self) -> usize {
        self.core.borrow().rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.core.borrow().cols.len()
    }

    // ---------------------------------------------------------------------
    // Structure
    // ---------------------------------------------------------------------

    /// Create a row at the end of the table. Without a label the row gets
    /// the next free auto-generated one (`r0`, `r1`, ...). Labels need not
    /// be unique; duplicate labels surface later as ambiguous lookups.
    pub fn create_row(&self, label: Option<&str>) -> RowId {
        self.with_work(|t| {
            let (id, index, plan) = {
                let mut core = t.core.borrow_mut();
                let raw = core.rows.create(label);
                let index = core.rows.len() - 1;
                let id = RowId(raw);
                let plan = matching_notifiers(
                    &core.row_notifiers,
                    &core.row_tags,
                    &core.rows,
                    EventKind::Create,
                    id,
                    raw,
                );
                (id, index, plan)
            };
            t.dispatch_row_events(vec![(
                plan,
                StructureEvent {
                    kind: EventKind::Create,
                    id,
                    index,
                },
            )]);
            id
        })
    }

    /// Create a column at the end of the table, with type `Unknown`.
    pub fn create_column(&self, label: Option<&str>) -> ColumnId {
        self.with_work(|t| {
            let (id, index, plan) = {
                let mut core = t.core.borrow_mut();
                let raw = core.cols.create(label);
                let index = core.cols.len() - 1;
                let id = ColumnId(raw);
                let plan = matching_notifiers(
                    &core.col_notifiers,
                    &core.col_tags,
                    &core.cols,
                    EventKind::Create,
                    id,
                    raw,
                );
                (id, index, plan)
            };
            t.dispatch_col_events(vec![(
                plan,
                StructureEvent {
                    kind: EventKind::Create,
                    id,
                    index,
                },
            )]);
            id
        })
    }

    /// Append `n` empty rows, returning their ids in creation order.
    pub fn extend_rows(&self, n: usize) -> Vec<RowId> {
        self.with_work(|t| {
            let (ids, events) = {
                let mut core = t.core.borrow_mut();
                let raw_ids = core.rows.extend(n);
                let base = core.rows.len() - raw_ids.len();
                let mut events = Vec::with_capacity(raw_ids.len());
                for (offset, raw) in raw_ids.iter().enumerate() {
                    let id = RowId(*raw);
                    let plan = matching_notifiers(
                        &core.row_notifiers,
                        &core.row_tags,
                        &core.rows,
                        EventKind::Create,
                        id,
                        *raw,
                    );
                    events.push((
                        plan,
                        StructureEvent {
                            kind: EventKind::Create,
                            id,
                            index: base + offset,
                        },
                    ));
                }
                (raw_ids.into_iter().map(RowId).collect::<Vec<_>>(), events)
            };
            t.dispatch_row_events(events);
            ids
        })
    }

    /// Append `n` empty columns, returning their ids in creation order.
    pub fn extend_columns(&self, n: usize) -> Vec<ColumnId> {
        self.with_work(|t| {
            let (ids, events) = {
                let mut core = t.core.borrow_mut();
                let raw_ids = core.cols.extend(n);
                let base = core.cols.len() - raw_ids.len();
                let mut events = Vec::with_capacity(raw_ids.len());
                for (offset, raw) in raw_ids.iter().enumerate() {
                    let id = ColumnId(*raw);
                    let plan = matching_notifiers(
                        &core.col_notifiers,
                        &core.col_tags,
                        &core.cols,
                        EventKind::Create,
                        id,
                        *raw,
                    );
                    events.push((
                        plan,
                        StructureEvent {
                            kind: EventKind::Create,
                            id,
                            index: base + offset,
                        },
                    ));
                }
                (
                    raw_ids.into_iter().map(ColumnId).collect::<Vec<_>>(),
                    events,
                )
            };
            t.dispatch_col_events(events);
            ids
        })
    }

    /// Delete a row. Its present cells fire `UNSET` traces (while the row is
    /// still live), then the row itself fires a `DELETE` notification with
    /// the index it held. The id is invalid afterwards.
    pub fn delete_row(&self, row: RowId) -> Result<(), TableError> {
        self.with_work(|t| {
            let trace_plans = {
                let mut core = t.core.borrow_mut();
                core.rows.index_of(row.0)?;
                let col_ids: Vec<u64> = core.cols.ids().to_vec();
                let mut plans = Vec::new();
                for col in col_ids {
                    let key = CellKey { row: row.0, col };
                    if core.cells.remove(&key).is_some() {
                        core.keys.touch_column(col);
                        let cid = ColumnId(col);
                        let plan = core.matching_traces(row, cid, TraceMask::UNSET);
                        if !plan.is_empty() {
                            plans.push((cid, plan));
                        }
                    }
                }
                plans
            };
            for (col, plan) in trace_plans {
                t.fire_traces(plan, row, col, TraceMask::UNSET);
            }

            // A trace callback may already have deleted the row itself.
            let notify = {
                let mut core = t.core.borrow_mut();
                if !core.rows.contains(row.0) {
                    return Ok(());
                }
                let plan = matching_notifiers(
                    &core.row_notifiers,
                    &core.row_tags,
                    &core.rows,
                    EventKind::Delete,
                    row,
                    row.0,
                );
                let index = core.rows.remove(row.0)?;
                core.row_tags.drop_id(row.0);
                core.keys.invalidate();
                (
                    plan,
                    StructureEvent {
                        kind: EventKind::Delete,
                        id: row,
                        index,
                    },
                )
            };
            t.dispatch_row_events(vec![notify]);
            Ok(())
        })
    }

    /// Delete a column, its cells, tags, and type. Deleting a key column
    /// clears the whole key-column set.
    pub fn delete_column(&self, col: ColumnId) -> Result<(), TableError> {
        self.with_work(|t| {
            let trace_plans = {
                let mut core = t.core.borrow_mut();
                core.cols.index_of(col.0)?;
                let row_ids: Vec<u64> = core.rows.ids().to_vec();
                let mut plans = Vec::new();
                for row in row_ids {
                    let key = CellKey { row, col: col.0 };
                    if core.cells.remove(&key).is_some() {
                        let rid = RowId(row);
                        let plan = core.matching_traces(rid, col, TraceMask::UNSET);
                        if !plan.is_empty() {
                            plans.push((rid, plan));
                        }
                    }
                }
                plans
            };
            for (row, plan) in trace_plans {
                t.fire_traces(plan, row, col, TraceMask::UNSET);
            }

            let notify = {
                let mut core = t.core.borrow_mut();
                if !core.cols.contains(col.0) {
                    return Ok(());
                }
                let plan = matching_notifiers(
                    &core.col_notifiers,
                    &core.col_tags,
                    &core.cols,
                    EventKind::Delete,
                    col,
                    col.0,
                );
                let index = core.cols.remove(col.0)?;
                core.col_tags.drop_id(col.0);
                core.col_types.remove(&col.0);
                core.keys.on_column_deleted(col.0);
                (
                    plan,
                    StructureEvent {
                        kind: EventKind::Delete,
                        id: col,
                        index,
                    },
                )
            };
            t.dispatch_col_events(vec![notify]);
            Ok(())
        })
    }

    /// Stable relocation of `count` consecutive rows starting at index
    /// `from` to index `to` (both against the pre-move order). The moved
    /// rows fire `MOVE` notifications with their new indices.
    pub fn move_rows(&self, from: usize, to: usize, count: usize) -> Result<(), TableError> {
        self.with_work(|t| {
            let events = {
                let mut core = t.core.borrow_mut();
                let moved = core.rows.move_block(from, to, count)?;
                if !moved.is_empty() {
                    core.keys.invalidate();
                }
                moved
                    .into_iter()
                    .map(|(raw, index)| {
                        let id = RowId(raw);
                        let plan = matching_notifiers(
                            &core.row_notifiers,
                            &core.row_tags,
                            &core.rows,
                            EventKind::Move,
                            id,
                            raw,
                        );
                        (
                            plan,
                            StructureEvent {
                                kind: EventKind::Move,
                                id,
                                index,
                            },
                        )
                    })
                    .collect::<Vec<_>>()
            };
            t.dispatch_row_events(events);
            Ok(())
        })
    }

    /// Column analogue of [`Table::move_rows`].
    pub fn move_columns(&self, from: usize, to: usize, count: usize) -> Result<(), TableError> {
        self.with_work(|t| {
            let events = {
                let mut core = t.core.borrow_mut();
                let moved = core.cols.move_block(from, to, count)?;
                moved
                    .into_iter()
                    .map(|(raw, index)| {
                        let id = ColumnId(raw);
                        let plan = matching_notifiers(
                            &core.col_notifiers,
                            &core.col_tags,
                            &core.cols,
                            EventKind::Move,
                            id,
                            raw,
                        );
                        (
                            plan,
                            StructureEvent {
                                kind: EventKind::Move,
                                id,
                                index,
                            },
                        )
                    })
                    .collect::<Vec<_>>()
            };
            t.dispatch_col_events(events);
            Ok(())
        })
    }

    /// Apply a permutation to the row order, keeping every id's identity.
    ///
    /// `order` may be the full row set (a complete new ordering) or a subset,
    /// in which case the listed rows are redistributed over their own current
    /// positions in the given order and every other row stays put. Rows whose
    /// index changed fire `MOVE` notifications.
    pub fn reorder_rows(&self, order: &[RowId]) -> Result<(), TableError> {
        self.with_work(|t| {
            let events = {
                let mut core = t.core.borrow_mut();
                let mut seen = AHashSet::new();
                for id in order {
                    core.rows.index_of(id.0)?;
                    if !seen.insert(id.0) {
                        return Err(TableError::NotAPermutation(format!(
                            "row {id} listed twice"
                        )));
                    }
                }
                let new_order: Vec<u64> = if order.len() == core.rows.len() {
                    order.iter().map(|id| id.0).collect()
                } else {
                    let mut positions = Vec::with_capacity(order.len());
                    for id in order {
                        positions.push(core.rows.index_of(id.0)?);
                    }
                    positions.sort_unstable();
                    let mut full: Vec<u64> = core.rows.ids().to_vec();
                    for (pos, id) in positions.iter().zip(order) {
                        full[*pos] = id.0;
                    }
                    full
                };
                let moved = core.rows.reorder(new_order);
                if !moved.is_empty() {
                    core.keys.invalidate();
                }
                moved
                    .into_iter()
                    .map(|(raw, index)| {
                        let id = RowId(raw);
                        let plan = matching_notifiers(
                            &core.row_notifiers,
                            &core.row_tags,
                            &core.rows,
                            EventKind::Move,
                            id,
                            raw,
                        );
                        (
                            plan,
                            StructureEvent {
                                kind: EventKind::Move,
                                id,
                                index,
                            },
                        )
                    })
                    .collect::<Vec<_>>()
            };
            t.dispatch_row_events(events);
            Ok(())
        })
    }

    // ---------------------------------------------------------------------
    // Identity, labels, lookup
    // ---------------------------------------------------------------------

    pub fn row_index(&self, row: RowId) -> Result<usize, TableError> {
        self.core.borrow().rows.index_of(row.0)
    }

    pub fn column_index(&self, col: ColumnId) -> Result<usize, TableError> {
        self.core.borrow().cols.index_of(col.0)
    }

    pub fn row_at(&self, index: usize) -> Result<RowId, TableError> {
        self.core.borrow().rows.id_at(index).map(RowId)
    }

    pub fn column_at(&self, index: usize) -> Result<ColumnId, TableError> {
        self.core.borrow().cols.id_at(index).map(ColumnId)
    }

    /// Resolve a label to exactly one row; duplicate labels report
    /// [`TableError::AmbiguousLabel`], distinct from not-found, so callers
    /// can decide whether to auto-create.
    pub fn row_by_label(&self, label: &str) -> Result<RowId, TableError> {
        self.core.borrow().rows.by_label(label).map(RowId)
    }

    pub fn column_by_label(&self, label: &str) -> Result<ColumnId, TableError> {
        self.core.borrow().cols.by_label(label).map(ColumnId)
    }

    /// All rows carrying the label, in index order.
    pub fn rows_with_label(&self, label: &str) -> Vec<RowId> {
        self.core
            .borrow()
            .rows
            .ids_with_label(label)
            .into_iter()
            .map(RowId)
            .collect()
    }

    pub fn columns_with_label(&self, label: &str) -> Vec<ColumnId> {
        self.core
            .borrow()
            .cols
            .ids_with_label(label)
            .into_iter()
            .map(ColumnId)
            .collect()
    }

    pub fn row_label(&self, row: RowId) -> Result<String, TableError> {
        self.core.borrow().rows.label(row.0).map(str::to_string)
    }

    pub fn column_label(&self, col: ColumnId) -> Result<String, TableError> {
        self.core.borrow().cols.label(col.0).map(str::to_string)
    }

    /// Relabel a row; fires a `RELABEL` notification.
    pub fn set_row_label(&self, row: RowId, label: &str) -> Result<(), TableError> {
        self.with_work(|t| {
            let (index, plan) = {
                let mut core = t.core.borrow_mut();
                core.rows.set_label(row.0, label)?;
                let index = core.rows.index_of(row.0)?;
                let plan = matching_notifiers(
                    &core.row_notifiers,
                    &core.row_tags,
                    &core.rows,
                    EventKind::Relabel,
                    row,
                    row.0,
                );
                (index, plan)
            };
            t.dispatch_row_events(vec![(
                plan,
                StructureEvent {
                    kind: EventKind::Relabel,
                    id: row,
                    index,
                },
            )]);
            Ok(())
        })
    }

    pub fn set_column_label(&self, col: ColumnId, label: &str) -> Result<(), TableError> {
        self.with_work(|t| {
            let (index, plan) = {
                let mut core = t.core.borrow_mut();
                core.cols.set_label(col.0, label)?;
                let index = core.cols.index_of(col.0)?;
                let plan = matching_notifiers(
                    &core.col_notifiers,
                    &core.col_tags,
                    &core.cols,
                    EventKind::Relabel,
                    col,
                    col.0,
                );
                (index, plan)
            };
            t.dispatch_col_events(vec![(
                plan,
                StructureEvent {
                    kind: EventKind::Relabel,
                    id: col,
                    index,
                },
            )]);
            Ok(())
        })
    }

    /// All live row ids, in index order.
    pub fn row_ids(&self) -> Vec<RowId> {
        self.core.borrow().rows.ids().iter().copied().map(RowId).collect()
    }

    pub fn column_ids(&self) -> Vec<ColumnId> {
        self.core
            .borrow()
            .cols
            .ids()
            .iter()
            .copied()
            .map(ColumnId)
            .collect()
    }

    /// Resolve a row spec (decimal index, tag name, or label) to the rows
    /// it denotes. Indices win over tags, tags over labels, which is why tag
    /// names may not begin with a digit.
    pub fn resolve_rows(&self, spec: &str) -> Result<Vec<RowId>, TableError> {
        let core = self.core.borrow();
        if !spec.is_empty() && spec.bytes().all(|b| b.is_ascii_digit()) {
            let index = spec.parse::<usize>().unwrap_or(usize::MAX);
            return Ok(vec![RowId(core.rows.id_at(index)?)]);
        }
        if core.row_tags.exists(spec) {
            return ids_tagged(&core.rows, &core.row_tags, spec).map(|ids| {
                ids.into_iter().map(RowId).collect()
            });
        }
        let ids = core.rows.ids_with_label(spec);
        if ids.is_empty() {
            return Err(TableError::LabelNotFound {
                axis: TableAxis::Rows,
                label: spec.to_string(),
            });
        }
        Ok(ids.into_iter().map(RowId).collect())
    }

    /// Column analogue of [`Table::resolve_rows`].
    pub fn resolve_columns(&self, spec: &str) -> Result<Vec<ColumnId>, TableError> {
        let core = self.core.borrow();
        if !spec.is_empty() && spec.bytes().all(|b| b.is_ascii_digit()) {
            let index = spec.parse::<usize>().unwrap_or(usize::MAX);
            return Ok(vec![ColumnId(core.cols.id_at(index)?)]);
        }
        if core.col_tags.exists(spec) {
            return ids_tagged(&core.cols, &core.col_tags, spec).map(|ids| {
                ids.into_iter().map(ColumnId).collect()
            });
        }
        let ids = core.cols.ids_with_label(spec);
        if ids.is_empty() {
            return Err(TableError::LabelNotFound {
                axis: TableAxis::Columns,
                label: spec.to_string(),
            });
        }
        Ok(ids.into_iter().map(ColumnId).collect())
    }

    // ---------------------------------------------------------------------
    // Column types
    // ---------------------------------------------------------------------

    pub fn column_type(&self, col: ColumnId) -> Result<ColumnType, TableError> {
        let core = self.core.borrow();
        core.cols.index_of(col.0)?;
        Ok(core.column_type(col.0))
    }

    /// Change a column's type, converting every present value up front.
    ///
    /// Validate-then-commit: if any value cannot represent the new type the
    /// whole operation fails and the column is left untouched. No traces
    /// fire; the stored values' meaning is unchanged.
    pub fn set_column_type(&self, col: ColumnId, ty: ColumnType) -> Result<(), TableError> {
        let mut core = self.core.borrow_mut();
        core.cols.index_of(col.0)?;
        let row_ids: Vec<u64> = core.rows.ids().to_vec();
        let mut converted = Vec::new();
        for row in row_ids {
            let key = CellKey { row, col: col.0 };
            if let Some(value) = core.cells.get(&key) {
                converted.push((key, value.convert_to(ty)?));
            }
        }
        for (key, value) in converted {
            core.cells.insert(key, value);
        }
        core.col_types.insert(col.0, ty);
        core.keys.touch_column(col.0);
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Values
    // ---------------------------------------------------------------------

    /// Read a cell. `None` means the cell is absent (never set, or unset).
    /// Fires `READ` traces for present cells before the value is returned,
    /// and re-reads after they ran, so a trace that rewrites the cell is
    /// observed by the caller.
    pub fn get(&self, row: RowId, col: ColumnId) -> Result<Option<Value>, TableError> {
        self.with_work(|t| {
            let plan = {
                let core = t.core.borrow();
                core.rows.index_of(row.0)?;
                core.cols.index_of(col.0)?;
                let key = CellKey {
                    row: row.0,
                    col: col.0,
                };
                if core.cells.contains_key(&key) {
                    core.matching_traces(row, col, TraceMask::READ)
                } else {
                    Vec::new()
                }
            };
            t.fire_traces(plan, row, col, TraceMask::READ);
            let core = t.core.borrow();
            Ok(core
                .cells
                .get(&CellKey {
                    row: row.0,
                    col: col.0,
                })
                .cloned())
        })
    }

    /// Read a cell without firing traces. Bulk engines (sort, dump) use
    /// this; interactive readers should prefer [`Table::get`].
    pub fn peek(&self, row: RowId, col: ColumnId) -> Result<Option<Value>, TableError> {
        let core = self.core.borrow();
        core.rows.index_of(row.0)?;
        core.cols.index_of(col.0)?;
        Ok(core
            .cells
            .get(&CellKey {
                row: row.0,
                col: col.0,
            })
            .cloned())
    }

    /// Store a value, coercing it to the column's type. Fires `WRITE`
    /// traces after the store commits, plus `CREATE` when the cell was
    /// previously absent. The row and column must already exist; the table
    /// never grows on `set`.
    pub fn set(&self, row: RowId, col: ColumnId, value: impl Into<Value>) -> Result<(), TableError> {
        let value = value.into();
        self.with_work(move |t| {
            let (mask, plan) = {
                let mut core = t.core.borrow_mut();
                core.rows.index_of(row.0)?;
                core.cols.index_of(col.0)?;
                let stored = value.convert_to(core.column_type(col.0))?;
                let key = CellKey {
                    row: row.0,
                    col: col.0,
                };
                let created = core.cells.insert(key, stored).is_none();
                core.keys.touch_column(col.0);
                let mask = if created {
                    TraceMask::WRITE | TraceMask::CREATE
                } else {
                    TraceMask::WRITE
                };
                (mask, core.matching_traces(row, col, mask))
            };
            t.fire_traces(plan, row, col, mask);
            Ok(())
        })
    }

    /// Remove a cell's value. Unsetting an absent cell is a no-op; a present
    /// cell fires `UNSET` traces after removal.
    pub fn unset(&self, row: RowId, col: ColumnId) -> Result<(), TableError> {
        self.with_work(|t| {
            let plan = {
                let mut core = t.core.borrow_mut();
                core.rows.index_of(row.0)?;
                core.cols.index_of(col.0)?;
                let key = CellKey {
                    row: row.0,
                    col: col.0,
                };
                if core.cells.remove(&key).is_some() {
                    core.keys.touch_column(col.0);
                    core.matching_traces(row, col, TraceMask::UNSET)
                } else {
                    Vec::new()
                }
            };
            t.fire_traces(plan, row, col, TraceMask::UNSET);
            Ok(())
        })
    }

    /// True when the cell holds a value. Never errors: unknown ids simply
    /// report `false`.
    pub fn exists(&self, row: RowId, col: ColumnId) -> bool {
        let core = self.core.borrow();
        core.rows.contains(row.0)
            && core.cols.contains(col.0)
            && core.cells.contains_key(&CellKey {
                row: row.0,
                col: col.0,
            })
    }

    /// String-concatenate onto the current value, creating the cell if
    /// absent. Only string and untyped columns are appendable.
    pub fn append(&self, row: RowId, col: ColumnId, text: &str) -> Result<(), TableError> {
        self.with_work(|t| {
            let (mask, plan) = {
                let mut core = t.core.borrow_mut();
                core.rows.index_of(row.0)?;
                core.cols.index_of(col.0)?;
                let ty = core.column_type(col.0);
                if !matches!(ty, ColumnType::Unknown | ColumnType::String) {
                    return Err(TableError::NotAppendable(ty));
                }
                let key = CellKey {
                    row: row.0,
                    col: col.0,
                };
                let (created, value) = match core.cells.get(&key) {
                    Some(current) => {
                        let mut s = current.to_text();
                        s.push_str(text);
                        (false, Value::String(s))
                    }
                    None => (true, Value::String(text.to_string())),
                };
                core.cells.insert(key, value);
                core.keys.touch_column(col.0);
                let mask = if created {
                    TraceMask::WRITE | TraceMask::CREATE
                } else {
                    TraceMask::WRITE
                };
                (mask, core.matching_traces(row, col, mask))
            };
            t.fire_traces(plan, row, col, mask);
            Ok(())
        })
    }

    /// Render a cell for display: present values via their text form,
    /// absent cells via the table's empty-value surrogate.
    pub fn get_display(&self, row: RowId, col: ColumnId) -> Result<String, TableError> {
        match self.get(row, col)? {
            Some(value) => Ok(value.to_text()),
            None => Ok(self.core.borrow().empty_value.clone()),
        }
    }

    pub fn get_long(&self, row: RowId, col: ColumnId) -> Result<Option<i64>, TableError> {
        match self.get(row, col)? {
            Some(value) => Ok(value.convert_to(ColumnType::Long)?.as_long()),
            None => Ok(None),
        }
    }

    pub fn get_double(&self, row: RowId, col: ColumnId) -> Result<Option<f64>, TableError> {
        match self.get(row, col)? {
            Some(value) => Ok(value.convert_to(ColumnType::Double)?.as_double()),
            None => Ok(None),
        }
    }

    pub fn get_boolean(&self, row: RowId, col: ColumnId) -> Result<Option<bool>, TableError> {
        match self.get(row, col)? {
            Some(value) => Ok(value.convert_to(ColumnType::Boolean)?.as_boolean()),
            None => Ok(None),
        }
    }

    pub fn get_text(&self, row: RowId, col: ColumnId) -> Result<Option<String>, TableError> {
        Ok(self.get(row, col)?.map(|value| value.to_text()))
    }

    /// Minimum and maximum of the column's present values under the
    /// column's type-appropriate comparison, or `None` for an empty column.
    /// Reads do not fire traces.
    pub fn column_limits(&self, col: ColumnId) -> Result<Option<(Value, Value)>, TableError> {
        let core = self.core.borrow();
        core.cols.index_of(col.0)?;
        let mut limits: Option<(Value, Value)> = None;
        for row in core.rows.ids() {
            let key = CellKey {
                row: *row,
                col: col.0,
            };
            let Some(value) = core.cells.get(&key) else {
                continue;
            };
            limits = Some(match limits {
                None => (value.clone(), value.clone()),
                Some((min, max)) => (
                    if value.compare(&min).is_lt() {
                        value.clone()
                    } else {
                        min
                    },
                    if value.compare(&max).is_gt() {
                        value.clone()
                    } else {
                        max
                    },
                ),
            });
        }
        Ok(limits)
    }

    // ---------------------------------------------------------------------
    // Tags
    // ---------------------------------------------------------------------

    pub fn add_row_tag(&self, row: RowId, tag: &str) -> Result<(), TableError> {
        let mut core = self.core.borrow_mut();
        core.rows.index_of(row.0)?;
        core.row_tags.add(row.0, tag)
    }

    pub fn remove_row_tag(&self, row: RowId, tag: &str) -> Result<(), TableError> {
        let mut core = self.core.borrow_mut();
        core.rows.index_of(row.0)?;
        core.row_tags.remove(row.0, tag)
    }

    pub fn add_column_tag(&self, col: ColumnId, tag: &str) -> Result<(), TableError> {
        let mut core = self.core.borrow_mut();
        core.cols.index_of(col.0)?;
        core.col_tags.add(col.0, tag)
    }

    pub fn remove_column_tag(&self, col: ColumnId, tag: &str) -> Result<(), TableError> {
        let mut core = self.core.borrow_mut();
        core.cols.index_of(col.0)?;
        core.col_tags.remove(col.0, tag)
    }

    pub fn row_tags(&self, row: RowId) -> Result<Vec<String>, TableError> {
        let core = self.core.borrow();
        core.rows.index_of(row.0)?;
        Ok(core.row_tags.tags_of(row.0))
    }

    pub fn column_tags(&self, col: ColumnId) -> Result<Vec<String>, TableError> {
        let core = self.core.borrow();
        core.cols.index_of(col.0)?;
        Ok(core.col_tags.tags_of(col.0))
    }

    /// Rows carrying the tag, in index order. `all` and `end` are computed
    /// live against the current row set.
    pub fn rows_tagged(&self, tag: &str) -> Result<Vec<RowId>, TableError> {
        let core = self.core.borrow();
        ids_tagged(&core.rows, &core.row_tags, tag).map(|ids| ids.into_iter().map(RowId).collect())
    }

    pub fn columns_tagged(&self, tag: &str) -> Result<Vec<ColumnId>, TableError> {
        let core = self.core.borrow();
        ids_tagged(&core.cols, &core.col_tags, tag)
            .map(|ids| ids.into_iter().map(ColumnId).collect())
    }

    pub fn forget_row_tag(&self, tag: &str) -> Result<(), TableError> {
        self.core.borrow_mut().row_tags.forget(tag)
    }

    pub fn forget_column_tag(&self, tag: &str) -> Result<(), TableError> {
        self.core.borrow_mut().col_tags.forget(tag)
    }

    pub fn row_tag_exists(&self, tag: &str) -> bool {
        self.core.borrow().row_tags.exists(tag)
    }

    pub fn column_tag_exists(&self, tag: &str) -> bool {
        self.core.borrow().col_tags.exists(tag)
    }

    pub fn row_tag_names(&self) -> Vec<String> {
        self.core.borrow().row_tags.names()
    }

    pub fn column_tag_names(&self) -> Vec<String> {
        self.core.borrow().col_tags.names()
    }

    // ---------------------------------------------------------------------
    // Traces
    // ---------------------------------------------------------------------

    /// Register a cell watcher. Concrete-id selectors are validated now; tag
    /// selectors are evaluated at fire time, so tag membership changes take
    /// effect without re-registering.
    pub fn add_trace(
        &self,
        rows: impl Into<RowSelector>,
        columns: impl Into<ColumnSelector>,
        mask: TraceMask,
        sink: impl TraceSink + 'static,
    ) -> Result<TraceId, TableError> {
        let rows = rows.into();
        let columns = columns.into();
        let mut core = self.core.borrow_mut();
        if let Selector::Id(row) = &rows {
            core.rows.index_of(row.0)?;
        }
        if let Selector::Id(col) = &columns {
            core.cols.index_of(col.0)?;
        }
        Ok(core.traces.add(TraceEntry {
            rows,
            columns,
            mask,
            sink: Rc::new(sink),
        }))
    }

    /// Delete a trace. Deletion is terminal; deleting twice reports the
    /// dangling handle as [`TableError::TraceNotFound`].
    pub fn delete_trace(&self, id: TraceId) -> Result<(), TableError> {
        self.core.borrow_mut().traces.delete(id)
    }

    pub fn trace_info(&self, id: TraceId) -> Result<TraceInfo, TableError> {
        let core = self.core.borrow();
        let entry = core.traces.get(id)?;
        Ok(TraceInfo {
            rows: entry.rows.clone(),
            columns: entry.columns.clone(),
            mask: entry.mask,
        })
    }

    pub fn trace_ids(&self) -> Vec<TraceId> {
        self.core.borrow().traces.ids()
    }

    // ---------------------------------------------------------------------
    // Notifiers
    // ---------------------------------------------------------------------

    /// Register a watcher for row structural events. With `when_idle` the
    /// events are queued (one pending delivery per event kind and row) and
    /// delivered when the outermost mutating call completes.
    pub fn add_row_notifier(
        &self,
        selector: impl Into<RowSelector>,
        mask: NotifyMask,
        when_idle: bool,
        sink: impl NotifySink<RowId> + 'static,
    ) -> Result<NotifierId, TableError> {
        let selector = selector.into();
        let mut core = self.core.borrow_mut();
        if let Selector::Id(row) = &selector {
            core.rows.index_of(row.0)?;
        }
        let id = core.next_notifier_id;
        core.next_notifier_id += 1;
        core.row_notifiers.add(
            id,
            NotifierEntry {
                selector,
                mask,
                when_idle,
                sink: Rc::new(sink),
            },
        );
        Ok(NotifierId(id))
    }

    pub fn add_column_notifier(
        &self,
        selector: impl Into<ColumnSelector>,
        mask: NotifyMask,
        when_idle: bool,
        sink: impl NotifySink<ColumnId> + 'static,
    ) -> Result<NotifierId, TableError> {
        let selector = selector.into();
        let mut core = self.core.borrow_mut();
        if let Selector::Id(col) = &selector {
            core.cols.index_of(col.0)?;
        }
        let id = core.next_notifier_id;
        core.next_notifier_id += 1;
        core.col_notifiers.add(
            id,
            NotifierEntry {
                selector,
                mask,
                when_idle,
                sink: Rc::new(sink),
            },
        );
        Ok(NotifierId(id))
    }

    pub fn delete_notifier(&self, id: NotifierId) -> Result<(), TableError> {
        let mut core = self.core.borrow_mut();
        if core.row_notifiers.delete(id) || core.col_notifiers.delete(id) {
            Ok(())
        } else {
            Err(TableError::NotifierNotFound(id))
        }
    }

    pub fn row_notifier_info(&self, id: NotifierId) -> Result<NotifierInfo<RowId>, TableError> {
        let core = self.core.borrow();
        let entry = core.row_notifiers.get(id)?;
        Ok(NotifierInfo {
            selector: entry.selector.clone(),
            mask: entry.mask,
            when_idle: entry.when_idle,
        })
    }

    pub fn column_notifier_info(
        &self,
        id: NotifierId,
    ) -> Result<NotifierInfo<ColumnId>, TableError> {
        let core = self.core.borrow();
        let entry = core.col_notifiers.get(id)?;
        Ok(NotifierInfo {
            selector: entry.selector.clone(),
            mask: entry.mask,
            when_idle: entry.when_idle,
        })
    }

    pub fn notifier_ids(&self) -> Vec<NotifierId> {
        let core = self.core.borrow();
        let mut ids = core.row_notifiers.ids();
        ids.extend(core.col_notifiers.ids());
        ids.sort();
        ids
    }

    // ---------------------------------------------------------------------
    // Key columns
    // ---------------------------------------------------------------------

    /// Designate an ordered set of columns as the table's composite lookup
    /// key. The tuple index is rebuilt lazily on the next lookup.
    pub fn set_key_columns(&self, columns: Vec<ColumnId>) -> Result<(), TableError> {
        let mut core = self.core.borrow_mut();
        for col in &columns {
            core.cols.index_of(col.0)?;
        }
        core.keys
            .set_columns(columns.into_iter().map(|c| c.0).collect());
        Ok(())
    }

    pub fn key_columns(&self) -> Vec<ColumnId> {
        self.core
            .borrow()
            .keys
            .columns()
            .iter()
            .copied()
            .map(ColumnId)
            .collect()
    }

    pub fn clear_key_columns(&self) {
        self.core.borrow_mut().keys.clear();
    }

    /// Look up the row whose key-column values equal `values` (coerced to
    /// each key column's type; an uncoercible probe simply finds nothing).
    /// Rows missing any key value are not indexed; among duplicate tuples
    /// the row later in the current order wins.
    pub fn lookup_key(&self, values: &[Value]) -> Result<Option<RowId>, TableError> {
        let mut core = self.core.borrow_mut();
        let columns = core.keys.columns().to_vec();
        if columns.is_empty() {
            return Err(TableError::NoKeyColumns);
        }
        if values.len() != columns.len() {
            return Err(TableError::KeyArity {
                want: columns.len(),
                got: values.len(),
            });
        }
        if core.keys.is_dirty() {
            let mut map = AHashMap::new();
            let row_ids: Vec<u64> = core.rows.ids().to_vec();
            for row in row_ids {
                let mut tuple = Vec::with_capacity(columns.len());
                let mut complete = true;
                for col in &columns {
                    match core.cells.get(&CellKey { row, col: *col }) {
                        Some(value) => tuple.push(KeyAtom::from(value)),
                        None => {
                            complete = false;
                            break;
                        }
                    }
                }
                if complete {
                    map.insert(tuple, row);
                }
            }
            core.keys.rebuilt(map);
        }
        let mut probe = Vec::with_capacity(values.len());
        for (value, col) in values.iter().zip(&columns) {
            match value.convert_to(core.column_type(*col)) {
                Ok(converted) => probe.push(KeyAtom::from(&converted)),
                Err(_) => return Ok(None),
            }
        }
        Ok(core.keys.lookup(&probe).map(RowId))
    }

    // ---------------------------------------------------------------------
    // Dispatch plumbing
    // ---------------------------------------------------------------------

    /// Run one unit of work. When the outermost unit finishes, queued
    /// when-idle notifications drain; nested units (mutations made from
    /// inside callbacks) leave the queue for the outermost caller.
    fn with_work<T>(&self, f: impl FnOnce(&Self) -> T) -> T {
        self.core.borrow_mut().work_depth += 1;
        let result = f(self);
        let outermost = {
            let mut core = self.core.borrow_mut();
            core.work_depth -= 1;
            core.work_depth == 0
        };
        if outermost {
            self.drain_idle();
        }
        result
    }

    fn fire_traces(
        &self,
        plan: Vec<(TraceId, Rc<dyn TraceSink>)>,
        row: RowId,
        column: ColumnId,
        mask: TraceMask,
    ) {
        if plan.is_empty() {
            return;
        }
        let event = TraceEvent { row, column, mask };
        for (id, sink) in plan {
            // A callback earlier in the plan may have deleted this trace.
            if !self.core.borrow().traces.contains(id) {
                continue;
            }
            if let Err(error) = sink.on_access(self, &event) {
                self.report_callback_failure("trace", &error);
            }
        }
    }

    fn dispatch_row_events(&self, events: Vec<(RowPlan, StructureEvent<RowId>)>) {
        let mut immediate = Vec::new();
        {
            let mut core = self.core.borrow_mut();
            for (plan, event) in &events {
                for (id, sink, when_idle) in plan {
                    if *when_idle {
                        core.queue_idle_row(*id, *event);
                    } else {
                        immediate.push((*id, sink.clone(), *event));
                    }
                }
            }
        }
        for (id, sink, event) in immediate {
            if !self.core.borrow().row_notifiers.contains(id) {
                continue;
            }
            if let Err(error) = sink.on_change(self, &event) {
                self.report_callback_failure("notifier", &error);
            }
        }
    }

    fn dispatch_col_events(&self, events: Vec<(ColPlan, StructureEvent<ColumnId>)>) {
        let mut immediate = Vec::new();
        {
            let mut core = self.core.borrow_mut();
            for (plan, event) in &events {
                for (id, sink, when_idle) in plan {
                    if *when_idle {
                        core.queue_idle_col(*id, *event);
                    } else {
                        immediate.push((*id, sink.clone(), *event));
                    }
                }
            }
        }
        for (id, sink, event) in immediate {
            if !self.core.borrow().col_notifiers.contains(id) {
                continue;
            }
            if let Err(error) = sink.on_change(self, &event) {
                self.report_callback_failure("notifier", &error);
            }
        }
    }

    fn drain_idle(&self) {
        loop {
            let (rows, cols) = {
                let mut core = self.core.borrow_mut();
                (
                    std::mem::take(&mut core.idle_rows),
                    std::mem::take(&mut core.idle_cols),
                )
            };
            if rows.is_empty() && cols.is_empty() {
                break;
            }
            for (id, event) in rows {
                let sink = self
                    .core
                    .borrow()
                    .row_notifiers
                    .get(id)
                    .ok()
                    .map(|entry| entry.sink.clone());
                let Some(sink) = sink else { continue };
                if let Err(error) = sink.on_change(self, &event) {
                    self.report_callback_failure("notifier", &error);
                }
            }
            for (id, event) in cols {
                let sink = self
                    .core
                    .borrow()
                    .col_notifiers
                    .get(id)
                    .ok()
                    .map(|entry| entry.sink.clone());
                let Some(sink) = sink else { continue };
                if let Err(error) = sink.on_change(self, &event) {
                    self.report_callback_failure("notifier", &error);
                }
            }
        }
    }

    fn report_callback_failure(&self, context: &str, error: &CallbackError) {
        let sink = self.core.borrow().error_sink.clone();
        sink.callback_failed(context, error);
    }
}

/// Shared tag query for both axes: synthesized tags are computed live, user
/// tags come back in index order.
fn ids_tagged(axis: &Axis, tags: &TagSet, tag: &str) -> Result<Vec<u64>, TableError> {
    match tag {
        TAG_ALL => Ok(axis.ids().to_vec()),
        TAG_END => Ok(axis.last().into_iter().collect()),
        _ => {
            let members = tags.members(tag).ok_or_else(|| TableError::TagNotFound {
                axis: axis.axis(),
                tag: tag.to_string(),
            })?;
            let mut ids: Vec<u64> = members.iter().copied().collect();
            ids.sort_by_key(|id| axis.index_of(*id).unwrap_or(usize::MAX));
            Ok(ids)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn absent_distinct_from_empty_string() {
        let table = Table::new();
        let row = table.create_row(None);
        let col = table.create_column(None);
        assert!(!table.exists(row, col));
        table.set(row, col, "").unwrap();
        assert!(table.exists(row, col));
        assert_eq!(table.get(row, col).unwrap(), Some(Value::String(String::new())));
        table.unset(row, col).unwrap();
        assert!(!table.exists(row, col));
        assert_eq!(table.get(row, col).unwrap(), None);
        // unsetting an absent cell stays a no-op
        table.unset(row, col).unwrap();
    }

    #[test]
    fn deleted_ids_stay_invalid() {
        let table = Table::new();
        let row = table.create_row(None);
        let col = table.create_column(None);
        table.set(row, col, 1i64).unwrap();
        table.delete_row(row).unwrap();
        assert!(matches!(
            table.set(row, col, 2i64).unwrap_err(),
            TableError::NotFound { .. }
        ));
        assert!(matches!(
            table.delete_row(row).unwrap_err(),
            TableError::NotFound { .. }
        ));
    }

    #[test]
    fn set_coerces_to_column_type() {
        let table = Table::new();
        let row = table.create_row(None);
        let col = table.create_column(Some("n"));
        table.set_column_type(col, ColumnType::Long).unwrap();
        table.set(row, col, "42").unwrap();
        assert_eq!(table.get(row, col).unwrap(), Some(Value::Long(42)));
        assert!(table.set(row, col, "not a number").is_err());
        // the failed set left the previous value in place
        assert_eq!(table.get_long(row, col).unwrap(), Some(42));
    }

    #[test]
    fn type_change_is_validate_then_commit() {
        let table = Table::new();
        let rows = table.extend_rows(2);
        let col = table.create_column(None);
        table.set(rows[0], col, "10").unwrap();
        table.set(rows[1], col, "ten").unwrap();
        assert!(table.set_column_type(col, ColumnType::Long).is_err());
        // nothing was converted
        assert_eq!(table.column_type(col).unwrap(), ColumnType::Unknown);
        assert_eq!(
            table.get(rows[0], col).unwrap(),
            Some(Value::String("10".into()))
        );
    }

    #[test]
    fn empty_value_renders_absent_cells_only() {
        let table = Table::new();
        table.set_empty_value("n/a");
        let row = table.create_row(None);
        let col = table.create_column(None);
        assert_eq!(table.get_display(row, col).unwrap(), "n/a");
        table.set(row, col, "x").unwrap();
        assert_eq!(table.get_display(row, col).unwrap(), "x");
        // the surrogate is never stored
        table.set(row, col, "").unwrap();
        assert_eq!(table.get_display(row, col).unwrap(), "");
    }

    #[test]
    fn column_limits_use_typed_comparison() {
        let table = Table::new();
        let rows = table.extend_rows(3);
        let col = table.create_column(None);
        table.set_column_type(col, ColumnType::Long).unwrap();
        table.set(rows[0], col, 9i64).unwrap();
        table.set(rows[2], col, 100i64).unwrap();
        let (min, max) = table.column_limits(col).unwrap().unwrap();
        assert_eq!(min, Value::Long(9));
        assert_eq!(max, Value::Long(100));
    }

    #[test]
    fn key_lookup_and_invalidation() {
        let table = Table::new();
        let rows = table.extend_rows(2);
        let name = table.create_column(Some("name"));
        let shard = table.create_column(Some("shard"));
        table.set_column_type(shard, ColumnType::Long).unwrap();
        table.set(rows[0], name, "a").unwrap();
        table.set(rows[0], shard, 1i64).unwrap();
        table.set(rows[1], name, "b").unwrap();
        table.set(rows[1], shard, 2i64).unwrap();
        table.set_key_columns(vec![name, shard]).unwrap();

        assert_eq!(
            table.lookup_key(&["a".into(), Value::Long(1)]).unwrap(),
            Some(rows[0])
        );
        // probe values coerce to the key columns' types
        assert_eq!(
            table.lookup_key(&["b".into(), "2".into()]).unwrap(),
            Some(rows[1])
        );
        assert_eq!(
            table.lookup_key(&["a".into(), Value::Long(2)]).unwrap(),
            None
        );
        assert!(matches!(
            table.lookup_key(&["a".into()]).unwrap_err(),
            TableError::KeyArity { want: 2, got: 1 }
        ));

        // mutating a key column invalidates the index
        table.set(rows[0], shard, 7i64).unwrap();
        assert_eq!(
            table.lookup_key(&["a".into(), Value::Long(7)]).unwrap(),
            Some(rows[0])
        );
        assert_eq!(
            table.lookup_key(&["a".into(), Value::Long(1)]).unwrap(),
            None
        );
    }
}
