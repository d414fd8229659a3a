use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::events::{ColumnSelector, RowSelector, TraceMask, TraceSink};
use crate::TableError;

/// Handle for a registered trace.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TraceId(pub(crate) u64);

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Registration details reported by [`Table::trace_info`](crate::Table::trace_info).
#[derive(Clone, Debug)]
pub struct TraceInfo {
    pub rows: RowSelector,
    pub columns: ColumnSelector,
    pub mask: TraceMask,
}

pub(crate) struct TraceEntry {
    pub rows: RowSelector,
    pub columns: ColumnSelector,
    pub mask: TraceMask,
    pub sink: Rc<dyn TraceSink>,
}

/// Trace registry. Entries live in a BTreeMap so dispatch order is
/// registration order; deletion is terminal and a second delete reports the
/// dangling handle to the caller.
pub(crate) struct Traces {
    entries: BTreeMap<u64, TraceEntry>,
    next_id: u64,
}

impl Traces {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_id: 1,
        }
    }

    pub fn add(&mut self, entry: TraceEntry) -> TraceId {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.insert(id, entry);
        TraceId(id)
    }

    pub fn delete(&mut self, id: TraceId) -> Result<(), TableError> {
        self.entries
            .remove(&id.0)
            .map(|_| ())
            .ok_or(TableError::TraceNotFound(id))
    }

    pub fn contains(&self, id: TraceId) -> bool {
        self.entries.contains_key(&id.0)
    }

    pub fn get(&self, id: TraceId) -> Result<&TraceEntry, TableError> {
        self.entries.get(&id.0).ok_or(TableError::TraceNotFound(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = (TraceId, &TraceEntry)> {
        self.entries.iter().map(|(id, entry)| (TraceId(*id), entry))
    }

    pub fn ids(&self) -> Vec<TraceId> {
        self.entries.keys().map(|id| TraceId(*id)).collect()
    }
}
