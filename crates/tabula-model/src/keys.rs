use ahash::AHashMap;
use chrono::NaiveDateTime;
use ordered_float::OrderedFloat;

use crate::value::Value;

/// Hashable encoding of one key column value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum KeyAtom {
    Str(String),
    Long(i64),
    Int(i32),
    Double(OrderedFloat<f64>),
    Bool(bool),
    Time(NaiveDateTime),
    Blob(Vec<u8>),
}

impl From<&Value> for KeyAtom {
    fn from(value: &Value) -> Self {
        match value {
            Value::String(s) => KeyAtom::Str(s.clone()),
            Value::Long(v) => KeyAtom::Long(*v),
            Value::Int(v) => KeyAtom::Int(*v),
            Value::Double(v) => KeyAtom::Double(OrderedFloat(*v)),
            Value::Boolean(v) => KeyAtom::Bool(*v),
            Value::Time(t) => KeyAtom::Time(*t),
            Value::Blob(b) => KeyAtom::Blob(b.clone()),
        }
    }
}

/// Composite-key lookup index.
///
/// The tuple map is invalidated by any mutation that can change key values
/// or row order, and rebuilt lazily on the next lookup. Rows missing any key
/// value are not indexed; when two rows share a tuple the one later in the
/// current row order wins.
pub(crate) struct KeyIndex {
    columns: Vec<u64>,
    map: AHashMap<Vec<KeyAtom>, u64>,
    dirty: bool,
}

impl KeyIndex {
    pub fn new() -> Self {
        Self {
            columns: Vec::new(),
            map: AHashMap::new(),
            dirty: false,
        }
    }

    pub fn columns(&self) -> &[u64] {
        &self.columns
    }

    pub fn set_columns(&mut self, columns: Vec<u64>) {
        self.columns = columns;
        self.invalidate();
    }

    pub fn clear(&mut self) {
        self.columns.clear();
        self.map.clear();
        self.dirty = false;
    }

    pub fn invalidate(&mut self) {
        self.map.clear();
        self.dirty = true;
    }

    /// Invalidate if the mutated column participates in the key.
    pub fn touch_column(&mut self, column: u64) {
        if self.columns.contains(&column) {
            self.invalidate();
        }
    }

    /// A key column was deleted: the key set is no longer meaningful.
    pub fn on_column_deleted(&mut self, column: u64) {
        if self.columns.contains(&column) {
            self.clear();
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn rebuilt(&mut self, map: AHashMap<Vec<KeyAtom>, u64>) {
        self.map = map;
        self.dirty = false;
    }

    pub fn lookup(&self, tuple: &[KeyAtom]) -> Option<u64> {
        self.map.get(tuple).copied()
    }
}
