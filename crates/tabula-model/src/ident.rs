use std::fmt;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::TableError;

/// Stable identity of a row, independent of its current position.
///
/// Ids are never reused within a table's lifetime; once a row is deleted its
/// id fails with [`TableError::NotFound`] forever.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(pub(crate) u64);

/// Stable identity of a column, independent of its current position.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnId(pub(crate) u64);

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which side of the table an id or error refers to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableAxis {
    Rows,
    Columns,
}

impl fmt::Display for TableAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TableAxis::Rows => "row",
            TableAxis::Columns => "column",
        })
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Header {
    pub label: String,
    pub index: usize,
}

/// One axis of the table: owns the live ids of that axis, their labels, and
/// the position ordering.
///
/// Indices are kept contiguous (0..len) at all times; every structural edit
/// renumbers from the lowest affected position.
#[derive(Clone)]
pub(crate) struct Axis {
    axis: TableAxis,
    label_prefix: char,
    order: Vec<u64>,
    headers: AHashMap<u64, Header>,
    by_label: AHashMap<String, SmallVec<[u64; 1]>>,
    next_id: u64,
    next_auto: u64,
}

impl Axis {
    pub fn new(axis: TableAxis) -> Self {
        Self {
            axis,
            label_prefix: match axis {
                TableAxis::Rows => 'r',
                TableAxis::Columns => 'c',
            },
            order: Vec::new(),
            headers: AHashMap::new(),
            by_label: AHashMap::new(),
            next_id: 1,
            next_auto: 0,
        }
    }

    pub fn axis(&self) -> TableAxis {
        self.axis
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn ids(&self) -> &[u64] {
        &self.order
    }

    pub fn contains(&self, id: u64) -> bool {
        self.headers.contains_key(&id)
    }

    pub fn last(&self) -> Option<u64> {
        self.order.last().copied()
    }

    fn not_found(&self, id: u64) -> TableError {
        TableError::NotFound {
            axis: self.axis,
            id,
        }
    }

    pub fn index_of(&self, id: u64) -> Result<usize, TableError> {
        self.headers
            .get(&id)
            .map(|h| h.index)
            .ok_or_else(|| self.not_found(id))
    }

    pub fn id_at(&self, index: usize) -> Result<u64, TableError> {
        self.order
            .get(index)
            .copied()
            .ok_or(TableError::IndexOutOfRange {
                axis: self.axis,
                index,
            })
    }

    pub fn label(&self, id: u64) -> Result<&str, TableError> {
        self.headers
            .get(&id)
            .map(|h| h.label.as_str())
            .ok_or_else(|| self.not_found(id))
    }

    /// Resolve a label to exactly one id, reporting ambiguity distinctly
    /// from not-found so callers can decide whether to auto-create.
    pub fn by_label(&self, label: &str) -> Result<u64, TableError> {
        match self.by_label.get(label).map(|ids| ids.as_slice()) {
            None | Some([]) => Err(TableError::LabelNotFound {
                axis: self.axis,
                label: label.to_string(),
            }),
            Some([id]) => Ok(*id),
            Some(ids) => Err(TableError::AmbiguousLabel {
                axis: self.axis,
                label: label.to_string(),
                count: ids.len(),
            }),
        }
    }

    /// All ids carrying the label, in index order.
    pub fn ids_with_label(&self, label: &str) -> Vec<u64> {
        let mut ids: Vec<u64> = self
            .by_label
            .get(label)
            .map(|ids| ids.to_vec())
            .unwrap_or_default();
        ids.sort_by_key(|id| self.headers[id].index);
        ids
    }

    /// Create a new id at the end of the axis. A missing label gets the next
    /// free auto-generated one (`r0`, `r1`, ... / `c0`, `c1`, ...).
    pub fn create(&mut self, label: Option<&str>) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        let label = match label {
            Some(l) => l.to_string(),
            None => loop {
                let candidate = format!("{}{}", self.label_prefix, self.next_auto);
                self.next_auto += 1;
                if !self.by_label.contains_key(&candidate) {
                    break candidate;
                }
            },
        };
        let index = self.order.len();
        self.order.push(id);
        self.by_label.entry(label.clone()).or_default().push(id);
        self.headers.insert(id, Header { label, index });
        id
    }

    pub fn extend(&mut self, n: usize) -> Vec<u64> {
        (0..n).map(|_| self.create(None)).collect()
    }

    /// Remove an id, returning the index it held.
    pub fn remove(&mut self, id: u64) -> Result<usize, TableError> {
        let header = self.headers.remove(&id).ok_or_else(|| self.not_found(id))?;
        self.order.remove(header.index);
        self.unlink_label(id, &header.label);
        self.renumber_from(header.index);
        Ok(header.index)
    }

    pub fn set_label(&mut self, id: u64, label: &str) -> Result<(), TableError> {
        let old = match self.headers.get_mut(&id) {
            Some(header) => std::mem::replace(&mut header.label, label.to_string()),
            None => return Err(self.not_found(id)),
        };
        self.unlink_label(id, &old);
        self.by_label.entry(label.to_string()).or_default().push(id);
        Ok(())
    }

    /// Stable relocation of `count` consecutive ids starting at `from` to
    /// position `to` (interpreted against the pre-move ordering; `to == len`
    /// moves the block to the end). Returns the moved ids with their new
    /// indices; an empty block is a no-op.
    pub fn move_block(
        &mut self,
        from: usize,
        to: usize,
        count: usize,
    ) -> Result<Vec<(u64, usize)>, TableError> {
        let len = self.order.len();
        if count == 0 {
            return Ok(Vec::new());
        }
        if from + count > len {
            return Err(TableError::MoveOutOfRange {
                axis: self.axis,
                from,
                count,
                len,
            });
        }
        if to > len {
            return Err(TableError::IndexOutOfRange {
                axis: self.axis,
                index: to,
            });
        }
        let dest = if to <= from {
            to
        } else if to >= from + count {
            to - count
        } else {
            return Err(TableError::MoveDestinationInBlock { to });
        };
        if dest == from {
            return Ok(Vec::new());
        }

        let block: Vec<u64> = self.order.drain(from..from + count).collect();
        for (offset, id) in block.iter().enumerate() {
            self.order.insert(dest + offset, *id);
        }
        self.renumber_from(dest.min(from));
        Ok(block
            .into_iter()
            .map(|id| (id, self.headers[&id].index))
            .collect())
    }

    /// Replace the entire ordering. The caller has already verified that
    /// `order` is a permutation of the live ids. Returns the ids whose index
    /// changed, with their new indices.
    pub fn reorder(&mut self, order: Vec<u64>) -> Vec<(u64, usize)> {
        debug_assert_eq!(order.len(), self.order.len());
        self.order = order;
        let mut moved = Vec::new();
        for (index, id) in self.order.iter().enumerate() {
            let header = self.headers.get_mut(id).expect("reorder: unknown id");
            if header.index != index {
                header.index = index;
                moved.push((*id, index));
            }
        }
        moved
    }

    fn unlink_label(&mut self, id: u64, label: &str) {
        if let Some(ids) = self.by_label.get_mut(label) {
            ids.retain(|other| *other != id);
            if ids.is_empty() {
                self.by_label.remove(label);
            }
        }
    }

    fn renumber_from(&mut self, start: usize) {
        for index in start..self.order.len() {
            let id = self.order[index];
            if let Some(header) = self.headers.get_mut(&id) {
                header.index = index;
            }
        }
    }
}
