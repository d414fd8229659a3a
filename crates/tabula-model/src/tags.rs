use ahash::{AHashMap, AHashSet};

use crate::ident::{Axis, TableAxis};
use crate::TableError;

/// Reserved tag matching every live row/column.
pub const TAG_ALL: &str = "all";

/// Reserved tag matching the row/column currently at the highest index.
pub const TAG_END: &str = "end";

/// Many-to-many mapping between one axis' ids and user tag names.
///
/// `all` and `end` are synthesized by the query side and never stored here;
/// they are rejected as add/remove/forget targets. A tag keeps existing (with
/// an empty membership) until it is forgotten.
#[derive(Clone)]
pub(crate) struct TagSet {
    axis: TableAxis,
    tags: AHashMap<String, AHashSet<u64>>,
}

impl TagSet {
    pub fn new(axis: TableAxis) -> Self {
        Self {
            axis,
            tags: AHashMap::new(),
        }
    }

    /// Reject reserved names and names that could be confused with numeric
    /// indices.
    pub fn validate_name(name: &str) -> Result<(), TableError> {
        if name == TAG_ALL || name == TAG_END {
            return Err(TableError::ReservedTag(name.to_string()));
        }
        if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
            return Err(TableError::InvalidTag(name.to_string()));
        }
        Ok(())
    }

    pub fn add(&mut self, id: u64, tag: &str) -> Result<(), TableError> {
        Self::validate_name(tag)?;
        self.tags.entry(tag.to_string()).or_default().insert(id);
        Ok(())
    }

    /// Remove a tag from one id. Unknown tags error; removing a tag the id
    /// does not carry is a no-op.
    pub fn remove(&mut self, id: u64, tag: &str) -> Result<(), TableError> {
        Self::validate_name(tag)?;
        match self.tags.get_mut(tag) {
            Some(ids) => {
                ids.remove(&id);
                Ok(())
            }
            None => Err(TableError::TagNotFound {
                axis: self.axis,
                tag: tag.to_string(),
            }),
        }
    }

    /// Drop a tag entirely. Forgetting a nonexistent tag is a silent no-op;
    /// the reserved tags cannot be forgotten.
    pub fn forget(&mut self, tag: &str) -> Result<(), TableError> {
        if tag == TAG_ALL || tag == TAG_END {
            return Err(TableError::ReservedTag(tag.to_string()));
        }
        self.tags.remove(tag);
        Ok(())
    }

    pub fn tags_of(&self, id: u64) -> Vec<String> {
        let mut names: Vec<String> = self
            .tags
            .iter()
            .filter(|(_, ids)| ids.contains(&id))
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    pub fn members(&self, tag: &str) -> Option<&AHashSet<u64>> {
        self.tags.get(tag)
    }

    pub fn has_tag(&self, id: u64, tag: &str) -> bool {
        self.tags.get(tag).is_some_and(|ids| ids.contains(&id))
    }

    pub fn exists(&self, tag: &str) -> bool {
        tag == TAG_ALL || tag == TAG_END || self.tags.contains_key(tag)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tags.keys().cloned().collect();
        names.sort();
        names
    }

    /// Evaluate tag membership live, including the synthesized tags.
    pub fn matches(&self, axis: &Axis, id: u64, tag: &str) -> bool {
        match tag {
            TAG_ALL => axis.contains(id),
            TAG_END => axis.last() == Some(id),
            _ => self.has_tag(id, tag),
        }
    }

    /// Called when an id is deleted.
    pub fn drop_id(&mut self, id: u64) {
        for ids in self.tags.values_mut() {
            ids.remove(&id);
        }
    }
}
