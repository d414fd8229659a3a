use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::events::{NotifyMask, NotifySink, Selector};
use crate::TableError;

/// Handle for a registered notifier. Ids are unique across both axes of a
/// table.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NotifierId(pub(crate) u64);

impl fmt::Display for NotifierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Registration details reported by the `notifier_info` accessors.
#[derive(Clone, Debug)]
pub struct NotifierInfo<I> {
    pub selector: Selector<I>,
    pub mask: NotifyMask,
    pub when_idle: bool,
}

pub(crate) struct NotifierEntry<I> {
    pub selector: Selector<I>,
    pub mask: NotifyMask,
    pub when_idle: bool,
    pub sink: Rc<dyn NotifySink<I>>,
}

/// Notifier registry for one axis. Dispatch order is registration order.
pub(crate) struct Notifiers<I> {
    entries: BTreeMap<u64, NotifierEntry<I>>,
}

impl<I> Notifiers<I> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    pub fn add(&mut self, id: u64, entry: NotifierEntry<I>) {
        self.entries.insert(id, entry);
    }

    pub fn delete(&mut self, id: NotifierId) -> bool {
        self.entries.remove(&id.0).is_some()
    }

    pub fn contains(&self, id: NotifierId) -> bool {
        self.entries.contains_key(&id.0)
    }

    pub fn get(&self, id: NotifierId) -> Result<&NotifierEntry<I>, TableError> {
        self.entries
            .get(&id.0)
            .ok_or(TableError::NotifierNotFound(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = (NotifierId, &NotifierEntry<I>)> {
        self.entries
            .iter()
            .map(|(id, entry)| (NotifierId(*id), entry))
    }

    pub fn ids(&self) -> Vec<NotifierId> {
        self.entries.keys().map(|id| NotifierId(*id)).collect()
    }
}
