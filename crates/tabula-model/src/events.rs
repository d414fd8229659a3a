use std::fmt;

use bitflags::bitflags;
use thiserror::Error;

use crate::ident::{ColumnId, RowId};
use crate::table::Table;

bitflags! {
    /// Cell accesses a trace can watch.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct TraceMask: u8 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
        const UNSET = 1 << 2;
        /// A value was stored into a previously absent cell. Always fires
        /// together with `WRITE`.
        const CREATE = 1 << 3;
    }
}

bitflags! {
    /// Structural events a notifier can watch.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct NotifyMask: u8 {
        const CREATE = 1 << 0;
        const DELETE = 1 << 1;
        const MOVE = 1 << 2;
        const RELABEL = 1 << 3;
        const ALL_EVENTS = Self::CREATE.bits()
            | Self::DELETE.bits()
            | Self::MOVE.bits()
            | Self::RELABEL.bits();
    }
}

/// Structural change kind delivered to notifiers.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EventKind {
    Create,
    Delete,
    Move,
    Relabel,
}

impl EventKind {
    pub(crate) fn mask(self) -> NotifyMask {
        match self {
            EventKind::Create => NotifyMask::CREATE,
            EventKind::Delete => NotifyMask::DELETE,
            EventKind::Move => NotifyMask::MOVE,
            EventKind::Relabel => NotifyMask::RELABEL,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EventKind::Create => "create",
            EventKind::Delete => "delete",
            EventKind::Move => "move",
            EventKind::Relabel => "relabel",
        })
    }
}

/// A cell access delivered to a trace sink.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TraceEvent {
    pub row: RowId,
    pub column: ColumnId,
    /// The accesses that occurred (`WRITE | CREATE` for a first set).
    pub mask: TraceMask,
}

/// A structural change delivered to a notifier sink.
///
/// `index` is the position the row/column holds once the change has been
/// applied; for deletions it is the position the id held.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StructureEvent<I> {
    pub kind: EventKind,
    pub id: I,
    pub index: usize,
}

/// Error returned by a trace or notifier callback.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct CallbackError(pub String);

impl CallbackError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Selects which rows (or columns) a trace or notifier applies to.
///
/// Tag selectors are evaluated when an event fires, so tag membership
/// changes take effect without re-registering.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selector<I> {
    /// A single concrete row/column.
    Id(I),
    /// Every row/column carrying the tag at fire time (`"all"` and `"end"`
    /// keep their synthesized meanings).
    Tag(String),
}

impl<I> Selector<I> {
    pub fn tag(name: impl Into<String>) -> Self {
        Selector::Tag(name.into())
    }
}

impl<I> From<I> for Selector<I> {
    fn from(id: I) -> Self {
        Selector::Id(id)
    }
}

/// Row-side selector of a trace or notifier.
pub type RowSelector = Selector<RowId>;

/// Column-side selector of a trace or notifier.
pub type ColumnSelector = Selector<ColumnId>;

/// Receives cell access events.
///
/// The sink gets a handle to the firing table and may re-enter it, including
/// mutating it; the engine snapshots its dispatch plan before invoking any
/// sink, so registrations added or removed from inside a callback never
/// corrupt the delivery in progress.
pub trait TraceSink {
    fn on_access(&self, table: &Table, event: &TraceEvent) -> Result<(), CallbackError>;
}

impl<F> TraceSink for F
where
    F: Fn(&Table, &TraceEvent) -> Result<(), CallbackError>,
{
    fn on_access(&self, table: &Table, event: &TraceEvent) -> Result<(), CallbackError> {
        self(table, event)
    }
}

/// Receives structural change events for one axis.
pub trait NotifySink<I> {
    fn on_change(&self, table: &Table, event: &StructureEvent<I>) -> Result<(), CallbackError>;
}

impl<F, I> NotifySink<I> for F
where
    F: Fn(&Table, &StructureEvent<I>) -> Result<(), CallbackError>,
{
    fn on_change(&self, table: &Table, event: &StructureEvent<I>) -> Result<(), CallbackError> {
        self(table, event)
    }
}

/// Receives callback failures out of band.
///
/// A failing trace or notifier callback is reported here and never unwinds
/// the mutation that fired it; the mutation has already committed.
pub trait ErrorSink {
    fn callback_failed(&self, context: &str, error: &CallbackError);
}

/// Default error sink: reports through the `log` facade.
pub struct LogErrorSink;

impl ErrorSink for LogErrorSink {
    fn callback_failed(&self, context: &str, error: &CallbackError) {
        log::error!("{context} callback failed: {error}");
    }
}
