use thiserror::Error;

use crate::ident::TableAxis;
use crate::notify::NotifierId;
use crate::trace::TraceId;
use crate::value::{ColumnType, ConvertError};

/// Errors raised by table operations.
///
/// Callback failures are not represented here: a failing trace or notifier
/// sink is routed to the table's [`ErrorSink`](crate::ErrorSink) and never
/// unwinds the mutation that fired it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TableError {
    /// A row or column id that was deleted (or never existed) was used.
    #[error("no {axis} #{id}")]
    NotFound { axis: TableAxis, id: u64 },

    #[error("no {axis} at index {index}")]
    IndexOutOfRange { axis: TableAxis, index: usize },

    #[error("no {axis} labeled {label:?}")]
    LabelNotFound { axis: TableAxis, label: String },

    /// A label resolved to more than one row/column where exactly one is
    /// required.
    #[error("{count} {axis}s share the label {label:?}")]
    AmbiguousLabel {
        axis: TableAxis,
        label: String,
        count: usize,
    },

    #[error("no {axis} tag {tag:?}")]
    TagNotFound { axis: TableAxis, tag: String },

    #[error("tag {0:?} is reserved")]
    ReservedTag(String),

    #[error("bad tag {0:?}: tag names may not be empty or begin with a digit")]
    InvalidTag(String),

    #[error("no trace {0}")]
    TraceNotFound(TraceId),

    #[error("no notifier {0}")]
    NotifierNotFound(NotifierId),

    #[error("unknown column type {0:?}")]
    UnknownColumnType(String),

    #[error(transparent)]
    Convert(#[from] ConvertError),

    #[error("moving {count} {axis}s from {from} overruns the table ({len} live)")]
    MoveOutOfRange {
        axis: TableAxis,
        from: usize,
        count: usize,
        len: usize,
    },

    #[error("move destination {to} lies inside the moved block")]
    MoveDestinationInBlock { to: usize },

    #[error("row list is not a permutation of the table: {0}")]
    NotAPermutation(String),

    #[error("append requires a string or untyped column (column type is {0})")]
    NotAppendable(ColumnType),

    #[error("key tuple has {got} values but the key has {want} columns")]
    KeyArity { want: usize, got: usize },

    #[error("no key columns are configured")]
    NoKeyColumns,
}
