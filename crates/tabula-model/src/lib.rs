//! `tabula-model` is the core in-memory table engine: a tagged, mutable,
//! sparse two-dimensional table with typed columns and stable row/column
//! identity.
//!
//! The crate is intentionally self-contained so it can be reused by:
//! - the sort engine (`tabula-engine`)
//! - the dump/restore and format-plugin layer (`tabula-io`)
//! - script or IPC bindings, via `serde` on the value types and the typed
//!   trace/notifier sink traits
//!
//! A [`Table`] is a cheap-to-clone handle; every handle sees the same rows,
//! columns, values, tags, traces, and notifiers. Rows and columns keep their
//! identity ([`RowId`]/[`ColumnId`]) across structural edits while their
//! positional indices are renumbered to stay contiguous.

mod error;
mod events;
mod ident;
mod keys;
mod notify;
mod table;
mod tags;
mod trace;
mod value;

pub use error::TableError;
pub use events::{
    CallbackError, ColumnSelector, ErrorSink, EventKind, LogErrorSink, NotifyMask, NotifySink,
    RowSelector, Selector, StructureEvent, TraceEvent, TraceMask, TraceSink,
};
pub use ident::{ColumnId, RowId, TableAxis};
pub use notify::{NotifierId, NotifierInfo};
pub use table::Table;
pub use tags::{TAG_ALL, TAG_END};
pub use trace::{TraceId, TraceInfo};
pub use value::{ColumnType, ConvertError, Value};
