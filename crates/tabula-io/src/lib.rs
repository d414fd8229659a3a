//! `tabula-io` persists [`tabula_model::Table`]s.
//!
//! Two layers live here:
//! - the dump/restore text codec: one escaped record per line, preserving
//!   structure, labels, types, tags, and present values exactly
//! - the [`FormatRegistry`] through which external format plugins
//!   (CSV, XML, ...) attach by name; no concrete file format ships in the
//!   library itself

mod dump;
mod error;
mod record;
mod registry;
mod restore;

pub use dump::{dump_to_file, dump_to_string, dump_to_writer, DumpOptions};
pub use error::{DumpError, FormatError, RestoreError};
pub use registry::{Exporter, FormatRegistry, Importer};
pub use restore::{restore_from_file, restore_from_reader, restore_from_str, RestoreOptions};
