use thiserror::Error;

use tabula_model::TableError;

/// Errors raised while writing a dump.
#[derive(Debug, Error)]
pub enum DumpError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Table(#[from] TableError),
}

/// Errors raised while reading a dump back into a table.
#[derive(Debug, Error)]
pub enum RestoreError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Table(#[from] TableError),
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("line {line}: value record references undeclared {what} index {index}")]
    UndeclaredIndex {
        line: usize,
        what: &'static str,
        index: usize,
    },
}

/// Errors surfaced by importer/exporter plugins.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Table(#[from] TableError),
    #[error("{0}")]
    Plugin(String),
}
