//! `tabula-engine` sorts the rows of a [`tabula_model::Table`].
//!
//! A sort is described by an ordered list of [`SortKey`]s (column, direction,
//! comparison mode) and produces a row permutation: either returned to the
//! caller ([`sort_rows`]) or installed as the table's permanent row order
//! ([`sort_apply`]). Comparison reads cell snapshots taken up front, so read
//! traces never fire mid-sort.

mod compare;
mod sort;

pub use compare::{ascii_cmp, dictionary_cmp};
pub use sort::{sort_apply, sort_rows, Direction, SortError, SortKey, SortMode, SortOptions};
