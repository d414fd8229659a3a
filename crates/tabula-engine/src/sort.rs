use std::cmp::Ordering;

use ahash::AHashMap;
use thiserror::Error;

use tabula_model::{ColumnId, RowId, Table, TableError, Value};

use crate::compare::{ascii_cmp, dictionary_cmp};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

/// How one sort key compares cell values.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum SortMode {
    /// Type-appropriate: numeric comparison for numeric columns, text order
    /// otherwise.
    #[default]
    Auto,
    /// Byte order of the text forms.
    Ascii,
    /// Case- and number-aware text order.
    Dictionary,
    /// Value popularity, most frequent first (under `Ascending`).
    Frequency,
}

#[derive(Clone, Debug)]
pub struct SortKey {
    pub column: ColumnId,
    pub direction: Direction,
    pub mode: SortMode,
}

impl SortKey {
    pub fn new(column: ColumnId) -> Self {
        Self {
            column,
            direction: Direction::Ascending,
            mode: SortMode::Auto,
        }
    }

    pub fn descending(mut self) -> Self {
        self.direction = Direction::Descending;
        self
    }

    pub fn with_mode(mut self, mode: SortMode) -> Self {
        self.mode = mode;
        self
    }
}

#[derive(Clone, Debug, Default)]
pub struct SortOptions {
    /// Keys in decreasing significance; the first non-equal key decides.
    pub keys: Vec<SortKey>,
    /// Collapse post-sort adjacent ties under the primary key's comparator
    /// into one representative each.
    pub unique: bool,
}

#[derive(Debug, Error)]
pub enum SortError {
    #[error("sort requires at least one key column")]
    NoKeys,
    #[error("a unique sort filters rows and cannot be applied as the table order")]
    UniqueNotApplicable,
    #[error(transparent)]
    Table(#[from] TableError),
}

/// Per-key snapshot of the sorted rows' cell data.
///
/// Values are pulled once up front (without firing read traces) so the
/// comparator never touches the table mid-sort.
enum KeyData {
    Typed(Vec<Option<Value>>),
    Text(Vec<Option<String>>),
    Dict(Vec<Option<String>>),
    Frequency(Vec<Option<usize>>),
}

struct PreparedKey {
    direction: Direction,
    data: KeyData,
}

impl PreparedKey {
    fn build(table: &Table, rows: &[RowId], key: &SortKey) -> Result<Self, SortError> {
        let mut values = Vec::with_capacity(rows.len());
        for row in rows {
            values.push(table.peek(*row, key.column)?);
        }
        let data = match key.mode {
            SortMode::Auto => KeyData::Typed(values),
            SortMode::Ascii => KeyData::Text(texts(values)),
            SortMode::Dictionary => KeyData::Dict(texts(values)),
            SortMode::Frequency => {
                let texts = texts(values);
                let mut counts: AHashMap<&str, usize> = AHashMap::new();
                for text in texts.iter().flatten() {
                    *counts.entry(text.as_str()).or_default() += 1;
                }
                KeyData::Frequency(
                    texts
                        .iter()
                        .map(|t| t.as_deref().map(|text| counts[text]))
                        .collect(),
                )
            }
        };
        Ok(Self {
            direction: key.direction,
            data,
        })
    }

    /// Compare the rows at snapshot positions `a` and `b`. Absent cells sort
    /// after every present value (under `Ascending`).
    fn cmp(&self, a: usize, b: usize) -> Ordering {
        let ord = match &self.data {
            KeyData::Typed(values) => option_cmp(&values[a], &values[b], Value::compare),
            KeyData::Text(values) => {
                option_cmp(&values[a], &values[b], |x, y| ascii_cmp(x, y))
            }
            KeyData::Dict(values) => {
                option_cmp(&values[a], &values[b], |x, y| dictionary_cmp(x, y))
            }
            // higher count first; count order flips so that Ascending means
            // "most popular first"
            KeyData::Frequency(counts) => option_cmp(&counts[a], &counts[b], |x, y| y.cmp(x)),
        };
        match self.direction {
            Direction::Ascending => ord,
            Direction::Descending => ord.reverse(),
        }
    }
}

fn texts(values: Vec<Option<Value>>) -> Vec<Option<String>> {
    values
        .into_iter()
        .map(|v| v.map(|value| value.to_text()))
        .collect()
}

fn option_cmp<T>(a: &Option<T>, b: &Option<T>, cmp: impl Fn(&T, &T) -> Ordering) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => cmp(x, y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Produce the sorted row list without touching the table.
///
/// The sort is stable: rows equal under every key keep their original
/// relative order. With a `subset` only those rows are compared and
/// returned; the rest of the table does not participate.
pub fn sort_rows(
    table: &Table,
    options: &SortOptions,
    subset: Option<&[RowId]>,
) -> Result<Vec<RowId>, SortError> {
    if options.keys.is_empty() {
        return Err(SortError::NoKeys);
    }
    let rows: Vec<RowId> = match subset {
        Some(rows) => {
            for row in rows {
                table.row_index(*row)?;
            }
            rows.to_vec()
        }
        None => table.row_ids(),
    };
    let prepared: Vec<PreparedKey> = options
        .keys
        .iter()
        .map(|key| PreparedKey::build(table, &rows, key))
        .collect::<Result<_, _>>()?;

    let mut order: Vec<usize> = (0..rows.len()).collect();
    order.sort_by(|a, b| {
        for key in &prepared {
            let ord = key.cmp(*a, *b);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });

    if options.unique {
        let primary = &prepared[0];
        let mut representative: Option<usize> = None;
        let mut kept = Vec::new();
        for position in order {
            let tied = representative
                .is_some_and(|rep| primary.cmp(rep, position) == Ordering::Equal);
            if !tied {
                representative = Some(position);
                kept.push(rows[position]);
            }
        }
        return Ok(kept);
    }

    Ok(order.into_iter().map(|position| rows[position]).collect())
}

/// Sort and install the result as the table's permanent row order. Row ids
/// keep their identity; only positional indices change.
pub fn sort_apply(
    table: &Table,
    options: &SortOptions,
    subset: Option<&[RowId]>,
) -> Result<(), SortError> {
    if options.unique {
        return Err(SortError::UniqueNotApplicable);
    }
    let order = sort_rows(table, options, subset)?;
    table.reorder_rows(&order)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tabula_model::ColumnType;

    fn long_column(table: &Table, label: &str, values: &[i64]) -> ColumnId {
        let col = table.create_column(Some(label));
        table.set_column_type(col, ColumnType::Long).unwrap();
        while table.row_count() < values.len() {
            table.create_row(None);
        }
        let rows = table.row_ids();
        for (row, value) in rows.iter().zip(values) {
            table.set(*row, col, *value).unwrap();
        }
        col
    }

    #[test]
    fn absent_cells_sort_last() {
        let table = Table::new();
        let rows = table.extend_rows(3);
        let col = table.create_column(None);
        table.set_column_type(col, ColumnType::Long).unwrap();
        table.set(rows[0], col, 5i64).unwrap();
        table.set(rows[2], col, 1i64).unwrap();

        let sorted = sort_rows(
            &table,
            &SortOptions {
                keys: vec![SortKey::new(col)],
                unique: false,
            },
            None,
        )
        .unwrap();
        assert_eq!(sorted, vec![rows[2], rows[0], rows[1]]);
    }

    #[test]
    fn frequency_orders_popular_values_first() {
        let table = Table::new();
        let col = long_column(&table, "n", &[7, 3, 7, 9, 7, 3]);
        let rows = table.row_ids();

        let sorted = sort_rows(
            &table,
            &SortOptions {
                keys: vec![SortKey::new(col).with_mode(SortMode::Frequency)],
                unique: false,
            },
            None,
        )
        .unwrap();
        // 7 appears three times, 3 twice, 9 once; ties stay in table order
        assert_eq!(
            sorted,
            vec![rows[0], rows[2], rows[4], rows[1], rows[5], rows[3]]
        );
    }

    #[test]
    fn unique_requires_a_list_sort() {
        let table = Table::new();
        let col = long_column(&table, "n", &[1, 2]);
        let err = sort_apply(
            &table,
            &SortOptions {
                keys: vec![SortKey::new(col)],
                unique: true,
            },
            None,
        )
        .unwrap_err();
        assert!(matches!(err, SortError::UniqueNotApplicable));
    }
}
