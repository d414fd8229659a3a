use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::str::FromStr;

use ahash::AHashMap;
use tabula_model::{ColumnId, ColumnType, RowId, Table};

use crate::error::RestoreError;
use crate::record::decode_fields;

/// Switches controlling how a dump is applied.
#[derive(Clone, Debug, Default)]
pub struct RestoreOptions {
    /// Clear the destination table before applying the dump. Without it the
    /// dump merges additively: dumped indices map onto existing rows and
    /// columns by index (labels, types, and tags are overwritten from the
    /// dump) and indices beyond the current extent append fresh ones.
    pub overwrite: bool,
    /// Ignore tag fields even when records carry them.
    pub no_tags: bool,
}

struct ColumnRecord {
    index: usize,
    label: String,
    ty: ColumnType,
    tags: Vec<String>,
}

struct RowRecord {
    index: usize,
    label: String,
    tags: Vec<String>,
}

struct ValueRecord {
    line: usize,
    row: usize,
    col: usize,
    text: String,
}

/// Apply a dump to `table`.
///
/// Records may arrive in any order; structure is applied before any value
/// record is resolved. Unknown record markers are skipped with a warning so
/// newer producers stay readable. A value record whose index was never
/// declared by a structural record is an error.
pub fn restore_from_str(
    table: &Table,
    text: &str,
    options: &RestoreOptions,
) -> Result<(), RestoreError> {
    let (mut columns, mut rows, values) = parse(text)?;

    if options.overwrite {
        for row in table.row_ids() {
            table.delete_row(row)?;
        }
        for col in table.column_ids() {
            table.delete_column(col)?;
        }
    }

    // Apply structure in dumped-index order so appended entries land where
    // the producer put them.
    columns.sort_by_key(|rec| rec.index);
    rows.sort_by_key(|rec| rec.index);

    let reusable_cols = if options.overwrite { 0 } else { table.column_count() };
    let mut col_map: AHashMap<usize, ColumnId> = AHashMap::new();
    for rec in &columns {
        let id = if rec.index < reusable_cols {
            let existing = table.column_at(rec.index)?;
            table.set_column_label(existing, &rec.label)?;
            existing
        } else {
            table.create_column(Some(&rec.label))
        };
        table.set_column_type(id, rec.ty)?;
        if !options.no_tags {
            for tag in &rec.tags {
                table.add_column_tag(id, tag)?;
            }
        }
        col_map.insert(rec.index, id);
    }

    let reusable_rows = if options.overwrite { 0 } else { table.row_count() };
    let mut row_map: AHashMap<usize, RowId> = AHashMap::new();
    for rec in &rows {
        let id = if rec.index < reusable_rows {
            let existing = table.row_at(rec.index)?;
            table.set_row_label(existing, &rec.label)?;
            existing
        } else {
            table.create_row(Some(&rec.label))
        };
        if !options.no_tags {
            for tag in &rec.tags {
                table.add_row_tag(id, tag)?;
            }
        }
        row_map.insert(rec.index, id);
    }

    for rec in &values {
        let row = row_map
            .get(&rec.row)
            .copied()
            .ok_or(RestoreError::UndeclaredIndex {
                line: rec.line,
                what: "row",
                index: rec.row,
            })?;
        let col = col_map
            .get(&rec.col)
            .copied()
            .ok_or(RestoreError::UndeclaredIndex {
                line: rec.line,
                what: "column",
                index: rec.col,
            })?;
        table.set(row, col, rec.text.as_str())?;
    }

    Ok(())
}

pub fn restore_from_reader(
    table: &Table,
    mut reader: impl Read,
    options: &RestoreOptions,
) -> Result<(), RestoreError> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    restore_from_str(table, &text, options)
}

pub fn restore_from_file(
    table: &Table,
    path: impl AsRef<Path>,
    options: &RestoreOptions,
) -> Result<(), RestoreError> {
    let file = File::open(path)?;
    restore_from_reader(table, BufReader::new(file), options)
}

type Parsed = (Vec<ColumnRecord>, Vec<RowRecord>, Vec<ValueRecord>);

fn parse(text: &str) -> Result<Parsed, RestoreError> {
    let mut columns = Vec::new();
    let mut rows = Vec::new();
    let mut values = Vec::new();

    for (number, raw) in text.lines().enumerate() {
        let line = number + 1;
        if raw.is_empty() {
            continue;
        }
        let fields =
            decode_fields(raw).map_err(|message| RestoreError::Parse { line, message })?;
        match fields[0].as_str() {
            // header counts are informational; structure records are the
            // source of truth
            "i" => {
                expect_fields(line, &fields, 5, 5)?;
            }
            "c" => {
                expect_fields(line, &fields, 4, 5)?;
                columns.push(ColumnRecord {
                    index: parse_index(line, &fields[1])?,
                    label: fields[2].clone(),
                    ty: ColumnType::from_str(&fields[3])?,
                    tags: parse_tags(line, fields.get(4))?,
                });
            }
            "r" => {
                expect_fields(line, &fields, 3, 4)?;
                rows.push(RowRecord {
                    index: parse_index(line, &fields[1])?,
                    label: fields[2].clone(),
                    tags: parse_tags(line, fields.get(3))?,
                });
            }
            "d" => {
                expect_fields(line, &fields, 4, 4)?;
                values.push(ValueRecord {
                    line,
                    row: parse_index(line, &fields[1])?,
                    col: parse_index(line, &fields[2])?,
                    text: fields[3].clone(),
                });
            }
            other => {
                log::warn!("restore: skipping unknown record {other:?} on line {line}");
            }
        }
    }

    Ok((columns, rows, values))
}

fn expect_fields(
    line: usize,
    fields: &[String],
    min: usize,
    max: usize,
) -> Result<(), RestoreError> {
    if fields.len() < min || fields.len() > max {
        return Err(RestoreError::Parse {
            line,
            message: format!(
                "record {:?} has {} fields, expected {min}..={max}",
                fields[0],
                fields.len()
            ),
        });
    }
    Ok(())
}

fn parse_index(line: usize, field: &str) -> Result<usize, RestoreError> {
    field.parse().map_err(|_| RestoreError::Parse {
        line,
        message: format!("bad index {field:?}"),
    })
}

fn parse_tags(line: usize, field: Option<&String>) -> Result<Vec<String>, RestoreError> {
    match field {
        None => Ok(Vec::new()),
        Some(list) if list.is_empty() => Ok(Vec::new()),
        Some(list) => decode_fields(list).map_err(|message| RestoreError::Parse {
            line,
            message: format!("bad tag list: {message}"),
        }),
    }
}
