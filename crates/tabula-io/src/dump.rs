use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tabula_model::{ColumnId, RowId, Table};

use crate::error::DumpError;
use crate::record::encode_fields;

/// Switches controlling what a dump contains.
#[derive(Clone, Debug, Default)]
pub struct DumpOptions {
    /// Suppress tag fields on row and column records.
    pub no_tags: bool,
    /// Dump only these rows (default: every row, in index order). Records
    /// carry the rows' current indices either way.
    pub rows: Option<Vec<RowId>>,
    /// Dump only these columns.
    pub columns: Option<Vec<ColumnId>>,
}

/// Serialize a table to the line-record text format.
///
/// Layout: an `i` header carrying the written row/column counts, `c` and
/// `r` records for structure (index, label, type, tags), then one `d`
/// record per present cell. Reads do not fire traces.
pub fn dump_to_string(table: &Table, options: &DumpOptions) -> Result<String, DumpError> {
    let rows = match &options.rows {
        Some(rows) => {
            for row in rows {
                table.row_index(*row)?;
            }
            rows.clone()
        }
        None => table.row_ids(),
    };
    let columns = match &options.columns {
        Some(columns) => {
            for col in columns {
                table.column_index(*col)?;
            }
            columns.clone()
        }
        None => table.column_ids(),
    };

    let mut out = String::new();
    let nrows = rows.len().to_string();
    let ncols = columns.len().to_string();
    push_record(&mut out, &["i", &nrows, &ncols, "0", "0"]);

    for col in &columns {
        let index = table.column_index(*col)?.to_string();
        let label = table.column_label(*col)?;
        let ty = table.column_type(*col)?;
        if options.no_tags {
            push_record(&mut out, &["c", &index, &label, ty.name()]);
        } else {
            let tags = tag_list(table.column_tags(*col)?);
            push_record(&mut out, &["c", &index, &label, ty.name(), &tags]);
        }
    }

    for row in &rows {
        let index = table.row_index(*row)?.to_string();
        let label = table.row_label(*row)?;
        if options.no_tags {
            push_record(&mut out, &["r", &index, &label]);
        } else {
            let tags = tag_list(table.row_tags(*row)?);
            push_record(&mut out, &["r", &index, &label, &tags]);
        }
    }

    for row in &rows {
        let row_index = table.row_index(*row)?.to_string();
        for col in &columns {
            let Some(value) = table.peek(*row, *col)? else {
                continue;
            };
            let col_index = table.column_index(*col)?.to_string();
            push_record(&mut out, &["d", &row_index, &col_index, &value.to_text()]);
        }
    }

    Ok(out)
}

pub fn dump_to_writer(
    table: &Table,
    mut writer: impl Write,
    options: &DumpOptions,
) -> Result<(), DumpError> {
    let text = dump_to_string(table, options)?;
    writer.write_all(text.as_bytes())?;
    Ok(())
}

pub fn dump_to_file(
    table: &Table,
    path: impl AsRef<Path>,
    options: &DumpOptions,
) -> Result<(), DumpError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    dump_to_writer(table, &mut writer, options)?;
    writer.flush()?;
    Ok(())
}

fn push_record(out: &mut String, fields: &[&str]) {
    out.push_str(&encode_fields(fields));
    out.push('\n');
}

/// Tags travel as one field that is itself an encoded list.
fn tag_list(tags: Vec<String>) -> String {
    let refs: Vec<&str> = tags.iter().map(String::as_str).collect();
    encode_fields(&refs)
}
