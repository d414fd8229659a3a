use pretty_assertions::assert_eq;
use tabula_io::{
    dump_to_file, dump_to_string, restore_from_file, restore_from_str, DumpOptions,
    RestoreError, RestoreOptions,
};
use tabula_model::{ColumnType, Table, Value};

fn sample_table() -> Table {
    let table = Table::new();
    let name = table.create_column(Some("name"));
    let count = table.create_column(Some("count"));
    let payload = table.create_column(Some("payload"));
    table.set_column_type(count, ColumnType::Long).unwrap();
    table.set_column_type(payload, ColumnType::Blob).unwrap();
    table.add_column_tag(count, "numeric").unwrap();

    let rows = table.extend_rows(3);
    table.set_row_label(rows[0], "first").unwrap();
    table.add_row_tag(rows[0], "keep").unwrap();
    table.add_row_tag(rows[2], "keep").unwrap();

    table.set(rows[0], name, "plain").unwrap();
    table.set(rows[1], name, "with space\nand newline").unwrap();
    table.set(rows[0], count, 42i64).unwrap();
    table.set(rows[2], count, -7i64).unwrap();
    table
        .set(rows[1], payload, Value::Blob(vec![0, 1, 2, 255]))
        .unwrap();
    // rows[2]'s name cell stays absent, not empty
    table
}

/// Everything observable about a table that a dump must preserve.
fn snapshot(table: &Table) -> Vec<String> {
    let mut lines = Vec::new();
    for col in table.column_ids() {
        lines.push(format!(
            "col {} {} {:?}",
            table.column_label(col).unwrap(),
            table.column_type(col).unwrap(),
            table.column_tags(col).unwrap(),
        ));
    }
    for row in table.row_ids() {
        lines.push(format!(
            "row {} {:?}",
            table.row_label(row).unwrap(),
            table.row_tags(row).unwrap(),
        ));
        for col in table.column_ids() {
            lines.push(format!("cell {:?}", table.peek(row, col).unwrap()));
        }
    }
    lines
}

#[test]
fn round_trip_preserves_structure_tags_types_and_values() {
    let source = sample_table();
    let text = dump_to_string(&source, &DumpOptions::default()).unwrap();

    let target = Table::new();
    restore_from_str(
        &target,
        &text,
        &RestoreOptions {
            overwrite: true,
            no_tags: false,
        },
    )
    .unwrap();

    assert_eq!(snapshot(&target), snapshot(&source));
    // absence survived: never-set cells are still absent, not empty strings
    let row2 = target.row_at(2).unwrap();
    let name = target.column_by_label("name").unwrap();
    assert!(!target.exists(row2, name));
}

#[test]
fn no_tags_dump_drops_tag_fields() {
    let source = sample_table();
    let text = dump_to_string(
        &source,
        &DumpOptions {
            no_tags: true,
            ..DumpOptions::default()
        },
    )
    .unwrap();

    let target = Table::new();
    restore_from_str(&target, &text, &RestoreOptions::default()).unwrap();
    let row0 = target.row_at(0).unwrap();
    assert!(target.row_tags(row0).unwrap().is_empty());
    assert!(!target.row_tag_exists("keep"));
}

#[test]
fn no_tags_restore_skips_present_tag_fields() {
    let source = sample_table();
    let text = dump_to_string(&source, &DumpOptions::default()).unwrap();

    let target = Table::new();
    restore_from_str(
        &target,
        &text,
        &RestoreOptions {
            overwrite: false,
            no_tags: true,
        },
    )
    .unwrap();
    assert!(!target.row_tag_exists("keep"));
    assert!(!target.column_tag_exists("numeric"));
}

#[test]
fn additive_merge_reuses_by_index_and_appends_beyond() {
    let source = sample_table();
    let text = dump_to_string(&source, &DumpOptions::default()).unwrap();

    // destination already has two columns and two rows of its own
    let target = Table::new();
    let local_a = target.create_column(Some("local_a"));
    let local_b = target.create_column(Some("local_b"));
    let old_rows = target.extend_rows(2);
    target.set(old_rows[1], local_b, "123").unwrap();

    restore_from_str(&target, &text, &RestoreOptions::default()).unwrap();

    // columns 0..1 were reused (relabeled and retyped from the dump), the
    // third appended
    assert_eq!(target.column_count(), 3);
    assert_eq!(target.column_at(0).unwrap(), local_a);
    assert_eq!(target.column_label(local_a).unwrap(), "name");
    assert_eq!(target.column_label(local_b).unwrap(), "count");
    assert_eq!(target.column_type(local_b).unwrap(), ColumnType::Long);
    // rows 0..1 reused, row 2 appended
    assert_eq!(target.row_count(), 3);
    assert_eq!(target.row_at(0).unwrap(), old_rows[0]);
    assert_eq!(target.row_label(old_rows[0]).unwrap(), "first");
    // a dumped cell lands on the reused column
    assert_eq!(
        target.get_text(old_rows[0], local_a).unwrap(),
        Some("plain".to_string())
    );
    // a destination cell the dump never mentioned survives the merge
    assert_eq!(target.get_long(old_rows[1], local_b).unwrap(), Some(123));
}

#[test]
fn merge_type_conflict_surfaces_as_error() {
    let source = Table::new();
    let col = source.create_column(Some("n"));
    source.set_column_type(col, ColumnType::Long).unwrap();
    let text = dump_to_string(&source, &DumpOptions::default()).unwrap();

    // the destination column holds a value the dumped type cannot represent
    let target = Table::new();
    let existing = target.create_column(Some("words"));
    let row = target.create_row(None);
    target.set(row, existing, "not numeric").unwrap();

    let err = restore_from_str(&target, &text, &RestoreOptions::default()).unwrap_err();
    assert!(matches!(err, RestoreError::Table(_)));
}

#[test]
fn value_records_may_precede_structure() {
    let shuffled = "\
d 0 0 late
i 1 1 0 0
c 0 only string \\e
r 0 r0 \\e
";
    let table = Table::new();
    restore_from_str(&table, shuffled, &RestoreOptions::default()).unwrap();
    let row = table.row_at(0).unwrap();
    let col = table.column_at(0).unwrap();
    assert_eq!(table.get_text(row, col).unwrap(), Some("late".to_string()));
}

#[test]
fn undeclared_value_index_is_an_error() {
    let text = "\
i 1 1 0 0
c 0 only string \\e
r 0 r0 \\e
d 5 0 oops
";
    let table = Table::new();
    let err = restore_from_str(&table, text, &RestoreOptions::default()).unwrap_err();
    assert!(matches!(
        err,
        RestoreError::UndeclaredIndex {
            what: "row",
            index: 5,
            ..
        }
    ));
}

#[test]
fn unknown_record_markers_are_skipped() {
    let text = "\
i 1 1 0 0
z some future record kind
c 0 only string \\e
r 0 r0 \\e
d 0 0 ok
";
    let table = Table::new();
    restore_from_str(&table, text, &RestoreOptions::default()).unwrap();
    assert_eq!(table.row_count(), 1);
}

#[test]
fn file_round_trip() {
    let source = sample_table();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("table.dump");

    dump_to_file(&source, &path, &DumpOptions::default()).unwrap();
    let target = Table::new();
    restore_from_file(
        &target,
        &path,
        &RestoreOptions {
            overwrite: true,
            no_tags: false,
        },
    )
    .unwrap();
    assert_eq!(snapshot(&target), snapshot(&source));
}

#[test]
fn subset_dump_carries_current_indices() {
    let source = sample_table();
    let rows = source.row_ids();
    let text = dump_to_string(
        &source,
        &DumpOptions {
            rows: Some(vec![rows[2]]),
            ..DumpOptions::default()
        },
    )
    .unwrap();

    // the single dumped row keeps index 2; restoring into an empty table
    // appends it (indices 0 and 1 were never declared)
    let target = Table::new();
    restore_from_str(&target, &text, &RestoreOptions::default()).unwrap();
    assert_eq!(target.row_count(), 1);
    let row = target.row_at(0).unwrap();
    let count = target.column_by_label("count").unwrap();
    assert_eq!(target.get_long(row, count).unwrap(), Some(-7));
}
