use std::io::Write;
use std::rc::Rc;

use pretty_assertions::assert_eq;
use tabula_io::{Exporter, FormatError, FormatRegistry, Importer};
use tabula_model::Table;

/// Minimal CSV importer exercising the plugin contract: the first argument
/// is the CSV text, headers become column labels, records become rows.
struct CsvImporter;

impl Importer for CsvImporter {
    fn name(&self) -> &str {
        "csv"
    }

    fn import(&self, table: &Table, args: &[String]) -> Result<(), FormatError> {
        let data = args
            .first()
            .ok_or_else(|| FormatError::Plugin("csv: missing data argument".to_string()))?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(data.as_bytes());
        let headers = reader
            .headers()
            .map_err(|e| FormatError::Plugin(e.to_string()))?
            .clone();
        let columns: Vec<_> = headers
            .iter()
            .map(|header| table.create_column(Some(header)))
            .collect();
        for record in reader.records() {
            let record = record.map_err(|e| FormatError::Plugin(e.to_string()))?;
            let row = table.create_row(None);
            for (col, field) in columns.iter().zip(record.iter()) {
                table.set(row, *col, field)?;
            }
        }
        Ok(())
    }
}

struct CsvExporter;

impl Exporter for CsvExporter {
    fn name(&self) -> &str {
        "csv"
    }

    fn export(
        &self,
        table: &Table,
        _args: &[String],
        out: &mut dyn Write,
    ) -> Result<(), FormatError> {
        let mut writer = csv::Writer::from_writer(out);
        let columns = table.column_ids();
        let mut headers = Vec::with_capacity(columns.len());
        for col in &columns {
            headers.push(table.column_label(*col)?);
        }
        writer
            .write_record(&headers)
            .map_err(|e| FormatError::Plugin(e.to_string()))?;
        for row in table.row_ids() {
            let mut fields = Vec::with_capacity(columns.len());
            for col in &columns {
                fields.push(table.get_display(row, *col)?);
            }
            writer
                .write_record(&fields)
                .map_err(|e| FormatError::Plugin(e.to_string()))?;
        }
        writer
            .flush()
            .map_err(|e| FormatError::Plugin(e.to_string()))?;
        Ok(())
    }
}

#[test]
fn plugins_route_by_name() {
    let mut registry = FormatRegistry::new();
    registry.register_importer(Rc::new(CsvImporter));
    registry.register_exporter(Rc::new(CsvExporter));
    assert_eq!(registry.importer_names(), vec!["csv".to_string()]);
    assert_eq!(registry.exporter_names(), vec!["csv".to_string()]);
    assert!(registry.importer("xml").is_none());

    let table = Table::new();
    let importer = registry.importer("csv").unwrap();
    importer
        .import(
            &table,
            &["name,count\nalpha,1\nbeta,2\n".to_string()],
        )
        .unwrap();

    assert_eq!(table.row_count(), 2);
    assert_eq!(table.column_count(), 2);
    let name = table.column_by_label("name").unwrap();
    let first = table.row_at(0).unwrap();
    assert_eq!(table.get_text(first, name).unwrap(), Some("alpha".to_string()));

    let exporter = registry.exporter("csv").unwrap();
    let mut out = Vec::new();
    exporter.export(&table, &[], &mut out).unwrap();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "name,count\nalpha,1\nbeta,2\n"
    );
}

#[test]
fn missing_arguments_surface_as_plugin_errors() {
    let table = Table::new();
    let err = CsvImporter.import(&table, &[]).unwrap_err();
    assert!(matches!(err, FormatError::Plugin(_)));
}

#[test]
fn reregistering_a_name_replaces_the_plugin() {
    struct Renamed;
    impl Importer for Renamed {
        fn name(&self) -> &str {
            "csv"
        }
        fn import(&self, _table: &Table, _args: &[String]) -> Result<(), FormatError> {
            Err(FormatError::Plugin("replacement".to_string()))
        }
    }

    let mut registry = FormatRegistry::new();
    registry.register_importer(Rc::new(CsvImporter));
    registry.register_importer(Rc::new(Renamed));
    assert_eq!(registry.importer_names().len(), 1);
    let err = registry
        .importer("csv")
        .unwrap()
        .import(&Table::new(), &[])
        .unwrap_err();
    assert!(matches!(err, FormatError::Plugin(message) if message == "replacement"));
}
