use std::io::Write;
use std::rc::Rc;

use ahash::AHashMap;

use tabula_model::Table;

use crate::error::FormatError;

/// A named import plugin: reads some external format into a table.
///
/// Plugins interpret `args` themselves (source path or inline data,
/// delimiter switches, and so on); the engine only routes by name.
pub trait Importer {
    fn name(&self) -> &str;
    fn import(&self, table: &Table, args: &[String]) -> Result<(), FormatError>;
}

/// A named export plugin: writes a table into some external format.
pub trait Exporter {
    fn name(&self) -> &str;
    fn export(&self, table: &Table, args: &[String], out: &mut dyn Write)
        -> Result<(), FormatError>;
}

/// Registry of format plugins.
///
/// One registry per embedding context; it is an explicit object handed to
/// whatever front-end embeds the engine, never a process-wide singleton.
/// Registering a plugin under an already-taken name replaces the previous
/// one.
#[derive(Default)]
pub struct FormatRegistry {
    importers: AHashMap<String, Rc<dyn Importer>>,
    exporters: AHashMap<String, Rc<dyn Exporter>>,
}

impl FormatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_importer(&mut self, importer: Rc<dyn Importer>) {
        self.importers.insert(importer.name().to_string(), importer);
    }

    pub fn register_exporter(&mut self, exporter: Rc<dyn Exporter>) {
        self.exporters.insert(exporter.name().to_string(), exporter);
    }

    pub fn importer(&self, name: &str) -> Option<Rc<dyn Importer>> {
        self.importers.get(name).cloned()
    }

    pub fn exporter(&self, name: &str) -> Option<Rc<dyn Exporter>> {
        self.exporters.get(name).cloned()
    }

    pub fn importer_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.importers.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn exporter_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.exporters.keys().cloned().collect();
        names.sort();
        names
    }
}
