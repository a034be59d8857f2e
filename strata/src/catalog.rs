//! Registry of tables: name, backing heap file and optional primary key.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{DbError, Result};
use crate::heap_file::HeapFile;
use crate::parser::parse_catalog;
use crate::strata_debug_log;
use crate::tuple::TupleDesc;

struct TableEntry {
    name: String,
    file: Arc<HeapFile>,
    primary_key: Option<String>,
}

#[derive(Default)]
struct CatalogInner {
    ids: HashMap<String, u32>,
    tables: HashMap<u32, TableEntry>,
}

#[derive(Default)]
pub struct Catalog {
    inner: RwLock<CatalogInner>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `file` as `name`. A table already registered under the same
    /// name or the same file id is replaced.
    pub fn add_table(&self, file: Arc<HeapFile>, name: &str, primary_key: Option<&str>) {
        let id = file.id();
        let mut inner = self.inner.write();
        if let Some(old_id) = inner.ids.remove(name) {
            inner.tables.remove(&old_id);
        }
        if let Some(old) = inner.tables.remove(&id) {
            inner.ids.remove(&old.name);
        }
        inner.ids.insert(name.to_string(), id);
        inner.tables.insert(
            id,
            TableEntry {
                name: name.to_string(),
                file,
                primary_key: primary_key.map(str::to_string),
            },
        );
        strata_debug_log!("[Catalog::add_table] {} -> {}", name, id);
    }

    /// Registers `file` under a generated name derived from its id.
    pub fn add_table_unnamed(&self, file: Arc<HeapFile>) -> String {
        let name = format!("table_{:08x}", file.id());
        self.add_table(file, &name, None);
        name
    }

    pub fn table_id(&self, name: &str) -> Result<u32> {
        self.inner
            .read()
            .ids
            .get(name)
            .copied()
            .ok_or_else(|| DbError::NoSuchElement(format!("no table named {}", name)))
    }

    pub fn file(&self, table_id: u32) -> Result<Arc<HeapFile>> {
        self.inner
            .read()
            .tables
            .get(&table_id)
            .map(|entry| Arc::clone(&entry.file))
            .ok_or(DbError::UnknownTable(table_id))
    }

    pub fn tuple_desc(&self, table_id: u32) -> Result<Arc<TupleDesc>> {
        Ok(self.file(table_id)?.tuple_desc().clone())
    }

    pub fn table_name(&self, table_id: u32) -> Result<String> {
        self.inner
            .read()
            .tables
            .get(&table_id)
            .map(|entry| entry.name.clone())
            .ok_or(DbError::UnknownTable(table_id))
    }

    pub fn primary_key(&self, table_id: u32) -> Result<Option<String>> {
        self.inner
            .read()
            .tables
            .get(&table_id)
            .map(|entry| entry.primary_key.clone())
            .ok_or(DbError::UnknownTable(table_id))
    }

    /// Registered table ids in ascending order.
    pub fn table_ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.inner.read().tables.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.ids.clear();
        inner.tables.clear();
    }

    /// Loads every table described in the catalog file at `path`. Each table is
    /// backed by `<name>.dat` next to the catalog file. Returns the new table ids.
    pub fn load_schema<P: AsRef<Path>>(&self, path: P) -> Result<Vec<u32>> {
        let path = path.as_ref();
        let src = std::fs::read_to_string(path)?;
        let dir = path.parent().unwrap_or_else(|| Path::new("."));

        let mut ids = Vec::new();
        for table in parse_catalog(&src)? {
            let file = HeapFile::open(dir.join(format!("{}.dat", table.name)), table.tuple_desc())?;
            let file = Arc::new(file);
            ids.push(file.id());
            self.add_table(file, &table.name, table.primary_key());
            strata_debug_log!(
                "[Catalog::load_schema] loaded {} ({})",
                table.name,
                table.tuple_desc()
            );
        }
        Ok(ids)
    }
}
