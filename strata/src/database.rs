//! The explicit database context handed to operators and tests.

use std::path::Path;
use std::sync::Arc;

use crate::buffer_pool::BufferPool;
use crate::catalog::Catalog;
use crate::config::DatabaseConfig;
use crate::error::Result;
use crate::heap_file::HeapFile;
use crate::transaction::Transaction;
use crate::tuple::TupleDesc;

pub struct Database {
    catalog: Arc<Catalog>,
    buffer_pool: Arc<BufferPool>,
}

impl Database {
    /// An empty database with no tables.
    pub fn new(config: DatabaseConfig) -> Self {
        let catalog = Arc::new(Catalog::new());
        let buffer_pool = Arc::new(BufferPool::new(Arc::clone(&catalog), &config));
        Self {
            catalog,
            buffer_pool,
        }
    }

    /// A database whose tables are described by the catalog file at `catalog_path`.
    pub fn open<P: AsRef<Path>>(catalog_path: P, config: DatabaseConfig) -> Result<Self> {
        let db = Self::new(config);
        db.catalog.load_schema(catalog_path)?;
        Ok(db)
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn buffer_pool(&self) -> &Arc<BufferPool> {
        &self.buffer_pool
    }

    /// Opens (or creates) the heap file at `path` and registers it as `name`.
    pub fn create_table<P: AsRef<Path>>(
        &self,
        path: P,
        name: &str,
        desc: TupleDesc,
        primary_key: Option<&str>,
    ) -> Result<u32> {
        let file = Arc::new(HeapFile::open(path, desc)?);
        let id = file.id();
        self.catalog.add_table(file, name, primary_key);
        Ok(id)
    }

    pub fn begin(&self) -> Transaction {
        Transaction::begin(Arc::clone(&self.buffer_pool))
    }
}
