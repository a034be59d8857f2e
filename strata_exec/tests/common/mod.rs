#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use strata::{Database, DatabaseConfig, Field, TransactionId, Tuple, TupleDesc, Type};
use strata_exec::{collect, Executor, SeqScanExecutor};
use tempfile::{tempdir, TempDir};

/// A private database rooted in a temporary directory.
pub struct TestDb {
    pub db: Database,
    pub dir: TempDir,
}

impl TestDb {
    pub fn path(&self, file: &str) -> std::path::PathBuf {
        self.dir.path().join(file)
    }
}

pub fn setup(pages: usize) -> TestDb {
    let dir = tempdir().unwrap();
    let config = DatabaseConfig::default()
        .with_pages(pages)
        .with_lock_retry(Duration::from_millis(10));
    TestDb {
        db: Database::new(config),
        dir,
    }
}

/// Creates `name` with INT columns named after `columns`.
pub fn create_int_table(test: &TestDb, name: &str, columns: &[&str]) -> u32 {
    let desc = TupleDesc::new(vec![Type::Int; columns.len()], columns.to_vec());
    test.db
        .create_table(test.path(&format!("{}.dat", name)), name, desc, None)
        .unwrap()
}

pub fn int_tuple(desc: &Arc<TupleDesc>, values: &[i32]) -> Tuple {
    Tuple::from_fields(desc.clone(), values.iter().map(|v| Field::Int(*v)).collect()).unwrap()
}

pub fn insert_rows(test: &TestDb, tid: TransactionId, table_id: u32, rows: &[&[i32]]) {
    let desc = test.db.catalog().tuple_desc(table_id).unwrap();
    for row in rows {
        test.db
            .buffer_pool()
            .insert_tuple(tid, table_id, int_tuple(&desc, row))
            .unwrap();
    }
}

pub fn ints(tuples: &[Tuple]) -> Vec<Vec<i32>> {
    tuples
        .iter()
        .map(|t| t.fields().iter().filter_map(Field::as_int).collect())
        .collect()
}

/// Every row of `table_id` as seen by `tid`, in page/slot order.
pub fn scan_ints(test: &TestDb, tid: TransactionId, table_id: u32) -> Vec<Vec<i32>> {
    let mut scan = SeqScanExecutor::new(&test.db, tid, table_id).unwrap();
    scan.open().unwrap();
    let rows = collect(&mut scan).unwrap();
    scan.close();
    ints(&rows)
}

/// Commits a transaction that inserts `rows`.
pub fn seed(test: &TestDb, table_id: u32, rows: &[&[i32]]) {
    let tx = test.db.begin();
    insert_rows(test, tx.tid(), table_id, rows);
    tx.commit().unwrap();
}
