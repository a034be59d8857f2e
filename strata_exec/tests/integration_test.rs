use std::sync::Arc;

use strata::{CmpOp, DbError, PageId, TupleDesc, Type};
use strata_exec::{
    collect, DeleteExecutor, ExecutionError, Executor, FilterExecutor, InsertExecutor,
    NestedLoopJoinExecutor, JoinPredicate, Predicate, SeqScanExecutor, TupleIterator,
};

mod common;

#[test]
fn test_insert_then_scan() {
    let test = common::setup(50);
    let t = common::create_int_table(&test, "t", &["a", "b"]);

    let tx1 = test.db.begin();
    common::insert_rows(&test, tx1.tid(), t, &[&[1, 2], &[3, 4]]);
    tx1.commit().unwrap();

    let tx2 = test.db.begin();
    assert_eq!(
        common::scan_ints(&test, tx2.tid(), t),
        vec![vec![1, 2], vec![3, 4]]
    );
    tx2.commit().unwrap();
}

#[test]
fn test_read_your_writes() {
    let test = common::setup(50);
    let t = common::create_int_table(&test, "t", &["a"]);
    common::seed(&test, t, &[&[1], &[2]]);

    let tx = test.db.begin();
    let before = common::scan_ints(&test, tx.tid(), t).len();
    let rows: Vec<Vec<i32>> = (0..1200).map(|i| vec![i]).collect();
    let refs: Vec<&[i32]> = rows.iter().map(|r| r.as_slice()).collect();
    common::insert_rows(&test, tx.tid(), t, &refs);
    let after = common::scan_ints(&test, tx.tid(), t).len();
    assert_eq!(after, before + 1200);

    // 1200 single-int tuples do not fit on one page.
    let file = test.db.catalog().file(t).unwrap();
    assert!(file.num_pages() >= 2);
    tx.commit().unwrap();
}

#[test]
fn test_insert_then_delete_restores_contents() {
    let test = common::setup(50);
    let t = common::create_int_table(&test, "t", &["a", "b"]);
    common::seed(&test, t, &[&[1, 1], &[2, 2]]);
    let tx = test.db.begin();
    let before = common::scan_ints(&test, tx.tid(), t);

    common::insert_rows(&test, tx.tid(), t, &[&[9, 9]]);
    let mut scan = SeqScanExecutor::new(&test.db, tx.tid(), t).unwrap();
    scan.open().unwrap();
    let inserted = collect(&mut scan)
        .unwrap()
        .into_iter()
        .find(|row| row.field(0).as_int() == Some(9))
        .unwrap();
    test.db
        .buffer_pool()
        .delete_tuple(tx.tid(), &inserted)
        .unwrap();

    assert_eq!(common::scan_ints(&test, tx.tid(), t), before);
    tx.commit().unwrap();
}

#[test]
fn test_insert_executor_copies_table() {
    let test = common::setup(50);
    let src = common::create_int_table(&test, "src", &["a", "b"]);
    let dst = common::create_int_table(&test, "dst", &["x", "y"]);
    common::seed(&test, src, &[&[1, 10], &[2, 20], &[3, 30]]);

    let tx = test.db.begin();
    let scan = SeqScanExecutor::with_alias(&test.db, tx.tid(), src, "s").unwrap();
    let mut insert = InsertExecutor::new(&test.db, tx.tid(), Box::new(scan), dst).unwrap();
    insert.open().unwrap();
    assert_eq!(common::ints(&[insert.next().unwrap()]), vec![vec![3]]);
    assert!(!insert.has_next().unwrap());
    insert.close();
    tx.commit().unwrap();

    let reader = test.db.begin();
    assert_eq!(
        common::scan_ints(&test, reader.tid(), dst),
        vec![vec![1, 10], vec![2, 20], vec![3, 30]]
    );
    reader.commit().unwrap();
}

#[test]
fn test_insert_executor_rejects_type_mismatch() {
    let test = common::setup(50);
    let t = common::create_int_table(&test, "t", &["a", "b"]);
    let tx = test.db.begin();
    let desc = Arc::new(TupleDesc::new(vec![Type::Int, Type::String], vec!["a", "b"]));
    let input = TupleIterator::new(desc, vec![]);
    let err = InsertExecutor::new(&test.db, tx.tid(), Box::new(input), t).err().unwrap();
    assert!(matches!(err, ExecutionError::Db(DbError::SchemaMismatch { .. })));
}

#[test]
fn test_delete_executor_with_filter() {
    let test = common::setup(50);
    let t = common::create_int_table(&test, "t", &["a", "b"]);
    common::seed(&test, t, &[&[1, 1], &[2, 2], &[3, 3], &[4, 4]]);

    let tx = test.db.begin();
    let scan = SeqScanExecutor::new(&test.db, tx.tid(), t).unwrap();
    let filter = FilterExecutor::new(Predicate::new(0, CmpOp::GreaterThanOrEq, 3), Box::new(scan))
        .unwrap();
    let mut delete = DeleteExecutor::new(&test.db, tx.tid(), Box::new(filter));
    delete.open().unwrap();
    assert_eq!(delete.next().unwrap().field(0).as_int(), Some(2));
    assert!(!delete.has_next().unwrap());
    delete.close();
    tx.commit().unwrap();

    let reader = test.db.begin();
    assert_eq!(
        common::scan_ints(&test, reader.tid(), t),
        vec![vec![1, 1], vec![2, 2]]
    );
    reader.commit().unwrap();
}

#[test]
fn test_join_over_scans() {
    let test = common::setup(50);
    let emp = common::create_int_table(&test, "emp", &["id", "dept"]);
    let dept = common::create_int_table(&test, "dept", &["id", "floor"]);
    common::seed(&test, emp, &[&[1, 10], &[2, 20], &[3, 10]]);
    common::seed(&test, dept, &[&[10, 1], &[20, 2]]);

    let tx = test.db.begin();
    let left = SeqScanExecutor::with_alias(&test.db, tx.tid(), emp, "e").unwrap();
    let right = SeqScanExecutor::with_alias(&test.db, tx.tid(), dept, "d").unwrap();
    let mut join = NestedLoopJoinExecutor::new(
        JoinPredicate::new(1, CmpOp::Equals, 0),
        Box::new(left),
        Box::new(right),
    )
    .unwrap();
    assert_eq!(
        join.tuple_desc().to_string(),
        "INT(e.id),INT(e.dept),INT(d.id),INT(d.floor)"
    );
    join.open().unwrap();
    assert_eq!(
        common::ints(&collect(&mut join).unwrap()),
        vec![vec![1, 10, 10, 1], vec![2, 20, 20, 2], vec![3, 10, 10, 1]]
    );
    tx.commit().unwrap();
}

#[test]
fn test_scan_takes_shared_locks() {
    let test = common::setup(50);
    let t = common::create_int_table(&test, "t", &["a"]);
    common::seed(&test, t, &[&[1]]);

    let tx = test.db.begin();
    common::scan_ints(&test, tx.tid(), t);
    let pid = PageId::new(t, 0);
    assert!(test.db.buffer_pool().holds_lock(tx.tid(), pid));
    let tid = tx.tid();
    tx.commit().unwrap();
    assert!(!test.db.buffer_pool().holds_lock(tid, pid));
}

#[test]
fn test_dropped_transaction_aborts() {
    let test = common::setup(50);
    let t = common::create_int_table(&test, "t", &["a"]);
    common::seed(&test, t, &[&[1]]);

    {
        let tx = test.db.begin();
        common::insert_rows(&test, tx.tid(), t, &[&[2]]);
    }

    let reader = test.db.begin();
    assert_eq!(common::scan_ints(&test, reader.tid(), t), vec![vec![1]]);
    reader.commit().unwrap();
}

#[test]
fn test_strings_round_trip_through_heap_file() {
    let test = common::setup(50);
    let desc = TupleDesc::new(vec![Type::Int, Type::String], vec!["id", "name"]);
    let t = test
        .db
        .create_table(test.path("people.dat"), "people", desc, Some("id"))
        .unwrap();
    let schema = test.db.catalog().tuple_desc(t).unwrap();

    let tx = test.db.begin();
    for (id, name) in [(1, "ada"), (2, "grace")] {
        let tuple = strata::Tuple::from_fields(
            schema.clone(),
            vec![strata::Field::Int(id), strata::Field::from(name)],
        )
        .unwrap();
        test.db.buffer_pool().insert_tuple(tx.tid(), t, tuple).unwrap();
    }
    tx.commit().unwrap();

    let reader = test.db.begin();
    let scan = SeqScanExecutor::new(&test.db, reader.tid(), t).unwrap();
    let mut filter = FilterExecutor::new(Predicate::new(1, CmpOp::Like, "rac"), Box::new(scan))
        .unwrap();
    filter.open().unwrap();
    let rows = collect(&mut filter).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].field(1).as_str(), Some("grace"));
    reader.commit().unwrap();
}
