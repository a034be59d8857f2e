use std::sync::Arc;

use strata::{BufferPool, Database, DbError, Field, TransactionId, Tuple, TupleDesc, Type};
use strata::strata_debug_log;

use super::{BoxedExecutor, ExecState, Executor};
use crate::errors::{ExecutionError, Result};

fn count_schema() -> Arc<TupleDesc> {
    Arc::new(TupleDesc::new(vec![Type::Int], vec!["count"]))
}

fn count_tuple(schema: &Arc<TupleDesc>, count: usize) -> Result<Tuple> {
    let count = i32::try_from(count).map_err(|_| ExecutionError::CountOverflow(count))?;
    Ok(Tuple::from_fields(
        Arc::clone(schema),
        vec![Field::Int(count)],
    )?)
}

/// Inserts every tuple of its input into a table when opened, then yields a
/// single `(count)` tuple.
pub struct InsertExecutor {
    state: ExecState,
    tid: TransactionId,
    pool: Arc<BufferPool>,
    table_id: u32,
    table_schema: Arc<TupleDesc>,
    input: BoxedExecutor,
    schema: Arc<TupleDesc>,
    pending: Option<usize>,
}

impl InsertExecutor {
    /// Fails with a schema mismatch when the input's field types differ from the table's.
    pub fn new(db: &Database, tid: TransactionId, input: BoxedExecutor, table_id: u32) -> Result<Self> {
        let table_schema = db.catalog().tuple_desc(table_id)?;
        check_types(&table_schema, input.tuple_desc())?;
        Ok(Self {
            state: ExecState::default(),
            tid,
            pool: Arc::clone(db.buffer_pool()),
            table_id,
            table_schema,
            input,
            schema: count_schema(),
            pending: None,
        })
    }

    fn insert_all(&mut self) -> Result<()> {
        let mut count = 0;
        while self.input.has_next()? {
            let tuple = self.input.next()?.rebind(Arc::clone(&self.table_schema))?;
            self.pool.insert_tuple(self.tid, self.table_id, tuple)?;
            count += 1;
        }
        strata_debug_log!(
            "[InsertExecutor] {} inserted {} tuples into {}",
            self.tid,
            count,
            self.table_id
        );
        self.pending = Some(count);
        Ok(())
    }
}

fn check_types(table: &TupleDesc, input: &TupleDesc) -> Result<()> {
    if table.same_types(input) {
        Ok(())
    } else {
        Err(DbError::SchemaMismatch {
            expected: table.to_string(),
            found: input.to_string(),
        }
        .into())
    }
}

impl Executor for InsertExecutor {
    fn state(&self) -> &ExecState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ExecState {
        &mut self.state
    }

    fn tuple_desc(&self) -> &Arc<TupleDesc> {
        &self.schema
    }

    fn fetch_next(&mut self) -> Result<Option<Tuple>> {
        match self.pending.take() {
            Some(count) => Ok(Some(count_tuple(&self.schema, count)?)),
            None => Ok(None),
        }
    }

    fn on_open(&mut self) -> Result<()> {
        self.input.open()?;
        self.insert_all()
    }

    fn on_close(&mut self) {
        self.input.close();
        self.pending = None;
    }

    /// Re-runs the insert over the rewound input.
    fn on_rewind(&mut self) -> Result<()> {
        self.input.rewind()?;
        self.insert_all()
    }

    fn children(&self) -> Vec<&dyn Executor> {
        vec![self.input.as_ref()]
    }

    fn set_children(&mut self, children: Vec<BoxedExecutor>) -> Result<()> {
        if let Some(input) = children.into_iter().next() {
            check_types(&self.table_schema, input.tuple_desc())?;
            self.input = input;
        }
        Ok(())
    }
}

/// Deletes every tuple its input produces when opened, then yields a single
/// `(count)` tuple. Input tuples must carry record ids, e.g. from a scan.
pub struct DeleteExecutor {
    state: ExecState,
    tid: TransactionId,
    pool: Arc<BufferPool>,
    input: BoxedExecutor,
    schema: Arc<TupleDesc>,
    pending: Option<usize>,
}

impl DeleteExecutor {
    pub fn new(db: &Database, tid: TransactionId, input: BoxedExecutor) -> Self {
        Self {
            state: ExecState::default(),
            tid,
            pool: Arc::clone(db.buffer_pool()),
            input,
            schema: count_schema(),
            pending: None,
        }
    }

    fn delete_all(&mut self) -> Result<()> {
        let mut count = 0;
        while self.input.has_next()? {
            let tuple = self.input.next()?;
            self.pool.delete_tuple(self.tid, &tuple)?;
            count += 1;
        }
        strata_debug_log!("[DeleteExecutor] {} deleted {} tuples", self.tid, count);
        self.pending = Some(count);
        Ok(())
    }
}

impl Executor for DeleteExecutor {
    fn state(&self) -> &ExecState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ExecState {
        &mut self.state
    }

    fn tuple_desc(&self) -> &Arc<TupleDesc> {
        &self.schema
    }

    fn fetch_next(&mut self) -> Result<Option<Tuple>> {
        match self.pending.take() {
            Some(count) => Ok(Some(count_tuple(&self.schema, count)?)),
            None => Ok(None),
        }
    }

    fn on_open(&mut self) -> Result<()> {
        self.input.open()?;
        self.delete_all()
    }

    fn on_close(&mut self) {
        self.input.close();
        self.pending = None;
    }

    fn on_rewind(&mut self) -> Result<()> {
        self.input.rewind()?;
        self.delete_all()
    }

    fn children(&self) -> Vec<&dyn Executor> {
        vec![self.input.as_ref()]
    }

    fn set_children(&mut self, children: Vec<BoxedExecutor>) -> Result<()> {
        if let Some(input) = children.into_iter().next() {
            self.input = input;
        }
        Ok(())
    }
}
