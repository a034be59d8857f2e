use std::sync::Arc;

use strata::{Database, HeapFileIterator, TdItem, Tuple, TupleDesc, TransactionId};

use super::{ExecState, Executor};
use crate::errors::Result;

/// Sequential scan of one table under a transaction. With an alias, output
/// fields are named `alias.field`.
pub struct SeqScanExecutor {
    state: ExecState,
    table_id: u32,
    alias: Option<String>,
    schema: Arc<TupleDesc>,
    aliased: bool,
    cursor: HeapFileIterator,
}

impl SeqScanExecutor {
    pub fn new(db: &Database, tid: TransactionId, table_id: u32) -> Result<Self> {
        Self::build(db, tid, table_id, None)
    }

    pub fn with_alias(db: &Database, tid: TransactionId, table_id: u32, alias: &str) -> Result<Self> {
        Self::build(db, tid, table_id, Some(alias.to_string()))
    }

    fn build(db: &Database, tid: TransactionId, table_id: u32, alias: Option<String>) -> Result<Self> {
        let file = db.catalog().file(table_id)?;
        let base = file.tuple_desc().clone();
        let schema = match &alias {
            Some(alias) => Arc::new(prefixed(&base, alias)),
            None => base,
        };
        let cursor = file.iter(Arc::clone(db.buffer_pool()), tid);
        Ok(Self {
            state: ExecState::default(),
            table_id,
            aliased: alias.is_some(),
            alias,
            schema,
            cursor,
        })
    }

    pub fn table_id(&self) -> u32 {
        self.table_id
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }
}

fn prefixed(desc: &TupleDesc, alias: &str) -> TupleDesc {
    TupleDesc::from_items(
        desc.items()
            .map(|item| TdItem {
                field_type: item.field_type,
                field_name: Some(format!(
                    "{}.{}",
                    alias,
                    item.field_name.as_deref().unwrap_or("null")
                )),
            })
            .collect(),
    )
}

impl Executor for SeqScanExecutor {
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
        match self.cursor.fetch_next()? {
            Some(tuple) if self.aliased => Ok(Some(tuple.rebind(Arc::clone(&self.schema))?)),
            other => Ok(other),
        }
    }

    fn on_open(&mut self) -> Result<()> {
        self.cursor.open();
        Ok(())
    }

    fn on_close(&mut self) {
        self.cursor.close();
    }

    fn on_rewind(&mut self) -> Result<()> {
        self.cursor.rewind();
        Ok(())
    }
}
