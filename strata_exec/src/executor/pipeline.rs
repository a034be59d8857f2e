use std::sync::Arc;

use strata::{Tuple, TupleDesc};

use super::{BoxedExecutor, ExecState, Executor};
use crate::errors::Result;
use crate::predicate::Predicate;

pub struct FilterExecutor {
    state: ExecState,
    predicate: Predicate,
    input: BoxedExecutor,
}

impl FilterExecutor {
    /// Fails when the predicate reads a field the input does not have.
    pub fn new(predicate: Predicate, input: BoxedExecutor) -> Result<Self> {
        predicate.check(input.tuple_desc())?;
        Ok(Self {
            state: ExecState::default(),
            predicate,
            input,
        })
    }

    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }
}

impl Executor for FilterExecutor {
    fn state(&self) -> &ExecState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ExecState {
        &mut self.state
    }

    fn tuple_desc(&self) -> &Arc<TupleDesc> {
        self.input.tuple_desc()
    }

    fn fetch_next(&mut self) -> Result<Option<Tuple>> {
        while self.input.has_next()? {
            let tuple = self.input.next()?;
            if self.predicate.filter(&tuple) {
                return Ok(Some(tuple));
            }
        }
        Ok(None)
    }

    fn on_open(&mut self) -> Result<()> {
        self.input.open()
    }

    fn on_close(&mut self) {
        self.input.close();
    }

    fn on_rewind(&mut self) -> Result<()> {
        self.input.rewind()
    }

    fn children(&self) -> Vec<&dyn Executor> {
        vec![self.input.as_ref()]
    }

    fn set_children(&mut self, children: Vec<BoxedExecutor>) -> Result<()> {
        if let Some(input) = children.into_iter().next() {
            self.predicate.check(input.tuple_desc())?;
            self.input = input;
        }
        Ok(())
    }
}

/// Replays a fixed list of tuples.
pub struct TupleIterator {
    state: ExecState,
    schema: Arc<TupleDesc>,
    tuples: Vec<Tuple>,
    cursor: usize,
}

impl TupleIterator {
    pub fn new(schema: Arc<TupleDesc>, tuples: Vec<Tuple>) -> Self {
        Self {
            state: ExecState::default(),
            schema,
            tuples,
            cursor: 0,
        }
    }
}

impl Executor for TupleIterator {
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
        let tuple = self.tuples.get(self.cursor).cloned();
        if tuple.is_some() {
            self.cursor += 1;
        }
        Ok(tuple)
    }

    fn on_open(&mut self) -> Result<()> {
        self.cursor = 0;
        Ok(())
    }

    fn on_close(&mut self) {}

    fn on_rewind(&mut self) -> Result<()> {
        self.cursor = 0;
        Ok(())
    }
}
