//! The pull-based operator protocol shared by every executor.
//!
//! An executor is `Closed` until [`Executor::open`], after which `has_next`,
//! `next` and `rewind` are legal until [`Executor::close`]. Implementations only
//! provide [`Executor::fetch_next`] plus the open/close/rewind hooks; the
//! look-ahead and state checks live in the provided methods.

use std::sync::Arc;

use strata::{Tuple, TupleDesc};

use crate::errors::{ExecutionError, Result};

pub mod aggregate;
pub mod dml;
pub mod join;
pub mod pipeline;
pub mod scan;

pub type BoxedExecutor = Box<dyn Executor>;

/// Per-executor protocol state.
#[derive(Debug, Default)]
pub struct ExecState {
    open: bool,
    lookahead: Option<Tuple>,
    exhausted: bool,
}

impl ExecState {
    pub fn is_open(&self) -> bool {
        self.open
    }

    fn reset(&mut self) {
        self.lookahead = None;
        self.exhausted = false;
    }
}

pub trait Executor: Send {
    fn state(&self) -> &ExecState;

    fn state_mut(&mut self) -> &mut ExecState;

    fn tuple_desc(&self) -> &Arc<TupleDesc>;

    /// Produces the next tuple, or `None` at end of stream.
    fn fetch_next(&mut self) -> Result<Option<Tuple>>;

    fn on_open(&mut self) -> Result<()>;

    fn on_close(&mut self);

    fn on_rewind(&mut self) -> Result<()>;

    fn children(&self) -> Vec<&dyn Executor> {
        Vec::new()
    }

    /// Replaces the inputs, in the order `children` reports them.
    fn set_children(&mut self, _children: Vec<BoxedExecutor>) -> Result<()> {
        Ok(())
    }

    fn open(&mut self) -> Result<()> {
        self.on_open()?;
        let state = self.state_mut();
        state.open = true;
        state.reset();
        Ok(())
    }

    fn close(&mut self) {
        self.on_close();
        let state = self.state_mut();
        state.open = false;
        state.reset();
    }

    fn rewind(&mut self) -> Result<()> {
        if !self.state().open {
            return Err(ExecutionError::NotOpen);
        }
        self.on_rewind()?;
        self.state_mut().reset();
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool> {
        if !self.state().open {
            return Err(ExecutionError::NotOpen);
        }
        if self.state().lookahead.is_none() && !self.state().exhausted {
            match self.fetch_next()? {
                Some(tuple) => self.state_mut().lookahead = Some(tuple),
                None => self.state_mut().exhausted = true,
            }
        }
        Ok(self.state().lookahead.is_some())
    }

    fn next(&mut self) -> Result<Tuple> {
        if !self.has_next()? {
            return Err(ExecutionError::NoSuchElement);
        }
        self.state_mut()
            .lookahead
            .take()
            .ok_or(ExecutionError::NoSuchElement)
    }
}

/// Fails unless `index` names a field of `desc`.
pub(crate) fn check_field(desc: &TupleDesc, index: usize) -> Result<()> {
    if index < desc.num_fields() {
        Ok(())
    } else {
        Err(ExecutionError::FieldOutOfRange {
            index,
            schema: desc.to_string(),
        })
    }
}

/// Drains an open executor into a vector.
pub fn collect(exec: &mut dyn Executor) -> Result<Vec<Tuple>> {
    let mut tuples = Vec::new();
    while exec.has_next()? {
        tuples.push(exec.next()?);
    }
    Ok(tuples)
}
