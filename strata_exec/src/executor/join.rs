use std::sync::Arc;

use strata::{Tuple, TupleDesc};

use super::{BoxedExecutor, ExecState, Executor};
use crate::errors::Result;
use crate::predicate::JoinPredicate;

/// Nested-loops join. The right input is rewound each time the left advances;
/// output tuples are the left fields followed by the right fields.
pub struct NestedLoopJoinExecutor {
    state: ExecState,
    predicate: JoinPredicate,
    left: BoxedExecutor,
    right: BoxedExecutor,
    joined_schema: Arc<TupleDesc>,
    left_row: Option<Tuple>,
}

impl NestedLoopJoinExecutor {
    /// Fails when a join field is missing from its input.
    pub fn new(predicate: JoinPredicate, left: BoxedExecutor, right: BoxedExecutor) -> Result<Self> {
        predicate.check(left.tuple_desc(), right.tuple_desc())?;
        let joined_schema = Arc::new(TupleDesc::merge(left.tuple_desc(), right.tuple_desc()));
        Ok(Self {
            state: ExecState::default(),
            predicate,
            left,
            right,
            joined_schema,
            left_row: None,
        })
    }

    pub fn predicate(&self) -> &JoinPredicate {
        &self.predicate
    }

    /// Names of the two join columns, if the inputs name them.
    pub fn join_field_names(&self) -> (Option<&str>, Option<&str>) {
        (
            self.left.tuple_desc().field_name(self.predicate.field1()),
            self.right.tuple_desc().field_name(self.predicate.field2()),
        )
    }
}

impl Executor for NestedLoopJoinExecutor {
    fn state(&self) -> &ExecState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ExecState {
        &mut self.state
    }

    fn tuple_desc(&self) -> &Arc<TupleDesc> {
        &self.joined_schema
    }

    fn fetch_next(&mut self) -> Result<Option<Tuple>> {
        loop {
            if self.left_row.is_none() {
                if !self.left.has_next()? {
                    return Ok(None);
                }
                self.left_row = Some(self.left.next()?);
            }

            while self.right.has_next()? {
                let right_row = self.right.next()?;
                if let Some(left_row) = &self.left_row {
                    if self.predicate.filter(left_row, &right_row) {
                        let joined =
                            Tuple::merge(left_row, &right_row, Arc::clone(&self.joined_schema));
                        return Ok(Some(joined));
                    }
                }
            }

            self.left_row = None;
            self.right.rewind()?;
        }
    }

    fn on_open(&mut self) -> Result<()> {
        self.left.open()?;
        self.right.open()?;
        self.left_row = None;
        Ok(())
    }

    fn on_close(&mut self) {
        self.left.close();
        self.right.close();
        self.left_row = None;
    }

    fn on_rewind(&mut self) -> Result<()> {
        self.left.rewind()?;
        self.right.rewind()?;
        self.left_row = None;
        Ok(())
    }

    fn children(&self) -> Vec<&dyn Executor> {
        vec![self.left.as_ref(), self.right.as_ref()]
    }

    fn set_children(&mut self, children: Vec<BoxedExecutor>) -> Result<()> {
        let mut children = children.into_iter();
        if let (Some(left), Some(right)) = (children.next(), children.next()) {
            self.predicate.check(left.tuple_desc(), right.tuple_desc())?;
            self.joined_schema =
                Arc::new(TupleDesc::merge(left.tuple_desc(), right.tuple_desc()));
            self.left = left;
            self.right = right;
            self.left_row = None;
        }
        Ok(())
    }
}
