use std::sync::Arc;

use strata::{TdItem, Tuple, TupleDesc, Type};

use super::pipeline::TupleIterator;
use super::{check_field, BoxedExecutor, ExecState, Executor};
use crate::aggregator::{AggregateOp, Aggregator};
use crate::errors::Result;

/// Single-column aggregate with optional grouping. The input is drained once
/// at construction; open and rewind replay the materialized groups.
pub struct AggregateExecutor {
    state: ExecState,
    input: BoxedExecutor,
    agg_field: usize,
    group_field: Option<usize>,
    op: AggregateOp,
    schema: Arc<TupleDesc>,
    results: TupleIterator,
}

impl AggregateExecutor {
    pub fn new(
        input: BoxedExecutor,
        agg_field: usize,
        group_field: Option<usize>,
        op: AggregateOp,
    ) -> Result<Self> {
        check_fields(input.tuple_desc(), agg_field, group_field)?;
        let mut exec = Self {
            state: ExecState::default(),
            schema: output_schema(input.tuple_desc(), agg_field, group_field, op),
            results: TupleIterator::new(Arc::new(TupleDesc::from_types(vec![])), vec![]),
            input,
            agg_field,
            group_field,
            op,
        };
        exec.aggregate()?;
        Ok(exec)
    }

    fn aggregate(&mut self) -> Result<()> {
        let input_schema = Arc::clone(self.input.tuple_desc());
        let group = self
            .group_field
            .map(|g| (g, input_schema.field_type(g)));
        let mut aggregator = Aggregator::new(
            group,
            self.agg_field,
            input_schema.field_type(self.agg_field),
            self.op,
        )?;

        self.input.open()?;
        while self.input.has_next()? {
            aggregator.merge_tuple(&self.input.next()?)?;
        }
        self.input.close();

        let tuples = aggregator
            .results()?
            .into_iter()
            .map(|t| t.rebind(Arc::clone(&self.schema)))
            .collect::<strata::Result<Vec<_>>>()?;
        self.results = TupleIterator::new(Arc::clone(&self.schema), tuples);
        Ok(())
    }

    pub fn group_field(&self) -> Option<usize> {
        self.group_field
    }

    pub fn group_field_name(&self) -> Option<&str> {
        self.group_field
            .and_then(|g| self.input.tuple_desc().field_name(g))
    }

    pub fn aggregate_field(&self) -> usize {
        self.agg_field
    }

    pub fn aggregate_field_name(&self) -> Option<&str> {
        self.input.tuple_desc().field_name(self.agg_field)
    }

    pub fn aggregate_op(&self) -> AggregateOp {
        self.op
    }
}

fn check_fields(input: &TupleDesc, agg_field: usize, group_field: Option<usize>) -> Result<()> {
    check_field(input, agg_field)?;
    if let Some(g) = group_field {
        check_field(input, g)?;
    }
    Ok(())
}

/// Group column keeps its input name; the aggregate column is named `op(field)`.
fn output_schema(
    input: &TupleDesc,
    agg_field: usize,
    group_field: Option<usize>,
    op: AggregateOp,
) -> Arc<TupleDesc> {
    let mut items = Vec::with_capacity(2);
    if let Some(g) = group_field {
        items.push(TdItem {
            field_type: input.field_type(g),
            field_name: input.field_name(g).map(str::to_string),
        });
    }
    items.push(TdItem {
        field_type: Type::Int,
        field_name: Some(format!(
            "{}({})",
            op,
            input.field_name(agg_field).unwrap_or("null")
        )),
    });
    Arc::new(TupleDesc::from_items(items))
}

impl Executor for AggregateExecutor {
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
        self.results.fetch_next()
    }

    fn on_open(&mut self) -> Result<()> {
        self.results.open()
    }

    fn on_close(&mut self) {
        self.results.close();
    }

    fn on_rewind(&mut self) -> Result<()> {
        self.results.rewind()
    }

    fn children(&self) -> Vec<&dyn Executor> {
        vec![self.input.as_ref()]
    }

    /// Replaces the input and recomputes the groups from it.
    fn set_children(&mut self, children: Vec<BoxedExecutor>) -> Result<()> {
        if let Some(input) = children.into_iter().next() {
            check_fields(input.tuple_desc(), self.agg_field, self.group_field)?;
            self.schema = output_schema(input.tuple_desc(), self.agg_field, self.group_field, self.op);
            self.input = input;
            self.aggregate()?;
        }
        Ok(())
    }
}
