//! Group-by state machines for MIN, MAX, SUM, AVG and COUNT.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use strata::{DbError, Field, Tuple, TupleDesc, Type};

use crate::errors::{ExecutionError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateOp {
    Min,
    Max,
    Sum,
    Avg,
    Count,
}

impl fmt::Display for AggregateOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AggregateOp::Min => "min",
            AggregateOp::Max => "max",
            AggregateOp::Sum => "sum",
            AggregateOp::Avg => "avg",
            AggregateOp::Count => "count",
        };
        write!(f, "{}", s)
    }
}

/// `(INT)` without grouping, `(group type, INT)` with it.
fn result_schema(group: Option<(usize, Type)>) -> Arc<TupleDesc> {
    let types = match group {
        Some((_, group_type)) => vec![group_type, Type::Int],
        None => vec![Type::Int],
    };
    Arc::new(TupleDesc::from_types(types))
}

fn group_key(group: Option<(usize, Type)>, tuple: &Tuple) -> Option<Field> {
    group.map(|(i, _)| tuple.field(i).clone())
}

fn result_tuple(schema: &Arc<TupleDesc>, key: &Option<Field>, value: i32) -> Result<Tuple> {
    let mut fields: Vec<Field> = key.iter().cloned().collect();
    fields.push(Field::Int(value));
    Ok(Tuple::from_fields(Arc::clone(schema), fields)?)
}

fn expect_int(tuple: &Tuple, i: usize) -> Result<i32> {
    tuple.field(i).as_int().ok_or_else(|| {
        DbError::SchemaMismatch {
            expected: "INT aggregate field".to_string(),
            found: tuple.tuple_desc().to_string(),
        }
        .into()
    })
}

#[derive(Debug, Clone, Copy)]
enum Running {
    Value(i32),
    Count(i32),
    Avg { sum: i64, count: i64 },
}

impl Running {
    fn start(op: AggregateOp, v: i32) -> Self {
        match op {
            AggregateOp::Min | AggregateOp::Max | AggregateOp::Sum => Running::Value(v),
            AggregateOp::Count => Running::Count(1),
            AggregateOp::Avg => Running::Avg {
                sum: v as i64,
                count: 1,
            },
        }
    }

    fn merge(&mut self, op: AggregateOp, v: i32) {
        match (self, op) {
            (Running::Value(cur), AggregateOp::Min) => *cur = (*cur).min(v),
            (Running::Value(cur), AggregateOp::Max) => *cur = (*cur).max(v),
            (Running::Value(cur), _) => *cur = cur.wrapping_add(v),
            (Running::Count(n), _) => *n += 1,
            (Running::Avg { sum, count }, _) => {
                *sum += v as i64;
                *count += 1;
            }
        }
    }

    fn value(&self) -> i32 {
        match *self {
            Running::Value(v) | Running::Count(v) => v,
            // Integer division truncates toward zero.
            Running::Avg { sum, count } => (sum / count) as i32,
        }
    }
}

/// Aggregates an INT field.
#[derive(Debug)]
pub struct IntegerAggregator {
    group: Option<(usize, Type)>,
    agg_field: usize,
    op: AggregateOp,
    schema: Arc<TupleDesc>,
    groups: BTreeMap<Option<Field>, Running>,
}

impl IntegerAggregator {
    /// `group` is the group-by field index and type, or `None` for no grouping.
    pub fn new(group: Option<(usize, Type)>, agg_field: usize, op: AggregateOp) -> Self {
        Self {
            group,
            agg_field,
            op,
            schema: result_schema(group),
            groups: BTreeMap::new(),
        }
    }

    pub fn merge_tuple(&mut self, tuple: &Tuple) -> Result<()> {
        let v = expect_int(tuple, self.agg_field)?;
        let op = self.op;
        self.groups
            .entry(group_key(self.group, tuple))
            .and_modify(|running| running.merge(op, v))
            .or_insert_with(|| Running::start(op, v));
        Ok(())
    }

    /// One tuple per group, in ascending group order.
    pub fn results(&self) -> Result<Vec<Tuple>> {
        self.groups
            .iter()
            .map(|(key, running)| result_tuple(&self.schema, key, running.value()))
            .collect()
    }
}

/// Aggregates a STRING field; only COUNT is meaningful.
#[derive(Debug)]
pub struct StringAggregator {
    group: Option<(usize, Type)>,
    schema: Arc<TupleDesc>,
    counts: BTreeMap<Option<Field>, i32>,
}

impl StringAggregator {
    pub fn new(group: Option<(usize, Type)>, _agg_field: usize, op: AggregateOp) -> Result<Self> {
        if op != AggregateOp::Count {
            return Err(ExecutionError::InvalidAggregator(format!(
                "{} is not supported on STRING fields",
                op
            )));
        }
        Ok(Self {
            group,
            schema: result_schema(group),
            counts: BTreeMap::new(),
        })
    }

    pub fn merge_tuple(&mut self, tuple: &Tuple) -> Result<()> {
        *self.counts.entry(group_key(self.group, tuple)).or_insert(0) += 1;
        Ok(())
    }

    pub fn results(&self) -> Result<Vec<Tuple>> {
        self.counts
            .iter()
            .map(|(key, count)| result_tuple(&self.schema, key, *count))
            .collect()
    }
}

/// Aggregator chosen by the type of the aggregated field.
#[derive(Debug)]
pub enum Aggregator {
    Int(IntegerAggregator),
    Str(StringAggregator),
}

impl Aggregator {
    pub fn new(
        group: Option<(usize, Type)>,
        agg_field: usize,
        agg_type: Type,
        op: AggregateOp,
    ) -> Result<Self> {
        match agg_type {
            Type::Int => Ok(Aggregator::Int(IntegerAggregator::new(group, agg_field, op))),
            Type::String => Ok(Aggregator::Str(StringAggregator::new(group, agg_field, op)?)),
        }
    }

    pub fn merge_tuple(&mut self, tuple: &Tuple) -> Result<()> {
        match self {
            Aggregator::Int(agg) => agg.merge_tuple(tuple),
            Aggregator::Str(agg) => agg.merge_tuple(tuple),
        }
    }

    pub fn results(&self) -> Result<Vec<Tuple>> {
        match self {
            Aggregator::Int(agg) => agg.results(),
            Aggregator::Str(agg) => agg.results(),
        }
    }

    pub fn schema(&self) -> &Arc<TupleDesc> {
        match self {
            Aggregator::Int(agg) => &agg.schema,
            Aggregator::Str(agg) => &agg.schema,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(values: &[(i32, i32)]) -> Vec<Tuple> {
        let desc = Arc::new(TupleDesc::from_types(vec![Type::Int, Type::Int]));
        values
            .iter()
            .map(|(g, v)| Tuple::from_fields(desc.clone(), vec![Field::Int(*g), Field::Int(*v)]).unwrap())
            .collect()
    }

    fn run(op: AggregateOp, group: bool, values: &[(i32, i32)]) -> Vec<Vec<i32>> {
        let group = group.then_some((0, Type::Int));
        let mut agg = IntegerAggregator::new(group, 1, op);
        for t in pairs(values) {
            agg.merge_tuple(&t).unwrap();
        }
        agg.results()
            .unwrap()
            .iter()
            .map(|t| t.fields().iter().filter_map(Field::as_int).collect())
            .collect()
    }

    #[test]
    fn grouped_ops() {
        let data = [(1, 10), (1, 20), (2, 5), (2, 7)];
        assert_eq!(run(AggregateOp::Avg, true, &data), vec![vec![1, 15], vec![2, 6]]);
        assert_eq!(run(AggregateOp::Sum, true, &data), vec![vec![1, 30], vec![2, 12]]);
        assert_eq!(run(AggregateOp::Min, true, &data), vec![vec![1, 10], vec![2, 5]]);
        assert_eq!(run(AggregateOp::Max, true, &data), vec![vec![1, 20], vec![2, 7]]);
        assert_eq!(run(AggregateOp::Count, true, &data), vec![vec![1, 2], vec![2, 2]]);
    }

    #[test]
    fn ungrouped_ops() {
        let data = [(0, 3), (0, -8), (0, 4)];
        assert_eq!(run(AggregateOp::Sum, false, &data), vec![vec![-1]]);
        assert_eq!(run(AggregateOp::Count, false, &data), vec![vec![3]]);
        assert_eq!(run(AggregateOp::Min, false, &data), vec![vec![-8]]);
        assert!(run(AggregateOp::Count, false, &[]).is_empty());
    }

    #[test]
    fn average_truncates_toward_zero() {
        assert_eq!(run(AggregateOp::Avg, false, &[(0, -3), (0, -4)]), vec![vec![-3]]);
        assert_eq!(run(AggregateOp::Avg, false, &[(0, 3), (0, 4)]), vec![vec![3]]);
    }

    #[test]
    fn average_does_not_overflow() {
        let data = [(0, i32::MAX), (0, i32::MAX)];
        assert_eq!(run(AggregateOp::Avg, false, &data), vec![vec![i32::MAX]]);
    }

    #[test]
    fn string_fields_only_count() {
        assert!(matches!(
            StringAggregator::new(None, 0, AggregateOp::Max),
            Err(ExecutionError::InvalidAggregator(_))
        ));
        assert!(matches!(
            Aggregator::new(None, 0, Type::String, AggregateOp::Sum),
            Err(ExecutionError::InvalidAggregator(_))
        ));

        let desc = Arc::new(TupleDesc::from_types(vec![Type::Int, Type::String]));
        let mut agg = StringAggregator::new(Some((0, Type::Int)), 1, AggregateOp::Count).unwrap();
        for (g, s) in [(1, "a"), (2, "b"), (1, "c")] {
            let t = Tuple::from_fields(desc.clone(), vec![Field::Int(g), Field::from(s)]).unwrap();
            agg.merge_tuple(&t).unwrap();
        }
        let out: Vec<_> = agg
            .results()
            .unwrap()
            .iter()
            .map(|t| t.fields().to_vec())
            .collect();
        assert_eq!(
            out,
            vec![
                vec![Field::Int(1), Field::Int(2)],
                vec![Field::Int(2), Field::Int(1)],
            ]
        );
    }
}
