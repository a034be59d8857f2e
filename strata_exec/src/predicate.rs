//! Tuple predicates used by filters and joins.

use std::fmt;

use strata::{CmpOp, Field, Tuple, TupleDesc};

use crate::errors::Result;
use crate::executor::check_field;

/// Right-hand side of a filter comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Constant(Field),
    Column(usize),
}

/// `field op operand` over a single tuple.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    field: usize,
    op: CmpOp,
    operand: Operand,
}

impl Predicate {
    /// Compares field `field` against a constant.
    pub fn new(field: usize, op: CmpOp, constant: impl Into<Field>) -> Self {
        Self {
            field,
            op,
            operand: Operand::Constant(constant.into()),
        }
    }

    /// Compares two fields of the same tuple.
    pub fn columns(field: usize, op: CmpOp, other: usize) -> Self {
        Self {
            field,
            op,
            operand: Operand::Column(other),
        }
    }

    pub fn field(&self) -> usize {
        self.field
    }

    pub fn op(&self) -> CmpOp {
        self.op
    }

    pub fn operand(&self) -> &Operand {
        &self.operand
    }

    /// Checks that every field the predicate reads exists in `desc`.
    pub fn check(&self, desc: &TupleDesc) -> Result<()> {
        check_field(desc, self.field)?;
        if let Operand::Column(i) = self.operand {
            check_field(desc, i)?;
        }
        Ok(())
    }

    pub fn filter(&self, tuple: &Tuple) -> bool {
        let rhs = match &self.operand {
            Operand::Constant(field) => field,
            Operand::Column(i) => tuple.field(*i),
        };
        tuple.field(self.field).compare(self.op, rhs)
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.operand {
            Operand::Constant(c) => write!(f, "f{} {} {}", self.field, self.op, c),
            Operand::Column(i) => write!(f, "f{} {} f{}", self.field, self.op, i),
        }
    }
}

/// `left.field1 op right.field2` over a pair of tuples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JoinPredicate {
    field1: usize,
    op: CmpOp,
    field2: usize,
}

impl JoinPredicate {
    pub fn new(field1: usize, op: CmpOp, field2: usize) -> Self {
        Self { field1, op, field2 }
    }

    pub fn field1(&self) -> usize {
        self.field1
    }

    pub fn field2(&self) -> usize {
        self.field2
    }

    pub fn op(&self) -> CmpOp {
        self.op
    }

    pub fn check(&self, left: &TupleDesc, right: &TupleDesc) -> Result<()> {
        check_field(left, self.field1)?;
        check_field(right, self.field2)
    }

    pub fn filter(&self, left: &Tuple, right: &Tuple) -> bool {
        left.field(self.field1).compare(self.op, right.field(self.field2))
    }
}
