pub mod aggregator;
pub mod errors;
pub mod executor;
pub mod predicate;

pub use aggregator::{AggregateOp, Aggregator, IntegerAggregator, StringAggregator};
pub use errors::{ExecutionError, Result};
pub use executor::aggregate::AggregateExecutor;
pub use executor::dml::{DeleteExecutor, InsertExecutor};
pub use executor::join::NestedLoopJoinExecutor;
pub use executor::pipeline::{FilterExecutor, TupleIterator};
pub use executor::scan::SeqScanExecutor;
pub use executor::{collect, BoxedExecutor, ExecState, Executor};
pub use predicate::{JoinPredicate, Operand, Predicate};
