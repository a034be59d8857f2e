use strata::lock_manager::LockError;
use strata::DbError;
use thiserror::Error;

pub type Result<T, E = ExecutionError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("invalid aggregator: {0}")]
    InvalidAggregator(String),
    #[error("operator is not open")]
    NotOpen,
    #[error("no more tuples")]
    NoSuchElement,
    #[error("field {index} is out of range for {schema}")]
    FieldOutOfRange { index: usize, schema: String },
    #[error("count {0} does not fit in an INT field")]
    CountOverflow(usize),
}

impl From<LockError> for ExecutionError {
    fn from(err: LockError) -> Self {
        ExecutionError::Db(err.into())
    }
}

impl ExecutionError {
    /// True when the transaction lost a deadlock and must be aborted.
    pub fn is_aborted(&self) -> bool {
        matches!(self, ExecutionError::Db(DbError::TransactionAborted))
    }
}
