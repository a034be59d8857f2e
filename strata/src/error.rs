//! Error types surfaced by the storage engine.

use std::io;

use thiserror::Error;

use crate::lock_manager::LockError;
use crate::page::PageId;

pub type Result<T, E = DbError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("tuple descriptor mismatch: expected {expected}, found {found}")]
    SchemaMismatch { expected: String, found: String },
    #[error("no free slot on page {0}")]
    NoSpace(PageId),
    #[error("tuple is not on page {0}")]
    NotOnPage(PageId),
    #[error("buffer pool is full and every resident page is dirty or pinned")]
    NoEvictablePage,
    #[error("transaction aborted")]
    TransactionAborted,
    #[error("no such element: {0}")]
    NoSuchElement(String),
    #[error("catalog line {line}: {message}")]
    CatalogParse { line: usize, message: String },
    #[error("unknown table id {0}")]
    UnknownTable(u32),
}

impl From<LockError> for DbError {
    fn from(err: LockError) -> Self {
        match err {
            LockError::Deadlock => DbError::TransactionAborted,
        }
    }
}
