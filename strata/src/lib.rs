pub mod buffer_pool;

pub mod catalog;

pub mod config;

pub mod database;

pub mod digraph;

pub mod error;

pub mod heap_file;

pub mod lock_manager;

pub mod page;

pub mod pager;

pub mod parser;

pub mod replacer;

pub mod transaction;

pub mod tuple;

pub const PAGE_SIZE: usize = 4096;

pub use buffer_pool::{BufferPool, PageHandle, Permission};
pub use catalog::Catalog;
pub use config::DatabaseConfig;
pub use database::Database;
pub use error::{DbError, Result};
pub use heap_file::{HeapFile, HeapFileIterator};
pub use lock_manager::{LockError, LockManager, LockMode};
pub use page::{HeapPage, PageId};
pub use transaction::{Transaction, TransactionId};
pub use tuple::{CmpOp, Field, RecordId, TdItem, Tuple, TupleDesc, Type};

pub fn debug_logs_enabled() -> bool {
    std::env::var_os("STRATA_DEBUG_LOG").is_some()
}

#[macro_export]
macro_rules! strata_debug_log {
    ($($arg:tt)*) => {
        if $crate::debug_logs_enabled() {
            println!($($arg)*);
        }
    };
}
