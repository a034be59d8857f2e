//! Transaction identity and lifetime.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::buffer_pool::BufferPool;
use crate::error::Result;
use crate::strata_debug_log;

static NEXT_TRANSACTION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique, monotonically assigned transaction identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId(u64);

impl TransactionId {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(NEXT_TRANSACTION_ID.fetch_add(1, Ordering::SeqCst))
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tx{}", self.0)
    }
}

/// A running transaction. Dropping it without calling [`commit`](Self::commit)
/// aborts it.
pub struct Transaction {
    tid: TransactionId,
    pool: Arc<BufferPool>,
    completed: bool,
}

impl Transaction {
    pub fn begin(pool: Arc<BufferPool>) -> Self {
        let tid = TransactionId::new();
        strata_debug_log!("[Transaction::begin] {}", tid);
        Self {
            tid,
            pool,
            completed: false,
        }
    }

    pub fn tid(&self) -> TransactionId {
        self.tid
    }

    /// Forces every page this transaction dirtied to disk and releases its locks.
    pub fn commit(mut self) -> Result<()> {
        self.completed = true;
        self.pool.transaction_complete(self.tid, true)
    }

    /// Discards this transaction's cached pages and releases its locks.
    pub fn abort(mut self) -> Result<()> {
        self.completed = true;
        self.pool.transaction_complete(self.tid, false)
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if !self.completed {
            if let Err(e) = self.pool.transaction_complete(self.tid, false) {
                strata_debug_log!("[Transaction::drop] abort of {} failed: {}", self.tid, e);
            }
        }
    }
}
