//! Page-granularity shared/exclusive locks with wait-for-graph deadlock detection.
//!
//! Lock holders, the inverse `tid -> pages` map and the wait-for graph all live
//! under one mutex, so an observer never sees one updated without the others.
//! Blocked requests sleep on a condition variable that is signalled on every
//! release, re-examining their conflict at least once per retry interval.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use thiserror::Error;

use crate::config::DEFAULT_LOCK_RETRY;
use crate::digraph::Digraph;
use crate::page::PageId;
use crate::strata_debug_log;
use crate::transaction::TransactionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LockMode {
    Shared,
    Exclusive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LockError {
    #[error("deadlock detected")]
    Deadlock,
}

#[derive(Debug, Default)]
struct PageLocks {
    sharing: HashSet<TransactionId>,
    exclusive: Option<TransactionId>,
}

impl PageLocks {
    /// Holders whose locks keep `tx_id` from acquiring `mode`.
    fn conflicting_holders(&self, tx_id: TransactionId, mode: LockMode) -> Vec<TransactionId> {
        let mut holders = Vec::new();
        if let Some(ex_holder) = self.exclusive {
            if ex_holder != tx_id {
                holders.push(ex_holder);
            }
        }
        if mode == LockMode::Exclusive {
            holders.extend(self.sharing.iter().copied().filter(|h| *h != tx_id));
        }
        holders
    }

    fn mode_of(&self, tx_id: TransactionId) -> Option<LockMode> {
        if self.exclusive == Some(tx_id) {
            Some(LockMode::Exclusive)
        } else if self.sharing.contains(&tx_id) {
            Some(LockMode::Shared)
        } else {
            None
        }
    }

    fn grant(&mut self, tx_id: TransactionId, mode: LockMode) {
        match mode {
            LockMode::Shared => {
                if self.exclusive != Some(tx_id) {
                    self.sharing.insert(tx_id);
                }
            }
            LockMode::Exclusive => {
                // Upgrade in place: the shared entry is replaced.
                self.sharing.remove(&tx_id);
                self.exclusive = Some(tx_id);
            }
        }
    }

    fn remove(&mut self, tx_id: TransactionId) -> bool {
        let was_exclusive = self.exclusive == Some(tx_id);
        if was_exclusive {
            self.exclusive = None;
        }
        self.sharing.remove(&tx_id) || was_exclusive
    }

    fn is_empty(&self) -> bool {
        self.exclusive.is_none() && self.sharing.is_empty()
    }
}

#[derive(Debug, Default)]
struct LockTable {
    locks: HashMap<PageId, PageLocks>,
    held: HashMap<TransactionId, HashSet<PageId>>,
    waits_for: Digraph<TransactionId>,
}

impl LockTable {
    fn release(&mut self, tx_id: TransactionId, pid: PageId) -> bool {
        let removed = match self.locks.get_mut(&pid) {
            Some(page_locks) => {
                let removed = page_locks.remove(tx_id);
                if page_locks.is_empty() {
                    self.locks.remove(&pid);
                }
                removed
            }
            None => false,
        };
        if let Some(pages) = self.held.get_mut(&tx_id) {
            pages.remove(&pid);
            if pages.is_empty() {
                self.held.remove(&tx_id);
            }
        }
        removed
    }
}

#[derive(Debug)]
pub struct LockManager {
    table: Mutex<LockTable>,
    released: Condvar,
    retry_interval: Duration,
}

impl Default for LockManager {
    fn default() -> Self {
        Self::new(DEFAULT_LOCK_RETRY)
    }
}

impl LockManager {
    pub fn new(retry_interval: Duration) -> Self {
        Self {
            table: Mutex::new(LockTable::default()),
            released: Condvar::new(),
            retry_interval,
        }
    }

    /// Blocks until `tx_id` holds at least `mode` on `pid`.
    ///
    /// Fails with [`LockError::Deadlock`] when waiting would close a cycle in the
    /// wait-for graph; the caller is the victim and should abort.
    pub fn lock(&self, tx_id: TransactionId, pid: PageId, mode: LockMode) -> Result<(), LockError> {
        let mut table = self.table.lock();
        loop {
            let holders = table
                .locks
                .get(&pid)
                .map(|page_locks| page_locks.conflicting_holders(tx_id, mode))
                .unwrap_or_default();

            if holders.is_empty() {
                table.locks.entry(pid).or_default().grant(tx_id, mode);
                table.held.entry(tx_id).or_default().insert(pid);
                table.waits_for.remove_outgoing(tx_id);
                return Ok(());
            }

            // Wait edges always reflect the current blockers of this request.
            table.waits_for.remove_outgoing(tx_id);
            for holder in &holders {
                table.waits_for.add_edge(tx_id, *holder);
            }
            if table.waits_for.has_cycle_from(tx_id) {
                table.waits_for.remove_outgoing(tx_id);
                strata_debug_log!(
                    "[LockManager::lock] deadlock: {} waiting for {:?} on {}, aborting",
                    tx_id,
                    holders,
                    pid
                );
                return Err(LockError::Deadlock);
            }

            strata_debug_log!(
                "[LockManager::lock] {} waits for {:?} on {} ({:?})",
                tx_id,
                holders,
                pid,
                mode
            );
            self.released.wait_for(&mut table, self.retry_interval);
        }
    }

    /// Releases one page. Breaks two-phase locking if used before commit/abort.
    pub fn unlock(&self, tx_id: TransactionId, pid: PageId) {
        let mut table = self.table.lock();
        table.release(tx_id, pid);
        table.waits_for.remove_outgoing(tx_id);
        drop(table);
        self.released.notify_all();
    }

    /// Releases every lock `tx_id` holds and removes it from the wait-for graph.
    pub fn unlock_all(&self, tx_id: TransactionId) {
        let mut table = self.table.lock();
        let pages = table.held.remove(&tx_id).unwrap_or_default();
        for pid in &pages {
            table.release(tx_id, *pid);
        }
        table.waits_for.remove_vertex(tx_id);
        drop(table);
        strata_debug_log!(
            "[LockManager::unlock_all] {} released {} pages",
            tx_id,
            pages.len()
        );
        self.released.notify_all();
    }

    pub fn lock_mode(&self, tx_id: TransactionId, pid: PageId) -> Option<LockMode> {
        self.table
            .lock()
            .locks
            .get(&pid)
            .and_then(|page_locks| page_locks.mode_of(tx_id))
    }

    pub fn holds_lock(&self, tx_id: TransactionId, pid: PageId) -> bool {
        self.lock_mode(tx_id, pid).is_some()
    }

    /// Current holders of `pid`, sorted by transaction id.
    pub fn holders(&self, pid: PageId) -> Vec<(TransactionId, LockMode)> {
        let table = self.table.lock();
        let mut holders: Vec<_> = match table.locks.get(&pid) {
            Some(page_locks) => page_locks
                .sharing
                .iter()
                .map(|t| (*t, LockMode::Shared))
                .chain(page_locks.exclusive.map(|t| (t, LockMode::Exclusive)))
                .collect(),
            None => Vec::new(),
        };
        holders.sort();
        holders
    }

    pub fn pages_held(&self, tx_id: TransactionId) -> Vec<PageId> {
        let table = self.table.lock();
        let mut pages: Vec<_> = table
            .held
            .get(&tx_id)
            .map(|pages| pages.iter().copied().collect())
            .unwrap_or_default();
        pages.sort();
        pages
    }

    /// Snapshot of the wait-for edges `(waiter, holder)`.
    pub fn wait_edges(&self) -> Vec<(TransactionId, TransactionId)> {
        let mut edges: Vec<_> = self.table.lock().waits_for.edges().collect();
        edges.sort();
        edges
    }

    pub fn has_wait_cycle(&self) -> bool {
        self.table.lock().waits_for.has_cycle()
    }
}
