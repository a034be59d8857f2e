//! The buffer pool: a bounded page cache that mediates every page access.
//!
//! Pages enter only through [`BufferPool::get_page`], which takes the page lock
//! first. The pool follows NO-STEAL/FORCE: dirty pages stay resident until their
//! transaction commits (and they are written) or aborts (and they are dropped).

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::catalog::Catalog;
use crate::config::DatabaseConfig;
use crate::error::{DbError, Result};
use crate::lock_manager::{LockManager, LockMode};
use crate::page::{HeapPage, PageId};
use crate::replacer::LruReplacer;
use crate::strata_debug_log;
use crate::transaction::TransactionId;
use crate::tuple::Tuple;

/// Shared handle to a resident page. A page is pinned while a handle other than
/// the pool's own is alive.
pub type PageHandle = Arc<RwLock<HeapPage>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    ReadOnly,
    ReadWrite,
}

impl Permission {
    fn lock_mode(self) -> LockMode {
        match self {
            Permission::ReadOnly => LockMode::Shared,
            Permission::ReadWrite => LockMode::Exclusive,
        }
    }
}

#[derive(Default)]
struct PoolState {
    pages: HashMap<PageId, PageHandle>,
    replacer: LruReplacer,
}

pub struct BufferPool {
    capacity: usize,
    catalog: Arc<Catalog>,
    lock_manager: LockManager,
    state: Mutex<PoolState>,
}

impl BufferPool {
    pub fn new(catalog: Arc<Catalog>, config: &DatabaseConfig) -> Self {
        Self {
            capacity: config.buffer_pool_pages.max(1),
            catalog,
            lock_manager: LockManager::new(config.lock_retry_interval),
            state: Mutex::new(PoolState::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn lock_manager(&self) -> &LockManager {
        &self.lock_manager
    }

    /// Locks `pid` for `tid` (possibly blocking), then returns the cached page,
    /// reading it from its heap file on a miss.
    pub fn get_page(&self, tid: TransactionId, pid: PageId, perm: Permission) -> Result<PageHandle> {
        self.lock_manager.lock(tid, pid, perm.lock_mode())?;

        let mut state = self.state.lock();
        if let Some(handle) = state.pages.get(&pid).cloned() {
            state.replacer.touch(pid);
            return Ok(handle);
        }

        let file = self.catalog.file(pid.table_id)?;
        let page = file.read_page(pid)?;
        if state.pages.len() >= self.capacity {
            Self::evict_page(&mut state)?;
        }
        let handle = Arc::new(RwLock::new(page));
        state.pages.insert(pid, Arc::clone(&handle));
        state.replacer.touch(pid);
        Ok(handle)
    }

    /// Drops the least recently used page that is clean and not pinned.
    fn evict_page(state: &mut PoolState) -> Result<()> {
        let victim = state.replacer.iter().find(|pid| {
            state.pages.get(pid).is_some_and(|handle| {
                Arc::strong_count(handle) == 1
                    && handle
                        .try_read()
                        .is_some_and(|page| page.is_dirty().is_none())
            })
        });
        match victim {
            Some(pid) => {
                strata_debug_log!("[BufferPool::evict_page] evicting {}", pid);
                state.pages.remove(&pid);
                state.replacer.remove(pid);
                Ok(())
            }
            None => Err(DbError::NoEvictablePage),
        }
    }

    pub fn insert_tuple(&self, tid: TransactionId, table_id: u32, tuple: Tuple) -> Result<()> {
        let file = self.catalog.file(table_id)?;
        let dirtied = file.insert_tuple(self, tid, tuple)?;
        self.mark_dirty(tid, &dirtied);
        Ok(())
    }

    pub fn delete_tuple(&self, tid: TransactionId, tuple: &Tuple) -> Result<()> {
        let rid = tuple
            .record_id()
            .ok_or_else(|| DbError::NoSuchElement("tuple has no record id".to_string()))?;
        let file = self.catalog.file(rid.page_id.table_id)?;
        let dirtied = file.delete_tuple(self, tid, tuple)?;
        self.mark_dirty(tid, &dirtied);
        Ok(())
    }

    fn mark_dirty(&self, tid: TransactionId, pids: &[PageId]) {
        let handles: Vec<PageHandle> = {
            let mut state = self.state.lock();
            pids.iter()
                .filter_map(|pid| {
                    state.replacer.touch(*pid);
                    state.pages.get(pid).cloned()
                })
                .collect()
        };
        for handle in handles {
            handle.write().mark_dirty(true, tid);
        }
    }

    /// Ends `tid`: on commit its dirty pages are written and marked clean, on
    /// abort every page it locked is dropped from the cache. Its locks are
    /// released either way.
    ///
    /// A commit whose flush fails drops the pages it could not write, so no
    /// page outlives its locks still tagged with `tid`.
    pub fn transaction_complete(&self, tid: TransactionId, commit: bool) -> Result<()> {
        let result = if commit {
            self.flush_pages(tid)
        } else {
            Ok(())
        };
        if !commit || result.is_err() {
            self.discard_pages(tid);
        }
        self.lock_manager.unlock_all(tid);
        strata_debug_log!(
            "[BufferPool::transaction_complete] {} {}",
            tid,
            if commit && result.is_ok() { "committed" } else { "aborted" }
        );
        result
    }

    fn discard_pages(&self, tid: TransactionId) {
        let held = self.lock_manager.pages_held(tid);
        let mut state = self.state.lock();
        let dirtied: Vec<PageId> = state
            .pages
            .iter()
            .filter(|(_, handle)| handle.read().is_dirty() == Some(tid))
            .map(|(pid, _)| *pid)
            .collect();
        for pid in held.into_iter().chain(dirtied) {
            state.pages.remove(&pid);
            state.replacer.remove(pid);
        }
    }

    /// Writes every page dirtied by `tid` and clears its dirty tag.
    pub fn flush_pages(&self, tid: TransactionId) -> Result<()> {
        let state = self.state.lock();
        for handle in state.pages.values() {
            let owned = handle.read().is_dirty() == Some(tid);
            if owned {
                Self::write_back(&self.catalog, &mut handle.write())?;
            }
        }
        Ok(())
    }

    /// Writes one page if it is dirty, whoever dirtied it.
    pub fn flush_page(&self, pid: PageId) -> Result<()> {
        let handle = self.state.lock().pages.get(&pid).cloned();
        if let Some(handle) = handle {
            let mut page = handle.write();
            if page.is_dirty().is_some() {
                Self::write_back(&self.catalog, &mut page)?;
            }
        }
        Ok(())
    }

    /// Writes every dirty page regardless of owner. Breaks NO-STEAL for
    /// transactions that are still running.
    pub fn flush_all_pages(&self) -> Result<()> {
        let state = self.state.lock();
        for handle in state.pages.values() {
            let dirty = handle.read().is_dirty().is_some();
            if dirty {
                Self::write_back(&self.catalog, &mut handle.write())?;
            }
        }
        Ok(())
    }

    fn write_back(catalog: &Catalog, page: &mut HeapPage) -> Result<()> {
        let file = catalog.file(page.pid().table_id)?;
        file.write_page(page)?;
        if let Some(tid) = page.is_dirty() {
            page.mark_dirty(false, tid);
        }
        strata_debug_log!("[BufferPool::write_back] flushed {}", page.pid());
        Ok(())
    }

    /// Removes `pid` from the cache without writing it.
    pub fn discard_page(&self, pid: PageId) {
        let mut state = self.state.lock();
        state.pages.remove(&pid);
        state.replacer.remove(pid);
    }

    pub fn holds_lock(&self, tid: TransactionId, pid: PageId) -> bool {
        self.lock_manager.holds_lock(tid, pid)
    }

    /// Releases a single page lock before the transaction ends. Not two-phase safe.
    pub fn release_page(&self, tid: TransactionId, pid: PageId) {
        self.lock_manager.unlock(tid, pid);
    }

    pub fn contains_page(&self, pid: PageId) -> bool {
        self.state.lock().pages.contains_key(&pid)
    }

    pub fn num_cached_pages(&self) -> usize {
        self.state.lock().pages.len()
    }

    /// Dirty tag of a resident page, `None` if clean or not cached.
    pub fn dirtied_by(&self, pid: PageId) -> Option<TransactionId> {
        let handle = self.state.lock().pages.get(&pid).cloned()?;
        let dirty = handle.read().is_dirty();
        dirty
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap_file::HeapFile;
    use crate::tuple::{Field, Type, TupleDesc};
    use tempfile::{tempdir, TempDir};

    fn setup(pages: usize) -> (TempDir, Arc<BufferPool>, Arc<HeapFile>) {
        let dir = tempdir().unwrap();
        let catalog = Arc::new(Catalog::new());
        let desc = TupleDesc::new(vec![Type::Int, Type::Int], vec!["a", "b"]);
        let file = Arc::new(HeapFile::open(dir.path().join("t.dat"), desc).unwrap());
        catalog.add_table(Arc::clone(&file), "t", None);
        let config = DatabaseConfig::default().with_pages(pages);
        let pool = Arc::new(BufferPool::new(catalog, &config));
        (dir, pool, file)
    }

    fn row(file: &HeapFile, a: i32) -> Tuple {
        Tuple::from_fields(file.tuple_desc().clone(), vec![Field::Int(a), Field::Int(a)]).unwrap()
    }

    fn write_empty_pages(file: &HeapFile, n: u32) {
        for page_no in 0..n {
            let page = HeapPage::empty(PageId::new(file.id(), page_no), file.tuple_desc().clone());
            file.write_page(&page).unwrap();
        }
    }

    #[test]
    fn get_page_caches_and_locks() {
        let (_dir, pool, file) = setup(4);
        write_empty_pages(&file, 1);
        let tid = TransactionId::new();
        let pid = PageId::new(file.id(), 0);
        let a = pool.get_page(tid, pid, Permission::ReadOnly).unwrap();
        let b = pool.get_page(tid, pid, Permission::ReadOnly).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(pool.holds_lock(tid, pid));
        assert_eq!(pool.num_cached_pages(), 1);
    }

    #[test]
    fn eviction_skips_pinned_pages() {
        let (_dir, pool, file) = setup(1);
        write_empty_pages(&file, 2);
        let tid = TransactionId::new();
        let pinned = pool
            .get_page(tid, PageId::new(file.id(), 0), Permission::ReadOnly)
            .unwrap();
        let err = pool
            .get_page(tid, PageId::new(file.id(), 1), Permission::ReadOnly)
            .unwrap_err();
        assert!(matches!(err, DbError::NoEvictablePage));
        drop(pinned);
        pool.get_page(tid, PageId::new(file.id(), 1), Permission::ReadOnly)
            .unwrap();
        assert!(!pool.contains_page(PageId::new(file.id(), 0)));
    }

    #[test]
    fn commit_flushes_and_cleans() {
        let (_dir, pool, file) = setup(4);
        let tid = TransactionId::new();
        pool.insert_tuple(tid, file.id(), row(&file, 7)).unwrap();
        let pid = PageId::new(file.id(), 0);
        assert_eq!(pool.dirtied_by(pid), Some(tid));

        pool.transaction_complete(tid, true).unwrap();
        assert_eq!(pool.dirtied_by(pid), None);
        assert!(!pool.holds_lock(tid, pid));
        let on_disk = file.read_page(pid).unwrap();
        assert_eq!(on_disk.iter().count(), 1);
    }

    #[test]
    fn abort_discards_cached_pages() {
        let (_dir, pool, file) = setup(4);
        let setup_tid = TransactionId::new();
        pool.insert_tuple(setup_tid, file.id(), row(&file, 1)).unwrap();
        pool.transaction_complete(setup_tid, true).unwrap();

        let pid = PageId::new(file.id(), 0);
        let before = file.read_page(pid).unwrap().page_data();

        let tid = TransactionId::new();
        pool.insert_tuple(tid, file.id(), row(&file, 2)).unwrap();
        pool.transaction_complete(tid, false).unwrap();
        assert!(!pool.contains_page(pid));
        assert_eq!(file.read_page(pid).unwrap().page_data(), before);

        let reader = TransactionId::new();
        let page = pool.get_page(reader, pid, Permission::ReadOnly).unwrap();
        assert_eq!(page.read().iter().count(), 1);
    }

    #[test]
    fn flush_all_writes_everything() {
        let (_dir, pool, file) = setup(4);
        let tid = TransactionId::new();
        pool.insert_tuple(tid, file.id(), row(&file, 3)).unwrap();
        pool.flush_all_pages().unwrap();
        let pid = PageId::new(file.id(), 0);
        assert_eq!(pool.dirtied_by(pid), None);
        assert_eq!(file.read_page(pid).unwrap().iter().count(), 1);
    }

    #[test]
    fn release_page_drops_one_lock() {
        let (_dir, pool, file) = setup(4);
        write_empty_pages(&file, 1);
        let tid = TransactionId::new();
        let pid = PageId::new(file.id(), 0);
        drop(pool.get_page(tid, pid, Permission::ReadWrite).unwrap());
        pool.release_page(tid, pid);
        assert!(!pool.holds_lock(tid, pid));
        pool.discard_page(pid);
        assert!(!pool.contains_page(pid));
    }

    #[test]
    fn failed_commit_drops_unwritten_pages() {
        let (_dir, pool, file) = setup(4);
        let tid = TransactionId::new();
        pool.insert_tuple(tid, file.id(), row(&file, 4)).unwrap();
        let pid = PageId::new(file.id(), 0);

        pool.catalog().clear();
        assert!(matches!(
            pool.transaction_complete(tid, true),
            Err(DbError::UnknownTable(_))
        ));
        assert!(!pool.contains_page(pid));
        assert_eq!(pool.dirtied_by(pid), None);
        assert!(pool.lock_manager().pages_held(tid).is_empty());
        assert_eq!(file.read_page(pid).unwrap().iter().count(), 0);
    }
}
