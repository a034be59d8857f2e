//! A table stored as an unordered sequence of heap pages in one file.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::buffer_pool::{BufferPool, Permission};
use crate::error::{DbError, Result};
use crate::page::{slots_per_page, HeapPage, PageId};
use crate::pager::Pager;
use crate::strata_debug_log;
use crate::transaction::TransactionId;
use crate::tuple::{Tuple, TupleDesc};
use crate::PAGE_SIZE;

#[derive(Debug)]
pub struct HeapFile {
    path: PathBuf,
    id: u32,
    desc: Arc<TupleDesc>,
    pager: Mutex<Pager>,
    /// Serializes appending a fresh page to the end of the file.
    append_lock: Mutex<()>,
}

impl HeapFile {
    /// Opens (or creates) the backing file. The id is a hash of its absolute path.
    ///
    /// Fails with a schema mismatch when a single tuple of `desc` cannot fit on a page.
    pub fn open<P: AsRef<Path>>(path: P, desc: TupleDesc) -> Result<Self> {
        if slots_per_page(&desc) == 0 {
            return Err(DbError::SchemaMismatch {
                expected: format!("tuples of at most {} bytes", PAGE_SIZE - 1),
                found: format!("{} ({} bytes)", desc, desc.size()),
            });
        }
        let pager = Pager::open(path.as_ref())?;
        let path = path.as_ref().canonicalize()?;
        let id = crc32fast::hash(path.to_string_lossy().as_bytes());
        strata_debug_log!("[HeapFile::open] {:?} has id {}", path, id);
        Ok(Self {
            path,
            id,
            desc: Arc::new(desc),
            pager: Mutex::new(pager),
            append_lock: Mutex::new(()),
        })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn tuple_desc(&self) -> &Arc<TupleDesc> {
        &self.desc
    }

    pub fn num_pages(&self) -> u32 {
        self.pager.lock().num_pages()
    }

    /// Reads a page straight from disk, bypassing the buffer pool.
    pub fn read_page(&self, pid: PageId) -> Result<HeapPage> {
        if pid.table_id != self.id {
            return Err(DbError::UnknownTable(pid.table_id));
        }
        let data = self.pager.lock().read_page(pid.page_no)?;
        HeapPage::new(pid, self.desc.clone(), &data)
    }

    pub fn write_page(&self, page: &HeapPage) -> Result<()> {
        self.pager
            .lock()
            .write_page(page.pid().page_no, &page.page_data())?;
        Ok(())
    }

    /// Inserts into the first page with a free slot, appending a page when all
    /// are full. Returns the pages modified.
    pub fn insert_tuple(
        &self,
        pool: &BufferPool,
        tid: TransactionId,
        tuple: Tuple,
    ) -> Result<Vec<PageId>> {
        if **tuple.tuple_desc() != *self.desc {
            return Err(DbError::SchemaMismatch {
                expected: self.desc.to_string(),
                found: tuple.tuple_desc().to_string(),
            });
        }

        let mut page_no = 0;
        loop {
            if page_no >= self.num_pages() {
                let _append = self.append_lock.lock();
                // Another inserter may have appended while we waited.
                if page_no >= self.num_pages() {
                    let mut pager = self.pager.lock();
                    page_no = pager.num_pages();
                    pager.write_page(page_no, &HeapPage::empty_page_data())?;
                    strata_debug_log!(
                        "[HeapFile::insert_tuple] {} appended page {} to table {}",
                        tid,
                        page_no,
                        self.id
                    );
                }
            }

            let pid = PageId::new(self.id, page_no);
            let handle = pool.get_page(tid, pid, Permission::ReadWrite)?;
            let mut page = handle.write();
            if page.num_empty_slots() > 0 {
                page.insert_tuple(tuple)?;
                page.mark_dirty(true, tid);
                return Ok(vec![pid]);
            }
            page_no += 1;
        }
    }

    pub fn delete_tuple(
        &self,
        pool: &BufferPool,
        tid: TransactionId,
        tuple: &Tuple,
    ) -> Result<Vec<PageId>> {
        let rid = tuple
            .record_id()
            .ok_or_else(|| DbError::NoSuchElement("tuple has no record id".to_string()))?;
        if rid.page_id.table_id != self.id {
            return Err(DbError::NotOnPage(rid.page_id));
        }
        let handle = pool.get_page(tid, rid.page_id, Permission::ReadWrite)?;
        let mut page = handle.write();
        page.delete_tuple(tuple)?;
        page.mark_dirty(true, tid);
        Ok(vec![rid.page_id])
    }

    /// Cursor over every tuple of the table as seen by `tid`.
    pub fn iter(self: &Arc<Self>, pool: Arc<BufferPool>, tid: TransactionId) -> HeapFileIterator {
        HeapFileIterator {
            file: Arc::clone(self),
            pool,
            tid,
            next_page: 0,
            buffered: VecDeque::new(),
            open: false,
        }
    }
}

/// Page-then-slot cursor over a heap file. Each page is locked `ReadOnly`
/// through the buffer pool when the cursor reaches it.
pub struct HeapFileIterator {
    file: Arc<HeapFile>,
    pool: Arc<BufferPool>,
    tid: TransactionId,
    next_page: u32,
    buffered: VecDeque<Tuple>,
    open: bool,
}

impl HeapFileIterator {
    pub fn open(&mut self) {
        self.open = true;
        self.next_page = 0;
        self.buffered.clear();
    }

    pub fn close(&mut self) {
        self.open = false;
        self.buffered.clear();
    }

    pub fn rewind(&mut self) {
        self.open();
    }

    /// Next tuple, or `None` at end of table or when the cursor is closed.
    pub fn fetch_next(&mut self) -> Result<Option<Tuple>> {
        if !self.open {
            return Ok(None);
        }
        while self.buffered.is_empty() {
            // Re-read the page count so pages appended by this transaction are seen.
            if self.next_page >= self.file.num_pages() {
                return Ok(None);
            }
            let pid = PageId::new(self.file.id(), self.next_page);
            let handle = self.pool.get_page(self.tid, pid, Permission::ReadOnly)?;
            self.buffered.extend(handle.read().iter().cloned());
            self.next_page += 1;
        }
        Ok(self.buffered.pop_front())
    }
}

impl Iterator for HeapFileIterator {
    type Item = Result<Tuple>;

    fn next(&mut self) -> Option<Self::Item> {
        self.fetch_next().transpose()
    }
}
