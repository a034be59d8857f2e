//! On-disk layout of a heap page: a slot bitmap followed by fixed-width tuple slots.

use std::fmt;
use std::sync::Arc;

use bytes::{BufMut, BytesMut};

use crate::error::{DbError, Result};
use crate::transaction::TransactionId;
use crate::tuple::{RecordId, Tuple, TupleDesc};
use crate::PAGE_SIZE;

/// Logical page address. The table id doubles as the heap file id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId {
    pub table_id: u32,
    pub page_no: u32,
}

impl PageId {
    pub fn new(table_id: u32, page_no: u32) -> Self {
        Self { table_id, page_no }
    }

    pub fn serialize(&self) -> [u32; 2] {
        [self.table_id, self.page_no]
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.table_id, self.page_no)
    }
}

/// Number of tuples of `desc` that fit on one page, one header bit each.
pub fn slots_per_page(desc: &TupleDesc) -> usize {
    (PAGE_SIZE * 8) / (desc.size() * 8 + 1)
}

fn header_len(num_slots: usize) -> usize {
    num_slots.div_ceil(8)
}

/// In-memory image of one page of a heap file.
#[derive(Debug, Clone)]
pub struct HeapPage {
    pid: PageId,
    desc: Arc<TupleDesc>,
    header: Vec<u8>,
    tuples: Vec<Option<Tuple>>,
    dirty: Option<TransactionId>,
}

impl HeapPage {
    /// Decodes `data`, which must be exactly `PAGE_SIZE` bytes.
    pub fn new(pid: PageId, desc: Arc<TupleDesc>, data: &[u8]) -> Result<Self> {
        if data.len() != PAGE_SIZE {
            return Err(DbError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("page {} has {} bytes", pid, data.len()),
            )));
        }
        let num_slots = slots_per_page(&desc);
        let header_len = header_len(num_slots);
        let tuple_size = desc.size();
        let header = data[..header_len].to_vec();

        let mut tuples = Vec::with_capacity(num_slots);
        for slot in 0..num_slots {
            if header[slot / 8] & (1 << (slot % 8)) == 0 {
                tuples.push(None);
                continue;
            }
            let start = header_len + slot * tuple_size;
            let mut raw = &data[start..start + tuple_size];
            let mut tuple = Tuple::parse(desc.clone(), &mut raw);
            tuple.set_record_id(Some(RecordId::new(pid, slot)));
            tuples.push(Some(tuple));
        }

        Ok(Self {
            pid,
            desc,
            header,
            tuples,
            dirty: None,
        })
    }

    /// A page with every slot free.
    pub fn empty(pid: PageId, desc: Arc<TupleDesc>) -> Self {
        let num_slots = slots_per_page(&desc);
        Self {
            pid,
            desc,
            header: vec![0; header_len(num_slots)],
            tuples: vec![None; num_slots],
            dirty: None,
        }
    }

    pub fn empty_page_data() -> Vec<u8> {
        vec![0; PAGE_SIZE]
    }

    pub fn pid(&self) -> PageId {
        self.pid
    }

    pub fn tuple_desc(&self) -> &Arc<TupleDesc> {
        &self.desc
    }

    pub fn num_slots(&self) -> usize {
        self.tuples.len()
    }

    pub fn num_empty_slots(&self) -> usize {
        (0..self.num_slots()).filter(|&i| !self.is_slot_used(i)).count()
    }

    pub fn is_slot_used(&self, slot: usize) -> bool {
        slot < self.num_slots() && self.header[slot / 8] & (1 << (slot % 8)) != 0
    }

    fn set_slot(&mut self, slot: usize, used: bool) {
        if used {
            self.header[slot / 8] |= 1 << (slot % 8);
        } else {
            self.header[slot / 8] &= !(1 << (slot % 8));
        }
    }

    /// Occupied slots in increasing slot order.
    pub fn iter(&self) -> impl Iterator<Item = &Tuple> {
        self.tuples.iter().flatten()
    }

    /// Places `tuple` in the lowest free slot and returns its new record id.
    pub fn insert_tuple(&mut self, mut tuple: Tuple) -> Result<RecordId> {
        if **tuple.tuple_desc() != *self.desc {
            return Err(DbError::SchemaMismatch {
                expected: self.desc.to_string(),
                found: tuple.tuple_desc().to_string(),
            });
        }
        let slot = (0..self.num_slots())
            .find(|&i| !self.is_slot_used(i))
            .ok_or(DbError::NoSpace(self.pid))?;

        let rid = RecordId::new(self.pid, slot);
        tuple.set_record_id(Some(rid));
        self.set_slot(slot, true);
        self.tuples[slot] = Some(tuple);
        Ok(rid)
    }

    pub fn delete_tuple(&mut self, tuple: &Tuple) -> Result<()> {
        let rid = match tuple.record_id() {
            Some(rid) if rid.page_id == self.pid && self.is_slot_used(rid.slot) => rid,
            _ => return Err(DbError::NotOnPage(self.pid)),
        };
        self.set_slot(rid.slot, false);
        self.tuples[rid.slot] = None;
        Ok(())
    }

    /// Records `tid` as the dirtier, keeping the first one since the page was last clean.
    pub fn mark_dirty(&mut self, dirty: bool, tid: TransactionId) {
        if !dirty {
            self.dirty = None;
        } else if self.dirty.is_none() {
            self.dirty = Some(tid);
        }
    }

    pub fn is_dirty(&self) -> Option<TransactionId> {
        self.dirty
    }

    /// Serializes the page into exactly `PAGE_SIZE` bytes.
    pub fn page_data(&self) -> Vec<u8> {
        let tuple_size = self.desc.size();
        let mut buf = BytesMut::with_capacity(PAGE_SIZE);
        buf.put_slice(&self.header);
        for slot in &self.tuples {
            match slot {
                Some(tuple) => tuple.serialize(&mut buf),
                None => buf.put_bytes(0, tuple_size),
            }
        }
        buf.put_bytes(0, PAGE_SIZE - buf.len());
        buf.to_vec()
    }
}
