//! Least-recently-used ordering of resident pages.

use std::collections::VecDeque;

use crate::page::PageId;

/// Recency list: front is least recently used, back is most recently used.
#[derive(Debug, Default)]
pub struct LruReplacer {
    order: VecDeque<PageId>,
}

impl LruReplacer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `pid` as the most recently used page.
    pub fn touch(&mut self, pid: PageId) {
        self.remove(pid);
        self.order.push_back(pid);
    }

    pub fn remove(&mut self, pid: PageId) {
        if let Some(pos) = self.order.iter().position(|p| *p == pid) {
            self.order.remove(pos);
        }
    }

    /// Pages from least to most recently used.
    pub fn iter(&self) -> impl Iterator<Item = PageId> + '_ {
        self.order.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
