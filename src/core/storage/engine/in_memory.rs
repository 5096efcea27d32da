//! A non-durable reference `StorageEngine`, used by this crate's own test
//! suite and available to downstream consumers who want a fast engine for
//! embedding or testing.

use super::traits::StorageEngine;
use crate::core::types::{Lsn, PageId, NULL_LSN};
use std::collections::HashMap;

/// Keeps pages, the durable log and the master LSN entirely in process
/// memory. Nothing here survives the process; it exists to exercise the
/// log manager's algorithms without a filesystem.
#[derive(Debug, Default)]
pub struct InMemoryStorageEngine {
    next_lsn: u64,
    pages: HashMap<PageId, (Lsn, Vec<u8>)>,
    log: String,
    master: Lsn,
}

impl InMemoryStorageEngine {
    /// A fresh engine with no pages, an empty log and no master LSN.
    pub fn new() -> Self {
        Self { next_lsn: 1, ..Self::default() }
    }

    /// A fresh engine whose LSN allocator starts at `next`. For a real
    /// storage engine the allocator survives a crash along with the pages
    /// and log it is durable with; this lets tests reconstruct that
    /// continuity when standing up a new `InMemoryStorageEngine` to replay
    /// a durable log written by an earlier instance.
    pub fn with_next_lsn(next: u64) -> Self {
        Self { next_lsn: next, ..Self::default() }
    }

    /// The raw bytes of a page, or `None` if the engine has never written
    /// it. Test-only convenience; not part of the `StorageEngine` contract.
    pub fn page_bytes(&self, page_id: PageId) -> Option<&[u8]> {
        self.pages.get(&page_id).map(|(_, bytes)| bytes.as_slice())
    }
}

impl StorageEngine for InMemoryStorageEngine {
    fn next_lsn(&mut self) -> Lsn {
        let lsn = Lsn(self.next_lsn);
        self.next_lsn += 1;
        lsn
    }

    fn get_lsn(&self, page_id: PageId) -> Lsn {
        self.pages.get(&page_id).map_or(NULL_LSN, |(lsn, _)| *lsn)
    }

    fn page_write(&mut self, page_id: PageId, offset: u64, bytes: &[u8], new_page_lsn: Lsn) -> bool {
        let entry = self.pages.entry(page_id).or_insert_with(|| (NULL_LSN, Vec::new()));
        let offset = offset as usize;
        if entry.1.len() < offset + bytes.len() {
            entry.1.resize(offset + bytes.len(), 0);
        }
        entry.1[offset..offset + bytes.len()].copy_from_slice(bytes);
        entry.0 = new_page_lsn;
        true
    }

    fn update_log(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.log.push_str(text);
        if !self.log.ends_with('\n') {
            self.log.push('\n');
        }
    }

    fn get_log(&self) -> String {
        self.log.clone()
    }

    fn store_master(&mut self, lsn: Lsn) {
        self.master = lsn;
    }

    fn get_master(&self) -> Lsn {
        self.master
    }
}
