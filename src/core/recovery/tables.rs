//! Transaction table and dirty-page table.
//!
//! Both are plain in-memory maps rebuilt from scratch by analysis and
//! consulted by every later phase; neither persists on its own. A fuzzy
//! checkpoint captures a snapshot of each into an `END_CKPT` record.

use crate::core::types::{Lsn, PageId, TxId, TxStatus};
use std::collections::HashMap;

/// Tracks, for every transaction with at least one record in the log, its
/// most recent LSN and whether it has committed.
#[derive(Debug, Clone, Default)]
pub struct TransactionTable {
    entries: HashMap<TxId, (Lsn, TxStatus)>,
}

impl TransactionTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// The transaction's most recent LSN, if it has one.
    pub fn get_last_lsn(&self, tx_id: TxId) -> Option<Lsn> {
        self.entries.get(&tx_id).map(|(lsn, _)| *lsn)
    }

    /// The transaction's status, if it is in the table.
    pub fn status(&self, tx_id: TxId) -> Option<TxStatus> {
        self.entries.get(&tx_id).map(|(_, status)| *status)
    }

    /// Records `lsn` as the transaction's most recent LSN. Adds the
    /// transaction as `InProgress` if it is not already present; leaves an
    /// existing status untouched otherwise.
    pub fn set_last_lsn(&mut self, tx_id: TxId, lsn: Lsn) {
        match self.entries.get_mut(&tx_id) {
            Some(entry) => entry.0 = lsn,
            None => {
                self.entries.insert(tx_id, (lsn, TxStatus::InProgress));
            }
        }
    }

    /// Marks a transaction committed. No-op if the transaction is not
    /// present (the record that would have added it hasn't been seen).
    pub fn mark_committed(&mut self, tx_id: TxId) {
        if let Some(entry) = self.entries.get_mut(&tx_id) {
            entry.1 = TxStatus::Committed;
        }
    }

    /// Removes a transaction once it is fully done (its `END` record has
    /// been applied).
    pub fn forget(&mut self, tx_id: TxId) {
        self.entries.remove(&tx_id);
    }

    /// True if the table has no entry for this transaction.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of tracked transactions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Transactions still `InProgress` at the end of analysis: undo's
    /// worklist.
    pub fn in_progress(&self) -> impl Iterator<Item = (TxId, Lsn)> + '_ {
        self.entries
            .iter()
            .filter(|(_, (_, status))| *status == TxStatus::InProgress)
            .map(|(tx_id, (lsn, _))| (*tx_id, *lsn))
    }

    /// Transactions marked `Committed`: redo's post-pass worklist for
    /// writing their `END` records.
    pub fn committed(&self) -> impl Iterator<Item = (TxId, Lsn)> + '_ {
        self.entries
            .iter()
            .filter(|(_, (_, status))| *status == TxStatus::Committed)
            .map(|(tx_id, (lsn, _))| (*tx_id, *lsn))
    }

    /// A snapshot of every entry, in the shape a checkpoint record carries.
    pub fn snapshot(&self) -> Vec<(TxId, Lsn, TxStatus)> {
        self.entries.iter().map(|(tx_id, (lsn, status))| (*tx_id, *lsn, *status)).collect()
    }
}

/// Tracks, for every page with an unflushed update, the LSN of the first
/// log record that dirtied it (`recLSN`): the point redo must start from
/// for that page.
#[derive(Debug, Clone, Default)]
pub struct DirtyPageTable {
    entries: HashMap<PageId, Lsn>,
}

impl DirtyPageTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `page_id` was dirtied at `lsn`, but only if the page
    /// isn't already tracked. First writer wins: a page's `recLSN` is the
    /// earliest update still unflushed, and a later update never moves it
    /// later.
    pub fn insert_if_absent(&mut self, page_id: PageId, lsn: Lsn) {
        self.entries.entry(page_id).or_insert(lsn);
    }

    /// The page's `recLSN`, if it is dirty.
    pub fn get(&self, page_id: PageId) -> Option<Lsn> {
        self.entries.get(&page_id).copied()
    }

    /// Removes a page once the storage engine reports it flushed.
    pub fn remove(&mut self, page_id: PageId) {
        self.entries.remove(&page_id);
    }

    /// True if no page is tracked as dirty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of tracked dirty pages.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// The smallest `recLSN` across all dirty pages: where redo must begin
    /// scanning from. `None` if no page is dirty.
    pub fn min_rec_lsn(&self) -> Option<Lsn> {
        self.entries.values().copied().min()
    }

    /// A snapshot of every entry, in the shape a checkpoint record carries.
    pub fn snapshot(&self) -> Vec<(PageId, Lsn)> {
        self.entries.iter().map(|(page_id, lsn)| (*page_id, *lsn)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_table_tracks_last_lsn_and_status() {
        let mut table = TransactionTable::new();
        assert_eq!(table.get_last_lsn(TxId(1)), None);

        table.set_last_lsn(TxId(1), Lsn(10));
        assert_eq!(table.get_last_lsn(TxId(1)), Some(Lsn(10)));
        assert_eq!(table.status(TxId(1)), Some(TxStatus::InProgress));

        table.set_last_lsn(TxId(1), Lsn(20));
        assert_eq!(table.get_last_lsn(TxId(1)), Some(Lsn(20)));

        table.mark_committed(TxId(1));
        assert_eq!(table.status(TxId(1)), Some(TxStatus::Committed));

        table.forget(TxId(1));
        assert_eq!(table.get_last_lsn(TxId(1)), None);
    }

    #[test]
    fn mark_committed_on_unknown_tx_is_a_no_op() {
        let mut table = TransactionTable::new();
        table.mark_committed(TxId(99));
        assert!(table.is_empty());
    }

    #[test]
    fn in_progress_excludes_committed() {
        let mut table = TransactionTable::new();
        table.set_last_lsn(TxId(1), Lsn(1));
        table.set_last_lsn(TxId(2), Lsn(2));
        table.mark_committed(TxId(2));

        let active: Vec<_> = table.in_progress().collect();
        assert_eq!(active, vec![(TxId(1), Lsn(1))]);
    }

    #[test]
    fn dirty_page_table_is_first_writer_wins() {
        let mut table = DirtyPageTable::new();
        table.insert_if_absent(PageId(1), Lsn(100));
        table.insert_if_absent(PageId(1), Lsn(50));
        assert_eq!(table.get(PageId(1)), Some(Lsn(100)));
    }

    #[test]
    fn dirty_page_table_min_rec_lsn() {
        let mut table = DirtyPageTable::new();
        assert_eq!(table.min_rec_lsn(), None);

        table.insert_if_absent(PageId(1), Lsn(300));
        table.insert_if_absent(PageId(2), Lsn(100));
        table.insert_if_absent(PageId(3), Lsn(200));
        assert_eq!(table.min_rec_lsn(), Some(Lsn(100)));

        table.remove(PageId(2));
        assert_eq!(table.min_rec_lsn(), Some(Lsn(200)));
    }
}
