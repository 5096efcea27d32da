//! The narrow contract the log manager requires from a page-level storage
//! engine. The engine owns page contents, the durable log and the master
//! LSN; the log manager only ever appends to the log and never truncates
//! it.

use crate::core::types::{Lsn, PageId};

/// Everything the log manager needs from the page store it is protecting.
///
/// Implementors decide how pages and the durable log are actually persisted
/// (file, mmap, network) — the log manager only calls through this trait.
pub trait StorageEngine {
    /// Allocates a strictly greater LSN than any returned before. Never
    /// rolled back once issued, even if the caller never uses it.
    fn next_lsn(&mut self) -> Lsn;

    /// The page's current `pageLSN` on disk (or in the buffer pool).
    /// `NULL_LSN` for a page the engine has never seen.
    fn get_lsn(&self, page_id: PageId) -> Lsn;

    /// Atomically writes `bytes` at `offset` into `page_id` and sets its
    /// `pageLSN` to `new_page_lsn`. Returns `false` if the engine could not
    /// complete the write (e.g. unresponsive backing store).
    fn page_write(&mut self, page_id: PageId, offset: u64, bytes: &[u8], new_page_lsn: Lsn) -> bool;

    /// Appends serialized log records to the durable log. Durable on
    /// return.
    fn update_log(&mut self, text: &str);

    /// The entire durable log, as serialized text.
    fn get_log(&self) -> String;

    /// Persists the most recent `BEGIN_CKPT` LSN.
    fn store_master(&mut self, lsn: Lsn);

    /// The most recently stored master LSN, or `NULL_LSN` if none has been
    /// stored yet.
    fn get_master(&self) -> Lsn;
}
