//! The public log manager: owns the in-memory tables and log tail, and
//! drives the write path and the recovery path over an injected storage
//! engine.
//!
//! Every public method locks the manager's single internal mutex for its
//! entire duration, including any calls made into the storage engine, so
//! that LSN allocation and tail ordering stay consistent (§5 of this
//! crate's design: a single-threaded cooperative model with respect to its
//! own state).

use crate::core::common::error::RecoveryError;
use crate::core::recovery::analysis::analyze;
use crate::core::recovery::config::LogManagerConfig;
use crate::core::recovery::redo::{redo, RedoOutcome};
use crate::core::recovery::tables::{DirtyPageTable, TransactionTable};
use crate::core::recovery::undo::undo;
use crate::core::storage::engine::StorageEngine;
use crate::core::types::{Lsn, PageId, TxId, NULL_LSN};
use crate::core::wal::{parse_log, DirtyPageSnapshot, LogRecord, TxTableSnapshot};
use log::{debug, info};
use std::sync::Mutex;

struct Inner {
    transaction_table: TransactionTable,
    dirty_page_table: DirtyPageTable,
    tail: Vec<LogRecord>,
    engine: Box<dyn StorageEngine + Send>,
}

impl Inner {
    fn combined_log(&self) -> Result<Vec<LogRecord>, RecoveryError> {
        let mut records = parse_log(&self.engine.get_log())?;
        records.extend(self.tail.iter().cloned());
        Ok(records)
    }

    /// Flushes the longest tail prefix whose last element's lsn is ≤
    /// `max_lsn` (§9: do not require exact membership).
    fn flush_to(&mut self, max_lsn: Lsn) {
        if self.tail.is_empty() || self.tail[0].lsn() > max_lsn {
            return;
        }
        let mut cut = 0;
        for record in &self.tail {
            if record.lsn() > max_lsn {
                break;
            }
            cut += 1;
        }
        if cut == 0 {
            return;
        }
        let mut text = String::new();
        for record in &self.tail[..cut] {
            text.push_str(&record.serialize());
            text.push('\n');
        }
        self.engine.update_log(&text);
        self.tail.drain(..cut);
    }
}

/// Coordinates write-ahead logging and ARIES recovery over a pluggable
/// [`StorageEngine`].
pub struct LogManager {
    inner: Mutex<Inner>,
}

impl LogManager {
    /// Builds a manager with no pending tail and fresh (empty) in-memory
    /// tables, backed by `engine`.
    pub fn new(engine: Box<dyn StorageEngine + Send>, config: LogManagerConfig) -> Self {
        let tail = Vec::with_capacity(config.tail_capacity);
        Self {
            inner: Mutex::new(Inner {
                transaction_table: TransactionTable::new(),
                dirty_page_table: DirtyPageTable::new(),
                tail,
                engine,
            }),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, RecoveryError> {
        self.inner.lock().map_err(|_| RecoveryError::LockPoisoned)
    }

    /// Swaps in a different storage engine, discarding whatever was
    /// injected before. The in-memory tables and tail are left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`RecoveryError::LockPoisoned`] if a prior holder of the
    /// internal mutex panicked while holding it.
    pub fn set_storage_engine(&self, engine: Box<dyn StorageEngine + Send>) -> Result<(), RecoveryError> {
        self.lock()?.engine = engine;
        Ok(())
    }

    /// Logs a logical page write and returns its LSN.
    ///
    /// # Errors
    ///
    /// Returns [`RecoveryError::LockPoisoned`] if a prior holder of the
    /// internal mutex panicked while holding it.
    pub fn write(
        &self,
        tx_id: TxId,
        page_id: PageId,
        offset: u64,
        before_image: Vec<u8>,
        after_image: Vec<u8>,
    ) -> Result<Lsn, RecoveryError> {
        let mut inner = self.lock()?;
        let lsn = inner.engine.next_lsn();
        inner.dirty_page_table.insert_if_absent(page_id, lsn);
        let prev_lsn = inner.transaction_table.get_last_lsn(tx_id).unwrap_or(NULL_LSN);
        inner.transaction_table.set_last_lsn(tx_id, lsn);
        debug!("write: tx {tx_id} page {page_id} at lsn {lsn}");
        inner.tail.push(LogRecord::Update {
            lsn,
            prev_lsn,
            tx_id,
            page_id,
            offset,
            before_image,
            after_image,
        });
        Ok(lsn)
    }

    /// Commits a transaction: appends and durably flushes `COMMIT`, then
    /// appends `END` and drops the transaction from the table.
    ///
    /// # Errors
    ///
    /// Returns [`RecoveryError::LockPoisoned`] if a prior holder of the
    /// internal mutex panicked while holding it.
    pub fn commit(&self, tx_id: TxId) -> Result<(), RecoveryError> {
        let mut inner = self.lock()?;
        let prev_lsn = inner.transaction_table.get_last_lsn(tx_id).unwrap_or(NULL_LSN);
        let commit_lsn = inner.engine.next_lsn();
        inner.tail.push(LogRecord::Commit { lsn: commit_lsn, prev_lsn, tx_id });
        inner.transaction_table.set_last_lsn(tx_id, commit_lsn);
        info!("commit: tx {tx_id} durable at lsn {commit_lsn}");
        inner.flush_to(commit_lsn);

        let end_lsn = inner.engine.next_lsn();
        inner.tail.push(LogRecord::End { lsn: end_lsn, prev_lsn: commit_lsn, tx_id });
        inner.transaction_table.forget(tx_id);
        Ok(())
    }

    /// Aborts a single transaction by undoing it against the combined log.
    /// A no-op (with a logged warning) if `tx_id` is unknown.
    ///
    /// # Errors
    ///
    /// Returns [`RecoveryError::LockPoisoned`] if a prior holder of the
    /// internal mutex panicked while holding it, or an error from the
    /// undo pass if the combined log is malformed or inconsistent.
    pub fn abort(&self, tx_id: TxId) -> Result<(), RecoveryError> {
        let mut inner = self.lock()?;
        let combined = inner.combined_log()?;
        let inner = &mut *inner;
        let new_records = undo(
            &combined,
            &mut inner.transaction_table,
            &mut inner.dirty_page_table,
            Some(tx_id),
            inner.engine.as_mut(),
        )?;
        inner.tail.extend(new_records);
        Ok(())
    }

    /// Writes a fuzzy checkpoint: `BEGIN_CKPT`, a snapshot `END_CKPT`,
    /// flushes through it, and persists the begin LSN as the master LSN.
    ///
    /// # Errors
    ///
    /// Returns [`RecoveryError::LockPoisoned`] if a prior holder of the
    /// internal mutex panicked while holding it.
    pub fn checkpoint(&self) -> Result<(), RecoveryError> {
        let mut inner = self.lock()?;
        let begin_lsn = inner.engine.next_lsn();
        inner.tail.push(LogRecord::BeginCkpt { lsn: begin_lsn });

        let tx_table = inner
            .transaction_table
            .snapshot()
            .into_iter()
            .map(|(tx_id, last_lsn, status)| TxTableSnapshot { tx_id, last_lsn, status })
            .collect();
        let dirty_pages = inner
            .dirty_page_table
            .snapshot()
            .into_iter()
            .map(|(page_id, rec_lsn)| DirtyPageSnapshot { page_id, rec_lsn })
            .collect();

        let end_lsn = inner.engine.next_lsn();
        info!("checkpoint: begin={begin_lsn} end={end_lsn}");
        inner.tail.push(LogRecord::EndCkpt {
            lsn: end_lsn,
            prev_lsn: begin_lsn,
            tx_table,
            dirty_pages,
        });
        inner.flush_to(end_lsn);
        inner.engine.store_master(begin_lsn);
        Ok(())
    }

    /// Called by the storage engine immediately before writing a page:
    /// flushes the log through the page's current `pageLSN` (upholding
    /// WAL) and forgets the page.
    ///
    /// # Errors
    ///
    /// Returns [`RecoveryError::LockPoisoned`] if a prior holder of the
    /// internal mutex panicked while holding it.
    pub fn page_flushed(&self, page_id: PageId) -> Result<(), RecoveryError> {
        let mut inner = self.lock()?;
        let page_lsn = inner.engine.get_lsn(page_id);
        inner.flush_to(page_lsn);
        inner.dirty_page_table.remove(page_id);
        Ok(())
    }

    /// Flushes the tail through `max_lsn`, exposed directly for testing
    /// the flush-prefix behavior independent of `commit`/`checkpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`RecoveryError::LockPoisoned`] if a prior holder of the
    /// internal mutex panicked while holding it.
    pub fn flush_log_tail(&self, max_lsn: Lsn) -> Result<(), RecoveryError> {
        self.lock()?.flush_to(max_lsn);
        Ok(())
    }

    /// Runs `f` against the injected storage engine under the manager's
    /// lock. Lets callers (tests, or a buffer pool driving page flushes)
    /// read engine state such as the durable log text or a page's LSN
    /// without the manager exposing its internal representation.
    ///
    /// # Errors
    ///
    /// Returns [`RecoveryError::LockPoisoned`] if a prior holder of the
    /// internal mutex panicked while holding it.
    pub fn inspect_storage<R>(&self, f: impl FnOnce(&dyn StorageEngine) -> R) -> Result<R, RecoveryError> {
        Ok(f(self.lock()?.engine.as_ref()))
    }

    /// As [`Self::inspect_storage`], but gives `f` mutable access — for
    /// driving the engine's own page writes (simulating a buffer-pool
    /// flush) from outside the manager.
    ///
    /// # Errors
    ///
    /// Returns [`RecoveryError::LockPoisoned`] if a prior holder of the
    /// internal mutex panicked while holding it.
    pub fn inspect_storage_mut<R>(&self, f: impl FnOnce(&mut dyn StorageEngine) -> R) -> Result<R, RecoveryError> {
        Ok(f(self.lock()?.engine.as_mut()))
    }

    /// Runs full ARIES recovery over `log_text`: analyze, then redo, then
    /// (if redo completed) undo. Replaces the manager's in-memory tables
    /// with the result. If redo could not complete, the tables are left
    /// updated through the analysis/partial-redo point and an error is
    /// returned so the caller can retry with a fresh read of the log.
    ///
    /// # Errors
    ///
    /// Returns [`RecoveryError::LockPoisoned`] if a prior holder of the
    /// internal mutex panicked while holding it, in addition to the
    /// malformed-log and engine-write errors documented on the individual
    /// recovery phases.
    pub fn recover(&self, log_text: &str) -> Result<(), RecoveryError> {
        let mut inner = self.lock()?;
        let records = parse_log(log_text)?;
        let (mut transaction_table, mut dirty_page_table) = analyze(&records)?;

        let (outcome, redo_records) =
            redo(&records, &mut dirty_page_table, &mut transaction_table, inner.engine.as_mut())?;
        inner.tail.extend(redo_records);

        if let RedoOutcome::Retry { page_id, lsn } = outcome {
            inner.transaction_table = transaction_table;
            inner.dirty_page_table = dirty_page_table;
            return Err(RecoveryError::EnginePageWriteFailed { page_id, lsn });
        }

        let undo_records = undo(
            &records,
            &mut transaction_table,
            &mut dirty_page_table,
            None,
            inner.engine.as_mut(),
        )?;
        inner.tail.extend(undo_records);
        inner.transaction_table = transaction_table;
        inner.dirty_page_table = dirty_page_table;
        info!("recover: completed over {} records", records.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::storage::engine::InMemoryStorageEngine;

    fn manager() -> LogManager {
        LogManager::new(Box::new(InMemoryStorageEngine::new()), LogManagerConfig::default())
    }

    #[test]
    fn clean_commit_is_durable_and_page_ends_with_after_image() {
        let mgr = manager();
        mgr.write(TxId(1), PageId(10), 0, b"A".to_vec(), b"B".to_vec()).unwrap();
        mgr.commit(TxId(1)).unwrap();

        mgr.inner.lock().unwrap().engine.page_write(PageId(10), 0, b"B", Lsn(1));
        mgr.page_flushed(PageId(10)).unwrap();

        let inner = mgr.inner.lock().unwrap();
        assert!(inner.transaction_table.is_empty());
        assert!(inner.dirty_page_table.is_empty());
        let log = inner.engine.get_log();
        assert!(log.contains("UPDATE|1|"));
        assert!(log.contains("COMMIT|2|"));
    }

    #[test]
    fn abort_restores_before_image_via_clr() {
        let mgr = manager();
        mgr.write(TxId(1), PageId(10), 0, b"A".to_vec(), b"B".to_vec()).unwrap();
        mgr.abort(TxId(1)).unwrap();

        let inner = mgr.inner.lock().unwrap();
        assert!(inner.transaction_table.is_empty());
        assert_eq!(inner.engine.page_bytes(PageId(10)), Some(b"A".as_slice()));
    }

    #[test]
    fn checkpoint_persists_master_lsn_and_flushes() {
        let mgr = manager();
        mgr.write(TxId(1), PageId(10), 0, b"A".to_vec(), b"B".to_vec()).unwrap();
        mgr.checkpoint().unwrap();

        let inner = mgr.inner.lock().unwrap();
        assert!(inner.tail.is_empty());
        assert_ne!(inner.engine.get_master(), NULL_LSN);
        assert!(inner.engine.get_log().contains("END_CKPT"));
    }

    #[test]
    fn recover_after_uncommitted_write_restores_before_image() {
        let mgr = manager();
        mgr.write(TxId(1), PageId(10), 0, b"A".to_vec(), b"B".to_vec()).unwrap();
        let log_text = {
            let inner = mgr.inner.lock().unwrap();
            let mut text = String::new();
            for record in &inner.tail {
                text.push_str(&record.serialize());
                text.push('\n');
            }
            text
        };

        let recovering = manager();
        recovering.inner.lock().unwrap().engine.page_write(PageId(10), 0, b"stale", NULL_LSN);
        recovering.recover(&log_text).unwrap();

        let inner = recovering.inner.lock().unwrap();
        assert_eq!(inner.engine.page_bytes(PageId(10)), Some(b"A".as_slice()));
        assert!(inner.transaction_table.is_empty());
    }
}
